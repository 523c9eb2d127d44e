pub mod controller;
pub mod csv;
pub mod debounce;
pub mod domain;
pub mod drilldown;
pub mod inputter;
pub mod loader;
pub mod model;
pub mod records;
pub mod report;
pub mod table;
pub mod ui;
