use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use reconview::controller::Controller;
use reconview::domain::{ReconError, ViewConfig};
use reconview::loader::{ArchiveLoader, ReportDataLoader};
use reconview::model::{Model, Status};
use reconview::table::PAGE_SIZES;
use reconview::ui::TableUI;

/// Browse reconciliation reports in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Archive folder with one sub folder per report
    archive: String,

    /// Report to open, defaults to the first one in the archive
    report_id: Option<String>,

    /// Print the available report ids and exit
    #[arg(long)]
    list: bool,

    /// Initial number of rows per page
    #[arg(long, default_value_t = 5, value_parser = parse_page_size)]
    page_size: usize,

    /// Quiet period before typed filter text is applied
    #[arg(long, default_value_t = 500)]
    debounce_ms: u64,

    /// Where log output is written
    #[arg(long, default_value = "reconview.log")]
    log_file: PathBuf,
}

fn parse_page_size(s: &str) -> Result<usize, String> {
    let size: usize = s.parse().map_err(|_| format!("\"{s}\" is not a number"))?;
    if PAGE_SIZES.contains(&size) {
        Ok(size)
    } else {
        Err(format!("page size must be one of {PAGE_SIZES:?}"))
    }
}

fn init_logging(log_file: &Path) -> Result<(), ReconError> {
    let file = File::create(log_file)?;
    let filter = EnvFilter::try_from_env("RECONVIEW_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: Args) -> Result<(), ReconError> {
    let archive = shellexpand::full(&args.archive)
        .map_err(|e| ReconError::LoadingFailed(e.to_string()))?
        .to_string();
    let loader = ArchiveLoader::new(archive);

    if args.list {
        for id in loader.list_reports()? {
            println!("{id}");
        }
        return Ok(());
    }

    init_logging(&args.log_file)?;
    info!("Starting reconview on {}", loader.root().display());

    let report_id = match args.report_id {
        Some(id) => id,
        None => loader
            .list_reports()?
            .into_iter()
            .next()
            .ok_or_else(|| ReconError::ReportNotFound(loader.root().display().to_string()))?,
    };

    let cfg = ViewConfig::default()
        .page_size(args.page_size)
        .debounce_window(args.debounce_ms);
    let mut model = Model::init(&cfg, Box::new(loader));
    model.open_report(&report_id)?;

    let ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut model, &ui, &controller, &mut terminal);
    ratatui::restore();
    result
}

fn event_loop(
    model: &mut Model,
    ui: &TableUI,
    controller: &Controller,
    terminal: &mut ratatui::DefaultTerminal,
) -> Result<(), ReconError> {
    let size = terminal.size()?;
    model.update(Some(reconview::domain::Message::Resize(
        size.width as usize,
        size.height as usize,
    )))?;

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // A quiet poll still steps the model so pending input can commit
        let message = controller.handle_event(model)?;
        model.update(message)?;
    }
    info!("Bye");
    Ok(())
}
