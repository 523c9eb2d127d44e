use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingCommit {
    due: u64,
    generation: u64,
}

/// Text value that is only committed after the input went quiet.
///
/// Time is passed in by the caller, in whatever unit the window is
/// expressed in. The owner polls the field from its event loop.
#[derive(Debug, Clone)]
pub struct DebouncedField {
    value: String,
    committed: String,
    window: u64,
    generation: u64,
    pending: Option<PendingCommit>,
}

impl DebouncedField {
    pub fn new(committed: &str, window: u64) -> Self {
        Self {
            value: committed.to_string(),
            committed: committed.to_string(),
            window,
            generation: 0,
            pending: None,
        }
    }

    /// The value echoed back to the user while typing.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.pending.map(|p| p.due)
    }

    /// Records a keystroke. Any pending commit is superseded.
    pub fn input(&mut self, value: &str, now: u64) {
        self.value = value.to_string();
        self.generation += 1;
        self.pending = if self.value == self.committed {
            None
        } else {
            Some(PendingCommit {
                due: now + self.window,
                generation: self.generation,
            })
        };
        trace!("Debounce input \"{}\" due {:?}", self.value, self.deadline());
    }

    /// Resynchronizes with a value that changed outside of this field.
    /// Never produces a commit.
    pub fn sync(&mut self, committed: &str) {
        if self.committed == committed {
            return;
        }
        self.committed = committed.to_string();
        self.value = committed.to_string();
        self.generation += 1;
        self.pending = None;
    }

    /// Returns the value to commit once the window has elapsed.
    pub fn poll(&mut self, now: u64) -> Option<String> {
        let pending = self.pending?;
        if now < pending.due {
            return None;
        }
        self.pending = None;
        self.fire(pending.generation)
    }

    /// Commits the current value immediately, e.g. on Enter.
    pub fn flush(&mut self) -> Option<String> {
        let pending = self.pending.take()?;
        self.fire(pending.generation)
    }

    fn fire(&mut self, generation: u64) -> Option<String> {
        if generation != self.generation || self.value == self.committed {
            return None;
        }
        self.committed = self.value.clone();
        trace!("Debounce commit \"{}\"", self.committed);
        Some(self.committed.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commits_once_after_last_keystroke() {
        let mut field = DebouncedField::new("", 500);
        field.input("m", 0);
        field.input("me", 100);
        field.input("mea", 200);

        for now in [250, 500, 600, 699] {
            assert_eq!(field.poll(now), None);
        }
        assert_eq!(field.poll(700), Some("mea".to_string()));
        assert_eq!(field.poll(701), None);
        assert_eq!(field.poll(5000), None);
        assert_eq!(field.committed(), "mea");
    }

    #[test]
    fn unchanged_value_never_commits() {
        let mut field = DebouncedField::new("abc", 500);
        field.input("ab", 0);
        field.input("abc", 100);
        assert!(!field.is_pending());
        assert_eq!(field.poll(1000), None);
    }

    #[test]
    fn sync_replaces_value_and_cancels_pending() {
        let mut field = DebouncedField::new("", 500);
        field.input("xyz", 0);
        field.sync("A10");
        assert_eq!(field.value(), "A10");
        assert_eq!(field.committed(), "A10");
        assert!(!field.is_pending());
        assert_eq!(field.poll(1000), None);
    }

    #[test]
    fn sync_with_the_committed_value_keeps_typing() {
        let mut field = DebouncedField::new("", 500);
        field.input("xyz", 0);
        field.sync("");
        assert_eq!(field.value(), "xyz");
        assert_eq!(field.poll(500), Some("xyz".to_string()));
    }

    #[test]
    fn flush_commits_early() {
        let mut field = DebouncedField::new("", 500);
        field.input("2", 0);
        assert_eq!(field.flush(), Some("2".to_string()));
        assert_eq!(field.poll(600), None);
        assert_eq!(field.flush(), None);
    }
}
