use std::time::SystemTime;

/// The instant a tracked value was recorded at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    recorded_at: SystemTime,
}

impl Entry {
    /// Creates a new entry recorded at the given instant
    pub fn new(recorded_at: SystemTime) -> Self {
        Self { recorded_at }
    }

    /// Returns the recorded instant
    pub fn recorded_at(&self) -> SystemTime {
        self.recorded_at
    }

    /// Checks if this entry is still inside the window that starts at `cutoff`.
    ///
    /// An entry recorded exactly at the cutoff is still live.
    pub fn is_live(&self, cutoff: SystemTime) -> bool {
        self.recorded_at >= cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_entry_live_inside_window() {
        let now = SystemTime::now();
        let entry = Entry::new(now);

        assert_eq!(entry.recorded_at(), now);
        assert!(entry.is_live(now - Duration::from_secs(60)));
    }

    #[test]
    fn test_entry_stale_before_cutoff() {
        let now = SystemTime::now();
        let entry = Entry::new(now - Duration::from_secs(61));

        assert!(!entry.is_live(now - Duration::from_secs(60)));
    }

    #[test]
    fn test_entry_live_at_exact_cutoff() {
        let cutoff = SystemTime::now();
        assert!(Entry::new(cutoff).is_live(cutoff));
    }
}
