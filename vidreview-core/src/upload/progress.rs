/// Converts cumulative byte counts into integer percentages that never
/// regress and never repeat. `100` is only produced once the whole body has
/// been handed over.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    sent: u64,
    last: Option<u8>,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            sent: 0,
            last: None,
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn last_reported(&self) -> Option<u8> {
        self.last
    }

    /// Records `bytes` more sent; returns the percentage to report, if any.
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        self.sent = self.sent.saturating_add(bytes).min(self.total);
        let percent = self.percent();
        self.emit(percent)
    }

    /// Reports `100` if it has not been reported yet.
    pub fn finish(&mut self) -> Option<u8> {
        self.sent = self.total;
        self.emit(100)
    }

    fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        // round half up
        let rounded = (self.sent * 200 + self.total) / (self.total * 2);
        let rounded = rounded.min(100) as u8;
        if self.sent < self.total {
            rounded.min(99)
        } else {
            rounded
        }
    }

    fn emit(&mut self, percent: u8) -> Option<u8> {
        match self.last {
            Some(last) if percent <= last => None,
            _ => {
                self.last = Some(percent);
                Some(percent)
            }
        }
    }
}
