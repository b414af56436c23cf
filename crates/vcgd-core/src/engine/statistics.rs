/// Acceptance counts of a Monte Carlo run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveStatistics {
    pub accepted: u64,
    pub rejected: u64,
}

impl MoveStatistics {
    pub fn record(&mut self, accepted: bool) {
        if accepted {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
    }

    pub fn attempted(&self) -> u64 {
        self.accepted + self.rejected
    }

    /// Fraction of accepted moves, or zero before any attempt.
    pub fn acceptance_ratio(&self) -> f64 {
        match self.attempted() {
            0 => 0.0,
            n => self.accepted as f64 / n as f64,
        }
    }
}
