use model::records::outcome::Outcome;
use serde::Serialize;

/// Per-run row tallies. Owned by a single reader; no sharing.
#[derive(Debug, Default)]
pub struct Counters {
    total: u64,
    success: u64,
    reject: u64,
}

/// Final report of a run: `total == success + reject`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReturnValues {
    pub total: u64,
    pub success: u64,
    pub reject: u64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&mut self, outcome: &Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Accepted(_) => self.success += 1,
            Outcome::Rejected(_) => self.reject += 1,
        }
    }

    pub fn snapshot(&self) -> ReturnValues {
        ReturnValues {
            total: self.total,
            success: self.success,
            reject: self.reject,
        }
    }
}
