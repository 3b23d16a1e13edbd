//! Session points and completion summary

use serde::Serialize;
use uuid::Uuid;

/// One credited completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Award {
    pub exercise_id: Uuid,
    pub points: u32,
    /// True when the fixed fallback was credited instead of a server value
    pub fallback: bool,
}

/// Running point total for a session. Only ever grows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PointsLedger {
    total: u32,
    awards: Vec<Award>,
}

impl PointsLedger {
    pub fn credit(&mut self, award: Award) -> u32 {
        self.total = self.total.saturating_add(award.points);
        self.awards.push(award);
        self.total
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn awards(&self) -> &[Award] {
        &self.awards
    }
}

/// Summary shown when a session completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionSummary {
    pub total_points: u32,
    pub exercises_completed: usize,
    pub dismissed: bool,
}

impl CompletionSummary {
    pub fn from_ledger(ledger: &PointsLedger) -> Self {
        Self {
            total_points: ledger.total(),
            exercises_completed: ledger.awards().len(),
            dismissed: false,
        }
    }
}
