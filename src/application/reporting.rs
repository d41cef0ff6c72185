use serde::{Deserialize, Serialize};

use crate::domain::{MAX_AMOUNT, YEARLY_TARGET, YearlyLedger};

/// Progress through one year of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: i32,
    pub filled_days: usize,
    pub total_saved: u32,
    pub target_total: u32,
    pub remaining_count: usize,
    pub completion_percentage: f64,
}

impl YearSummary {
    pub fn for_year(ledger: &YearlyLedger, year: i32) -> Self {
        let used = ledger.used_amounts(year);
        let total_saved: u32 = used.iter().copied().map(u32::from).sum();

        Self {
            year,
            filled_days: used.len(),
            total_saved,
            target_total: YEARLY_TARGET,
            remaining_count: usize::from(MAX_AMOUNT) - used.len(),
            completion_percentage: f64::from(total_saved) * 100.0 / f64::from(YEARLY_TARGET),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.remaining_count == 0
    }
}
