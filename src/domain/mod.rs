mod amount;
mod date_range;
mod ledger;

pub use amount::*;
pub use date_range::*;
pub use ledger::*;
