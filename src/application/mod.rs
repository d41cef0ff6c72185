// Application layer - use cases and orchestration.
// LedgerService owns the session's ledger and its store; every client
// (CLI, importer, tests) goes through it.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;
