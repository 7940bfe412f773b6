// Application layer - use cases and orchestration.
// Every client (CLI, importer, tests) goes through FinanceService.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;
