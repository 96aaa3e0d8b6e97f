// Application layer: the budget, expense and reporting use cases shared by
// the HTTP API and the CLI.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;
