mod budget;
pub mod date;
mod expense;
mod money;
mod validation;

pub use budget::*;
pub use expense::*;
pub use money::*;
pub use validation::ValidationError;
