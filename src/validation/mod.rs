//! Configuration checks run before, and during, a projection run.
pub mod error;
pub mod validator;

pub(crate) mod rules {
    pub mod horizon;
    pub mod working_capital;
}

pub use error::{ValidationError, ValidationErrorType};
pub use validator::{ValidationReport, Validator};
