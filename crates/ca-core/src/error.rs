use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: String, value: f64 },

    #[error("Type mismatch for {what}: expected {expected}, got {found}")]
    TypeMismatch {
        what: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Malformed identifier '{id}': {reason}")]
    MalformedId { id: String, reason: &'static str },
}
