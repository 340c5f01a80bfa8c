use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("rule {key} has an empty path")]
    EmptyPath { key: String },
    #[error("rule {key} confidence {value} is outside [0, 1]")]
    InvalidConfidence { key: String, value: f64 },
    #[error("rule {key} target template is missing the {{field}} placeholder")]
    MissingPlaceholder { key: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
