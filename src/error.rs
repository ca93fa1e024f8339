use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Controller input / fault taxonomy
// ---------------------------------------------------------------------------

/// Malformed plant state handed to the controller.
#[derive(Error, Debug, Clone, Copy, PartialEq, Serialize)]
pub enum InvalidInputError {
    #[error("state must have 6 elements, got {len}")]
    WrongLength { len: usize },

    #[error("state contains a non-finite value at index {index}")]
    NonFinite { index: usize },
}

/// Anything that aborts a control tick. The orchestrator turns every variant
/// into a zero-force output plus one fault count.
#[derive(Error, Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ControlFault {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Non-finite intermediate value that the envelope could not absorb.
    #[error("numerical degradation in {stage}")]
    NumericalDegradation { stage: &'static str },
}

pub type ControlResult<T> = Result<T, ControlFault>;

// ---------------------------------------------------------------------------
// Plant model
// ---------------------------------------------------------------------------

/// Returned by the checked stepping API only; the raw forms propagate.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum DynamicsError {
    #[error("force command is not finite: {0}")]
    NonFiniteForce(f64),

    #[error("plant state component {index} is not finite")]
    NonFiniteState { index: usize },
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid { field, reason: reason.into() }
    }
}

/// Reject NaN/inf and non-positive values for a named parameter.
pub(crate) fn require_positive(field: &'static str, value: f64) -> ConfigResult<()> {
    if !value.is_finite() {
        return Err(ConfigError::invalid(field, format!("must be finite, got {value}")));
    }
    if value <= 0.0 {
        return Err(ConfigError::invalid(field, format!("must be > 0, got {value}")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_converts_into_fault() {
        let fault: ControlFault = InvalidInputError::WrongLength { len: 5 }.into();
        assert_eq!(
            fault,
            ControlFault::InvalidInput(InvalidInputError::WrongLength { len: 5 })
        );
        assert_eq!(
            fault.to_string(),
            "invalid input: state must have 6 elements, got 5"
        );
    }

    #[test]
    fn require_positive_rejects_nan_and_zero() {
        assert!(require_positive("max_force", 5.0).is_ok());
        assert!(require_positive("max_force", 0.0).is_err());
        assert!(require_positive("max_force", f64::NAN).is_err());
        assert!(require_positive("max_force", f64::INFINITY).is_err());
    }
}
