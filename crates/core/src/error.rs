//! Error types for backdrop synthesis.

use thiserror::Error;

/// Errors produced by synthesis operations.
///
/// Every variant signals a caller mistake or a failed write; none of them are
/// transient, so nothing in the core retries.
#[derive(Debug, Error)]
pub enum SynthError {
    /// A grid or image was requested with a zero (or overflowing) size.
    #[error("invalid dimensions ({width}, {height}): width and height must be non-zero")]
    InvalidDimensions { width: usize, height: usize },

    /// A numeric parameter was outside its valid domain.
    #[error("invalid parameter '{name}': {value}")]
    InvalidParameter { name: &'static str, value: String },

    /// Two grids or images had incompatible dimensions for a combined operation.
    #[error("dimension mismatch: ({lhs_w}, {lhs_h}) vs ({rhs_w}, {rhs_h})")]
    DimensionMismatch {
        lhs_w: usize,
        lhs_h: usize,
        rhs_w: usize,
        rhs_h: usize,
    },

    /// A raw sample handed to a grid constructor was NaN or outside [0, 1].
    #[error("value {value} at index {index} is outside [0, 1]")]
    ValueOutOfRange { index: usize, value: f64 },

    /// Writing an encoded image or manifest failed.
    #[error("i/o error: {0}")]
    Io(String),
}

impl SynthError {
    /// Shorthand for [`SynthError::InvalidParameter`] with any displayable value.
    pub fn invalid_parameter(name: &'static str, value: impl std::fmt::Display) -> Self {
        SynthError::InvalidParameter {
            name,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_dimensions_displays_readable_message() {
        let err = SynthError::InvalidDimensions {
            width: 0,
            height: 12,
        };
        let msg = format!("{err}");
        assert!(
            msg.contains("width") && msg.contains("height"),
            "expected message mentioning width and height, got: {msg}"
        );
        assert!(msg.contains("12"), "missing height in: {msg}");
    }

    #[test]
    fn invalid_parameter_includes_name_and_value() {
        let err = SynthError::invalid_parameter("depth", 0);
        let msg = format!("{err}");
        assert!(msg.contains("depth"), "missing param name in: {msg}");
        assert!(msg.contains('0'), "missing value in: {msg}");
    }

    #[test]
    fn dimension_mismatch_includes_all_dimensions() {
        let err = SynthError::DimensionMismatch {
            lhs_w: 10,
            lhs_h: 20,
            rhs_w: 30,
            rhs_h: 40,
        };
        let msg = format!("{err}");
        assert!(msg.contains("10"), "missing lhs_w in: {msg}");
        assert!(msg.contains("20"), "missing lhs_h in: {msg}");
        assert!(msg.contains("30"), "missing rhs_w in: {msg}");
        assert!(msg.contains("40"), "missing rhs_h in: {msg}");
    }

    #[test]
    fn value_out_of_range_includes_index_and_value() {
        let err = SynthError::ValueOutOfRange {
            index: 7,
            value: 1.5,
        };
        let msg = format!("{err}");
        assert!(msg.contains('7'), "missing index in: {msg}");
        assert!(msg.contains("1.5"), "missing value in: {msg}");
    }

    #[test]
    fn io_includes_message() {
        let err = SynthError::Io("disk full".into());
        assert!(format!("{err}").contains("disk full"));
    }

    #[test]
    fn synth_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SynthError>();
    }

    #[test]
    fn synth_error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<SynthError>();
    }
}
