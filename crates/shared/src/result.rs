//! Result helpers for shared error handling.

use crate::errors::ErrorEnvelope;

/// Shared result type used across the workspace.
pub type Result<T, E = ErrorEnvelope> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorCode, ErrorEnvelope};

    #[test]
    fn result_defaults_to_envelope_error() {
        let value: Result<i32> = Ok(5);
        assert!(matches!(value, Ok(5)));

        let error: Result<i32> =
            Err(ErrorEnvelope::expected(ErrorCode::invalid_input(), "bad"));
        assert!(error.is_err());
    }
}
