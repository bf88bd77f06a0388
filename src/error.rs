// Sticky error codes.
//
// API calls never panic and never return errors directly; a failing call
// records a code into the context's error slot and returns without effect.
// The slot keeps the first error recorded and is cleared by
// `Context::get_error`.

use thiserror::Error;

/// Error taxonomy of the rendering context.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorCode {
    /// No error has been recorded since the last `get_error`.
    #[default]
    #[error("no error")]
    NoError,
    /// Unrecognized mode, parameter or pixel format.
    #[error("invalid enum")]
    InvalidEnum,
    /// Out-of-range numeric argument.
    #[error("invalid value")]
    InvalidValue,
    /// Operation is meaningless in the current state.
    #[error("invalid operation")]
    InvalidOperation,
    /// Matrix stack exhausted.
    #[error("stack overflow")]
    StackOverflow,
    /// Matrix stack underrun.
    #[error("stack underflow")]
    StackUnderflow,
    /// Allocation failure.
    #[error("out of memory")]
    OutOfMemory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_no_error() {
        assert_eq!(ErrorCode::default(), ErrorCode::NoError);
    }

    #[test]
    fn codes_display() {
        assert_eq!(ErrorCode::InvalidEnum.to_string(), "invalid enum");
        assert_eq!(ErrorCode::StackUnderflow.to_string(), "stack underflow");
    }
}
