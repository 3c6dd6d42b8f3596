use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RlpError {
    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Expected {expected}, found {found}")]
    UnexpectedKind {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Integer overflow")]
    IntegerOverflow,

    #[error("Leading zeros in integer")]
    LeadingZeros,

    #[error("Non-canonical length prefix")]
    NonCanonicalSize,

    #[error("Invalid length for {what}: {actual}")]
    InvalidLength { what: &'static str, actual: usize },

    #[error("{0} trailing bytes after item")]
    TrailingBytes(usize),
}
