use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TvfError {
    #[error("unexpected end of input at offset {offset}")]
    Truncated { offset: usize },

    #[error("header mismatch at offset {offset}: expected {expected}, found {found:#04x}")]
    HeaderMismatch {
        offset: usize,
        expected: &'static str,
        found: u8,
    },

    #[error("overlong varint encoding at offset {offset}")]
    Overlong { offset: usize },

    #[error("{what} {len} exceeds limit {max}")]
    SizeExceeded {
        what: &'static str,
        len: u128,
        max: u128,
    },
}

impl TvfError {
    /// Shifts relative offsets by `base`, so errors produced against a
    /// sub-slice report positions in the enclosing buffer.
    pub(crate) fn at(self, base: usize) -> Self {
        match self {
            Self::Truncated { offset } => Self::Truncated {
                offset: offset + base,
            },
            Self::HeaderMismatch {
                offset,
                expected,
                found,
            } => Self::HeaderMismatch {
                offset: offset + base,
                expected,
                found,
            },
            Self::Overlong { offset } => Self::Overlong {
                offset: offset + base,
            },
            other => other,
        }
    }
}
