use thiserror::Error;

/// Errors reported by copy-on-write collections and their views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CowError {
    /// A key lies outside the key range of a sorted sub-map view.
    #[error("key is outside the range of this view")]
    KeyOutOfRange,

    /// A requested key range has its lower bound above its upper bound.
    #[error("invalid key range: lower bound is greater than upper bound")]
    InvalidRange,

    /// The view cannot express the operation as a mutation of the backing map.
    #[error("{view} does not support {operation}")]
    Unsupported {
        /// The view that rejected the operation.
        view: &'static str,
        /// The rejected operation.
        operation: &'static str,
    },

    /// A cursor was asked to remove an element before yielding one, or twice.
    #[error("cursor has no current element to remove")]
    NoCurrentElement,
}

impl CowError {
    pub(crate) const fn unsupported(view: &'static str, operation: &'static str) -> Self {
        Self::Unsupported { view, operation }
    }

    /// Returns whether this error rejects an argument (an out-of-range key or
    /// an inverted range).
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::KeyOutOfRange | Self::InvalidRange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CowError::KeyOutOfRange, "key is outside the range of this view")]
    #[case(
        CowError::InvalidRange,
        "invalid key range: lower bound is greater than upper bound"
    )]
    #[case(CowError::unsupported("key set", "insert"), "key set does not support insert")]
    #[case(CowError::NoCurrentElement, "cursor has no current element to remove")]
    fn test_display(#[case] error: CowError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    fn test_invalid_argument_classification() {
        assert!(CowError::KeyOutOfRange.is_invalid_argument());
        assert!(CowError::InvalidRange.is_invalid_argument());
        assert!(!CowError::NoCurrentElement.is_invalid_argument());
    }
}
