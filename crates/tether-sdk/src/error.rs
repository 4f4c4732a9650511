//! Error types for host-side value operations

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;

/// Errors raised by the host type system
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    /// Dereference of a nil pointer, or a method call through one
    #[error("nil dereference")]
    NilDereference,

    /// Operation needs a location but the value is a detached copy
    #[error("value of type {0} is not addressable")]
    NotAddressable(String),

    /// Store into a location that cannot be written
    #[error("value of type {0} is not settable")]
    NotSettable(String),

    /// Value has the wrong type for the operation
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type
        expected: String,
        /// Actual type
        got: String,
    },

    /// Operation is not defined for this kind of value
    #[error("invalid operation: {op} on value of type {ty}")]
    InvalidOperation {
        /// Name of the attempted operation
        op: &'static str,
        /// Type of the receiver
        ty: String,
    },

    /// Index outside of `[0, len)`
    #[error("index out of range [{index}] with length {len}")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Length of the sequence
        len: usize,
    },

    /// Reslice with bounds outside of `0 <= lo <= hi <= max <= cap`
    #[error("slice bounds out of range [{lo}:{hi}:{max}] with capacity {cap}")]
    SliceBounds {
        /// Low bound
        lo: usize,
        /// High bound
        hi: usize,
        /// Capacity bound
        max: usize,
        /// Capacity of the operand
        cap: usize,
    },

    /// Value of a type that cannot be hashed or compared
    #[error("hash of unhashable type {0}")]
    Unhashable(String),

    /// Insert into a nil map
    #[error("assignment to element of an uninitialized map")]
    UninitializedMap,

    /// Send on a closed channel
    #[error("send on closed channel")]
    ChannelClosed,

    /// Second close of the same channel
    #[error("close of closed channel: already closed")]
    AlreadyClosed,

    /// Channel operation on a nil channel; carries the operation phrase
    #[error("{0} nil channel")]
    NilChannel(&'static str),

    /// Requested length or capacity is too large to allocate
    #[error("{what} {len} out of range")]
    SizeOutOfRange {
        /// What was being sized
        what: &'static str,
        /// Requested size
        len: usize,
    },

    /// A type cannot be constructed or used this way
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// Host conversion rules reject the conversion
    #[error("cannot convert {from} to {to}")]
    Conversion {
        /// Source type
        from: String,
        /// Target type
        to: String,
    },

    /// Wrong number of arguments to a host function
    #[error("wrong argument count: got {got}, want {want}")]
    Arity {
        /// Arguments supplied
        got: usize,
        /// Arguments expected
        want: usize,
    },

    /// Storage contents do not match the static type of the value
    #[error("storage inconsistent with its type: {0}")]
    Corrupt(String),

    /// Host code aborted the call (the host's equivalent of a panic)
    #[error("{0}")]
    Abort(String),
}

impl HostError {
    /// Build a type mismatch error from two displayable types
    pub fn mismatch(expected: impl std::fmt::Display, got: impl std::fmt::Display) -> Self {
        HostError::TypeMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }

    /// Build an invalid operation error
    pub fn invalid(op: &'static str, ty: impl std::fmt::Display) -> Self {
        HostError::InvalidOperation {
            op,
            ty: ty.to_string(),
        }
    }
}

impl From<String> for HostError {
    fn from(s: String) -> Self {
        HostError::Abort(s)
    }
}

impl From<&str> for HostError {
    fn from(s: &str) -> Self {
        HostError::Abort(s.to_string())
    }
}
