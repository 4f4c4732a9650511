//! Bridge errors
//!
//! Every failure surfaced to a script is a [`BridgeError`]. Host-level
//! failures arrive as [`HostError`] and convert via `From`.

use tether_sdk::HostError;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Coarse classification of a [`BridgeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Type mismatch, out-of-range value or unsupported target type
    Conversion,
    /// Nil dereference, unexported member, operation not defined for the value
    Access,
    /// Store into a nil map or an unsettable location
    Mutation,
    /// A host function panicked or aborted
    HostFault,
    /// Defect in the bridge itself
    Invariant,
    /// Wrong call shape: arity, keyword arguments, call depth
    Usage,
}

/// Errors raised while bridging host values into scripts
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// A script value cannot become a host value of the target type
    #[error("cannot convert {from} to host {to}")]
    Conversion {
        /// Script type name of the source value
        from: String,
        /// Target host type
        to: String,
    },

    /// Conversion of one call argument failed
    #[error("in argument {position} of call to {func}, {source}")]
    Argument {
        /// 1-based argument position
        position: usize,
        /// Name of the called function
        func: String,
        /// Underlying failure
        source: Box<BridgeError>,
    },

    /// Key or element of a map assignment has the wrong type
    #[error("invalid map {part}: {source}")]
    MapEntry {
        /// "key" or "element"
        part: &'static str,
        /// Underlying failure
        source: Box<BridgeError>,
    },

    /// Member exists but is not exported
    #[error("access to unexported member .{0}")]
    Unexported(String),

    /// Operation is not defined for this value
    #[error("{ty} does not support {op}")]
    Unsupported {
        /// Attempted operation
        op: &'static str,
        /// Script type name of the receiver
        ty: String,
    },

    /// Comparison not defined between the operands
    #[error("invalid comparison: {left} {op} {right}")]
    Comparison {
        /// Operator text
        op: &'static str,
        /// Script type name of the left operand
        left: String,
        /// Script type name of the right operand
        right: String,
    },

    /// Value cannot be hashed
    #[error("unhashable type: {0}")]
    Unhashable(String),

    /// Operation the bridge deliberately leaves unimplemented
    #[error("{0} not implemented")]
    NotImplemented(String),

    /// Store into a location that is not settable
    #[error("can't set {0}")]
    CannotSet(String),

    /// Field assignment names no field
    #[error("{ty} has no .{field} field")]
    NoSuchField {
        /// Receiver description
        ty: String,
        /// Requested field
        field: String,
    },

    /// Call of a nil func value
    #[error("call of nil function")]
    NilFunction,

    /// Argument of a builtin has the wrong kind
    #[error("{func}: want {want}, got {got} for argument {position}")]
    BadArgument {
        /// Builtin name
        func: &'static str,
        /// 1-based argument position
        position: usize,
        /// What the builtin accepts there
        want: &'static str,
        /// Script type name of the argument supplied
        got: String,
    },

    /// Keyword arguments passed to a host callable
    #[error("{0} does not accept named arguments")]
    NamedArguments(String),

    /// Wrong number of arguments
    #[error("in call to {func}, got {got} arguments, want {want}")]
    Arity {
        /// Called function
        func: String,
        /// Arguments supplied
        got: usize,
        /// Expected count, as text ("2", "at least 1", "zero or one")
        want: String,
    },

    /// Nesting of host calls exceeded the thread's limit
    #[error("host call depth limit of {0} exceeded")]
    CallDepth(usize),

    /// A host function panicked or aborted.
    ///
    /// The fault happens inside the function body, so it names the function
    /// but no argument. Arguments that fail to convert before the call are
    /// reported as [`BridgeError::Argument`] with their position instead.
    #[error("panic in host function {func}: {message}")]
    HostFault {
        /// Function name
        func: String,
        /// Panic or abort message
        message: String,
    },

    /// Bridge invariant violated
    #[error("internal error: {0}")]
    Invariant(String),

    /// Failure reported by the host type system
    #[error(transparent)]
    Host(#[from] HostError),
}

impl BridgeError {
    /// Category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            BridgeError::Conversion { .. }
            | BridgeError::Argument { .. }
            | BridgeError::MapEntry { .. }
            | BridgeError::BadArgument { .. } => ErrorCategory::Conversion,
            BridgeError::Unexported(_)
            | BridgeError::Unsupported { .. }
            | BridgeError::Comparison { .. }
            | BridgeError::Unhashable(_)
            | BridgeError::NotImplemented(_)
            | BridgeError::NilFunction => ErrorCategory::Access,
            BridgeError::CannotSet(_) | BridgeError::NoSuchField { .. } => ErrorCategory::Mutation,
            BridgeError::NamedArguments(_)
            | BridgeError::Arity { .. }
            | BridgeError::CallDepth(_) => ErrorCategory::Usage,
            BridgeError::HostFault { .. } => ErrorCategory::HostFault,
            BridgeError::Invariant(_) => ErrorCategory::Invariant,
            BridgeError::Host(e) => match e {
                HostError::TypeMismatch { .. }
                | HostError::Conversion { .. }
                | HostError::SizeOutOfRange { .. } => ErrorCategory::Conversion,
                HostError::NotSettable(_)
                | HostError::UninitializedMap
                | HostError::ChannelClosed
                | HostError::AlreadyClosed => ErrorCategory::Mutation,
                HostError::Arity { .. } => ErrorCategory::Usage,
                HostError::Corrupt(_) => ErrorCategory::Invariant,
                HostError::Abort(_) => ErrorCategory::HostFault,
                _ => ErrorCategory::Access,
            },
        }
    }

    /// "operation not supported" for a script type
    pub fn unsupported(op: &'static str, ty: impl Into<String>) -> Self {
        BridgeError::Unsupported { op, ty: ty.into() }
    }

    /// Wrap as the failure of argument `position` (1-based) of `func`
    pub fn in_argument(self, position: usize, func: impl Into<String>) -> Self {
        BridgeError::Argument {
            position,
            func: func.into(),
            source: Box::new(self),
        }
    }
}
