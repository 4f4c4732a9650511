//! Tether Engine
//!
//! This crate exposes live host values to an embedded scripting language:
//! - **Value model**: script values and the `ScriptObject` capability set (`value` module)
//! - **Bridge**: kind classification, facades, copy policy, conversion,
//!   attribute resolution and the builtins package (`bridge` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_engine::{type_of, Thread, Value, Variable};
//!
//! let thread = Thread::new("main");
//! let point = type_of(&point_type);
//!
//! // p := Point()
//! let mut p = Variable::declare(&point.call(&thread, &[], &[])?)?;
//! // p.X = 3
//! p.target()?.set_field("X", &Value::Int(3))?;
//! // p.Sum()
//! let sum = p.attr("Sum")?.unwrap().call(&thread, &[], &[])?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Script value model and the capability interface
pub mod value;

/// Host value bridge
pub mod bridge;

// ============================================================================
// Re-exports
// ============================================================================

pub use bridge::builtins::{self, Builtin};
pub use bridge::classify::{classify, Classification, FacadeClass};
pub use bridge::convert::convert;
pub use bridge::copy_policy::AccessMode;
pub use bridge::error::{BridgeError, BridgeResult, ErrorCategory};
pub use bridge::facade::Facade;
pub use bridge::lvalue::Variable;
pub use bridge::package::Package;
pub use bridge::resolve::{attr_names, resolve_attr};
pub use bridge::thread::{BridgeOptions, CallCounters, CallLimits, Thread, ThreadId};
pub use bridge::wrap::wrap;
pub use bridge::{type_of, value_of, var_of};
pub use value::{BinaryOp, CompareOp, ScriptObject, Side, UnaryOp, Value, ValueIter};

pub use tether_sdk as sdk;
