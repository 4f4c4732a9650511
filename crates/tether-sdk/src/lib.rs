//! Tether SDK - host type system for values exposed to scripts
//!
//! This crate models the host side of the bridge: first-class [`Type`]
//! descriptors, typed [`NativeValue`]s over shared storage cells, host
//! functions and methods, maps and channels. Hosts describe their API with
//! it; the `tether-engine` crate surfaces those values to scripts.
//!
//! # Example
//!
//! ```ignore
//! use tether_sdk::{Field, MethodDef, NativeValue, Receiver, Type};
//!
//! let point = Type::define(
//!     "main",
//!     "Point",
//!     &Type::struct_of(vec![Field::new("X", Type::int()), Field::new("Y", Type::int())]),
//! );
//! point.add_method(MethodDef::new("Sum", Receiver::Value, vec![], vec![Type::int()], |p, _| {
//!     Ok(vec![NativeValue::from(p.field(0)?.as_int()? + p.field(1)?.as_int()?)])
//! }))?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod chan;
pub mod convert;
mod descriptor;
pub mod error;
pub mod fmt;
pub mod func;
pub mod kind;
pub mod map;
pub mod types;
pub mod value;

pub use chan::{Channel, TryRecv};
pub use convert::FromNative;
pub use error::{HostError, HostResult};
pub use func::{HostFn, MethodDef, MethodFn, NativeFunc, Receiver};
pub use kind::Kind;
pub use map::{HostMap, MapKey};
pub use types::{
    is_exported, method_epoch, Field, InterfaceMethod, Shape, Signature, Type, MAX_ALLOC_SLOTS,
};
pub use value::{Cell, Data, NativeValue, Place, SliceRef};
