//! Host value bridge
//!
//! Wraps live host values for the script, enforcing copy-vs-alias semantics
//! and converting script values back to host types. Entry points:
//! [`value_of`] for a value, [`var_of`] for a host variable the script may
//! mutate, and [`type_of`] for a type the script may construct or convert to.

pub mod builtins;
pub mod classify;
pub mod convert;
pub mod copy_policy;
pub mod error;
pub mod facade;
pub mod lvalue;
pub mod members;
pub mod package;
pub mod resolve;
pub mod thread;
pub(crate) mod trap;
pub mod wrap;

use tether_sdk::{HostError, Kind, NativeValue, Type};

use self::error::BridgeResult;
use self::facade::{Facade, PointerFacade, TypeFacade};
use crate::value::Value;

/// Expose a host value to the script as a copy
pub fn value_of(value: NativeValue) -> BridgeResult<Value> {
    copy_policy::surface(value, copy_policy::AccessMode::Copy)
}

/// Expose a host variable through a pointer to it.
///
/// Stores made by the script through the returned handle are visible to
/// the host.
pub fn var_of(pointer: NativeValue) -> BridgeResult<Value> {
    if pointer.kind() != Kind::Pointer || pointer.ty().is_descriptor() {
        return Err(HostError::mismatch("pointer", pointer.ty()).into());
    }
    Ok(Value::Host(Facade::Pointer(PointerFacade(pointer.detach()?))))
}

/// Expose a host type as a callable descriptor
pub fn type_of(ty: &Type) -> Value {
    Value::Host(Facade::Type(TypeFacade(NativeValue::of_type(ty))))
}
