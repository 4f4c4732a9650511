//! Copy or alias: what a script receives when it extracts a host value
//!
//! Reads hand the script a detached copy. Only the base of an assignment
//! (`p.inner.X = 1`, `p.arr[0] = 1`) and explicit address-of get a handle
//! that aliases host storage.

use tether_sdk::{Kind, NativeValue};

use crate::bridge::error::BridgeResult;
use crate::bridge::wrap::wrap;
use crate::value::Value;

/// How an extraction is used at the call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessMode {
    /// Plain read: the result is independent of the source
    #[default]
    Copy,
    /// Base of an assignment: the result aliases the source
    Alias,
}

/// Follow a field path from `value`, dereferencing embedded pointers.
/// The result is addressable iff `value` is or a pointer was crossed.
fn walk(value: &NativeValue, path: &[usize]) -> BridgeResult<NativeValue> {
    let mut current = value.clone();
    for &index in path {
        if current.kind() == Kind::Pointer {
            current = current.elem()?;
        }
        current = current.field(index)?;
    }
    Ok(current)
}

/// Field at `path`, as a detached copy
pub fn read_field(value: &NativeValue, path: &[usize]) -> BridgeResult<NativeValue> {
    Ok(walk(value, path)?.detach()?)
}

/// Field at `path`, aliasing the receiver's storage when it has any
pub fn read_field_for_mutation(value: &NativeValue, path: &[usize]) -> BridgeResult<NativeValue> {
    walk(value, path)
}

/// Hand `value` to the script.
///
/// `Copy` wraps a detached copy. `Alias` wraps a pointer to an addressable
/// struct or array, whose contents are stored inline and would otherwise be
/// lost to a copy; values of other kinds are copied in either mode since
/// their copies share the referent or are immutable.
pub fn surface(value: NativeValue, mode: AccessMode) -> BridgeResult<Value> {
    let aliased = mode == AccessMode::Alias
        && value.is_addressable()
        && matches!(value.kind(), Kind::Struct | Kind::Array);
    if aliased {
        tracing::trace!(ty = %value.ty(), "surfacing alias");
        wrap(value.addr()?)
    } else {
        wrap(value.detach()?)
    }
}
