//! Attribute resolution: `x.name` on host values
//!
//! Methods come first (value receivers, then pointer receivers when the
//! value is addressable or a pointer), then fields, with promotion through
//! embedded fields per [`members`](crate::bridge::members).

use std::sync::Arc;

use tether_sdk::{Kind, MethodDef, NativeValue, Receiver, Type};

use crate::bridge::copy_policy::{self, AccessMode};
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::members::{index_of, strip_pointer, Member, MemberKind};
use crate::bridge::wrap::wrap;
use crate::value::Value;

/// Base of a selector: the value whose members are looked up.
///
/// For an unnamed pointer the base is the pointee; resolving it is deferred
/// so that pointer-receiver methods stay reachable through nil pointers.
struct Base<'a> {
    value: &'a NativeValue,
    through_pointer: bool,
}

impl Base<'_> {
    fn new(value: &NativeValue) -> Base<'_> {
        let through_pointer = value.kind() == Kind::Pointer && !value.ty().is_named();
        Base {
            value,
            through_pointer,
        }
    }

    fn ty(&self) -> Type {
        if self.through_pointer {
            strip_pointer(self.value.ty())
        } else {
            self.value.ty().clone()
        }
    }

    /// The base itself, addressable when reached through a pointer
    fn target(&self) -> BridgeResult<NativeValue> {
        if self.through_pointer {
            Ok(self.value.elem()?)
        } else {
            Ok(self.value.clone())
        }
    }

    /// Pointer to the base, if it has an address
    fn pointer(&self) -> BridgeResult<Option<NativeValue>> {
        if self.through_pointer {
            Ok(Some(self.value.detach()?))
        } else if self.value.is_addressable() {
            Ok(Some(self.value.addr()?))
        } else {
            Ok(None)
        }
    }

    /// Whether pointer-receiver methods declared on the base are reachable
    fn has_address(&self) -> bool {
        self.through_pointer || self.value.is_addressable()
    }
}

/// Bind a method found at `member` to the receiver it needs
fn bind_method(
    base: &Base<'_>,
    member: &Member,
    def: &Arc<MethodDef>,
    owner: &Type,
) -> BridgeResult<Option<Value>> {
    let (holder_value, holder_pointer) = if member.path.is_empty() {
        let pointer = base.pointer()?;
        let value = match def.receiver() {
            Receiver::Value => Some(base.target()?.detach()?),
            Receiver::Pointer => None,
        };
        (value, pointer)
    } else {
        let holder = copy_policy::read_field_for_mutation(&base.target()?, &member.path)?;
        if holder.kind() == Kind::Pointer && !holder.ty().is_named() {
            let value = match def.receiver() {
                Receiver::Value => Some(holder.elem()?.detach()?),
                Receiver::Pointer => None,
            };
            (value, Some(holder.detach()?))
        } else {
            let pointer = if holder.is_addressable() {
                Some(holder.addr()?)
            } else {
                None
            };
            (Some(holder.detach()?), pointer)
        }
    };

    let recv = match def.receiver() {
        Receiver::Value => holder_value,
        Receiver::Pointer => holder_pointer,
    };
    let Some(recv) = recv else {
        tracing::trace!(method = def.name(), "pointer method on unaddressable value");
        return Ok(None);
    };
    let bound = def.bind(owner, recv);
    wrap(bound.into_value()).map(Some)
}

/// Resolve `value.name`.
///
/// Returns `Ok(None)` when there is no such member (or the name is
/// ambiguous), an error for unexported members and nil dereferences.
pub fn resolve_attr(value: &NativeValue, name: &str, mode: AccessMode) -> BridgeResult<Option<Value>> {
    let base = Base::new(value);
    let index = index_of(&base.ty());
    let Some(member) = index.get(name) else {
        tracing::trace!(ty = %value.ty(), name, "no such member");
        return Ok(None);
    };
    if !member.is_exported() {
        return Err(BridgeError::Unexported(name.to_string()));
    }
    tracing::trace!(ty = %value.ty(), name, depth = member.depth, ?mode, "resolved member");

    match &member.kind {
        MemberKind::Method { def, owner } => bind_method(&base, member, def, owner),
        MemberKind::Field(_) => {
            let target = base.target()?;
            let field = match mode {
                AccessMode::Copy => copy_policy::read_field(&target, &member.path)?,
                AccessMode::Alias => copy_policy::read_field_for_mutation(&target, &member.path)?,
            };
            copy_policy::surface(field, mode).map(Some)
        }
    }
}

/// Field of `value` named `name` as an addressable location, for stores.
///
/// `value` must be addressable or a pointer. Returns `Ok(None)` when there
/// is no such field.
pub(crate) fn field_location(value: &NativeValue, name: &str) -> BridgeResult<Option<NativeValue>> {
    let base = Base::new(value);
    let index = index_of(&base.ty());
    let Some(member) = index.get(name) else {
        return Ok(None);
    };
    if !matches!(member.kind, MemberKind::Field(_)) {
        return Ok(None);
    }
    if !member.is_exported() {
        return Err(BridgeError::Unexported(name.to_string()));
    }
    copy_policy::read_field_for_mutation(&base.target()?, &member.path).map(Some)
}

/// Whether the embedded field chain `path` from `base` passes through a
/// pointer, which makes the holder addressable even in a copy
fn crosses_pointer(base: &Type, path: &[usize]) -> bool {
    let mut ty = base.clone();
    for &index in path {
        let Some(field) = strip_pointer(&ty).fields().get(index).cloned() else {
            return false;
        };
        if field.ty.kind() == Kind::Pointer {
            return true;
        }
        ty = field.ty;
    }
    false
}

/// Exported, unambiguous member names of `value`, sorted.
///
/// Pointer-receiver methods are listed only when their receiver would have
/// an address, matching [`resolve_attr`].
pub fn attr_names(value: &NativeValue) -> Vec<String> {
    let base = Base::new(value);
    let index = index_of(&base.ty());
    let mut names: Vec<String> = index
        .members()
        .filter(|m| m.is_exported())
        .filter(|m| match &m.kind {
            MemberKind::Method { def, .. } => {
                def.receiver() == Receiver::Value
                    || base.has_address()
                    || crosses_pointer(&base.ty(), &m.path)
            }
            MemberKind::Field(_) => true,
        })
        .map(|m| m.name.clone())
        .collect();
    names.sort();
    names.dedup();
    names
}
