//! Script-visible facades over host values
//!
//! One variant per facade class, each a newtype over a detached
//! [`NativeValue`] implementing [`ScriptObject`]. Facades carry no state
//! beyond the value and are rebuilt at every expression boundary.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use tether_sdk::{HostError, MapKey, NativeValue};

use crate::bridge::classify::FacadeClass;
use crate::bridge::copy_policy::{surface, AccessMode};
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::thread::Thread;
use crate::value::{BinaryOp, CompareOp, ScriptObject, Side, UnaryOp, Value, ValueIter};

mod array;
mod chan;
mod complex;
mod func;
mod map;
mod named;
mod pointer;
mod slice;
mod structs;
mod type_desc;
mod unsafe_ptr;

pub use array::ArrayFacade;
pub use chan::ChanFacade;
pub use complex::ComplexFacade;
pub use func::FuncFacade;
pub use map::MapFacade;
pub use named::NamedFacade;
pub use pointer::PointerFacade;
pub use slice::SliceFacade;
pub use structs::StructFacade;
pub use type_desc::TypeFacade;
pub use unsafe_ptr::UnsafePointerFacade;

/// A host value as seen by scripts
#[derive(Debug, Clone)]
pub enum Facade {
    /// Defined bool, number or string type
    Named(NamedFacade),
    /// Complex number
    Complex(ComplexFacade),
    /// Typed pointer: the reference handle
    Pointer(PointerFacade),
    /// unsafe.Pointer
    UnsafePointer(UnsafePointerFacade),
    /// Struct copy
    Struct(StructFacade),
    /// Array copy
    Array(ArrayFacade),
    /// Slice
    Slice(SliceFacade),
    /// Map
    Map(MapFacade),
    /// Channel
    Chan(ChanFacade),
    /// Function
    Func(FuncFacade),
    /// Type descriptor
    Type(TypeFacade),
}

macro_rules! each {
    ($self:expr, $f:ident => $body:expr) => {
        match $self {
            Facade::Named($f) => $body,
            Facade::Complex($f) => $body,
            Facade::Pointer($f) => $body,
            Facade::UnsafePointer($f) => $body,
            Facade::Struct($f) => $body,
            Facade::Array($f) => $body,
            Facade::Slice($f) => $body,
            Facade::Map($f) => $body,
            Facade::Chan($f) => $body,
            Facade::Func($f) => $body,
            Facade::Type($f) => $body,
        }
    };
}

impl Facade {
    /// The wrapped host value (always detached)
    pub fn value(&self) -> &NativeValue {
        each!(self, f => &f.0)
    }

    /// Facade class of this variant
    pub fn class(&self) -> FacadeClass {
        match self {
            Facade::Named(_) => FacadeClass::NamedPrimitive,
            Facade::Complex(_) => FacadeClass::Complex,
            Facade::Pointer(_) => FacadeClass::Pointer,
            Facade::UnsafePointer(_) => FacadeClass::UnsafePointer,
            Facade::Struct(_) => FacadeClass::Struct,
            Facade::Array(_) => FacadeClass::Array,
            Facade::Slice(_) => FacadeClass::Slice,
            Facade::Map(_) => FacadeClass::Map,
            Facade::Chan(_) => FacadeClass::Chan,
            Facade::Func(_) => FacadeClass::Func,
            Facade::Type(_) => FacadeClass::TypeDescriptor,
        }
    }
}

impl ScriptObject for Facade {
    fn type_name(&self) -> String {
        each!(self, f => f.type_name())
    }

    fn to_text(&self) -> String {
        each!(self, f => f.to_text())
    }

    fn truth(&self) -> bool {
        each!(self, f => f.truth())
    }

    fn hash(&self) -> BridgeResult<u64> {
        each!(self, f => f.hash())
    }

    fn native(&self) -> Option<&NativeValue> {
        Some(self.value())
    }

    fn attr(&self, name: &str, mode: AccessMode) -> BridgeResult<Option<Value>> {
        each!(self, f => f.attr(name, mode))
    }

    fn attr_names(&self) -> Vec<String> {
        each!(self, f => f.attr_names())
    }

    fn set_field(&self, name: &str, value: &Value) -> BridgeResult<()> {
        each!(self, f => f.set_field(name, value))
    }

    fn index(&self, index: &Value, mode: AccessMode) -> BridgeResult<Value> {
        each!(self, f => f.index(index, mode))
    }

    fn set_index(&self, index: &Value, value: &Value) -> BridgeResult<()> {
        each!(self, f => f.set_index(index, value))
    }

    fn get_key(&self, key: &Value) -> BridgeResult<Value> {
        each!(self, f => f.get_key(key))
    }

    fn set_key(&self, key: &Value, value: &Value) -> BridgeResult<()> {
        each!(self, f => f.set_key(key, value))
    }

    fn len(&self) -> BridgeResult<usize> {
        each!(self, f => f.len())
    }

    fn iterate(&self) -> BridgeResult<ValueIter> {
        each!(self, f => f.iterate())
    }

    fn call(
        &self,
        thread: &Thread,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> BridgeResult<Value> {
        each!(self, f => f.call(thread, args, kwargs))
    }

    fn compare(&self, op: CompareOp, other: &Value) -> BridgeResult<bool> {
        each!(self, f => f.compare(op, other))
    }

    fn unary(&self, op: UnaryOp) -> BridgeResult<Option<Value>> {
        each!(self, f => f.unary(op))
    }

    fn binary(&self, op: BinaryOp, other: &Value, side: Side) -> BridgeResult<Option<Value>> {
        each!(self, f => f.binary(op, other, side))
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// `host.<kind><<type>>`
pub(crate) fn host_type_name(value: &NativeValue) -> String {
    format!("host.{}<{}>", value.kind().name(), value.ty())
}

/// Script index into a sequence of `len`; negative indices count from the end
pub(crate) fn index_arg(index: &Value, len: usize) -> BridgeResult<usize> {
    let Value::Int(i) = index else {
        return Err(BridgeError::Conversion {
            from: index.type_name(),
            to: "int".to_string(),
        });
    };
    let resolved = if *i < 0 { *i + len as i128 } else { *i };
    usize::try_from(resolved)
        .ok()
        .filter(|&n| n < len)
        .ok_or_else(|| {
            HostError::IndexOutOfRange {
                index: usize::try_from(*i).unwrap_or(usize::MAX),
                len,
            }
            .into()
        })
}

/// Hash of a comparable host value, consistent with host `==`
pub(crate) fn hash_native(value: &NativeValue) -> BridgeResult<u64> {
    let key = MapKey::from_data(&value.data()?, value.ty()).map_err(|e| match e {
        HostError::Unhashable(_) => BridgeError::Unhashable(host_type_name(value)),
        other => other.into(),
    })?;
    let mut h = FxHasher::default();
    value.ty().id().hash(&mut h);
    key.hash(&mut h);
    Ok(h.finish())
}

/// `==`/`!=` defined on values of the identical host type; ordering errors
pub(crate) fn same_type_equality(
    value: &NativeValue,
    op: CompareOp,
    other: &Value,
) -> BridgeResult<bool> {
    if !op.is_equality() {
        return Err(BridgeError::Comparison {
            op: op.symbol(),
            left: host_type_name(value),
            right: other.type_name(),
        });
    }
    let equal = match other.native() {
        Some(o) if o.ty() == value.ty() => value.equals(o)?,
        _ => false,
    };
    Ok(equal == (op == CompareOp::Eq))
}

/// Snapshot of the elements of an array or slice, as copies
pub(crate) fn elements(value: &NativeValue) -> BridgeResult<ValueIter> {
    let len = value.len()?;
    let items = (0..len)
        .map(|i| surface(value.index(i)?, AccessMode::Copy))
        .collect::<BridgeResult<Vec<_>>>()?;
    Ok(ValueIter::new(items))
}

/// Element `index` of an array or slice, surfaced per `mode`
pub(crate) fn element(value: &NativeValue, index: &Value, mode: AccessMode) -> BridgeResult<Value> {
    let i = index_arg(index, value.len()?)?;
    surface(value.index(i)?, mode)
}
