//! Host value → script value

use tether_sdk::{Data, NativeValue};

use crate::bridge::classify::{classify, FacadeClass};
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::facade::{
    ArrayFacade, ChanFacade, ComplexFacade, Facade, FuncFacade, MapFacade, NamedFacade,
    PointerFacade, SliceFacade, StructFacade, TypeFacade, UnsafePointerFacade,
};
use crate::value::Value;

/// Wrap a detached host value for the script.
///
/// Unnamed primitives become script primitives, interfaces are unwrapped
/// one level, everything else becomes a [`Facade`]. An addressable input is
/// a bridge defect: addressable values must go through the copy policy.
pub fn wrap(value: NativeValue) -> BridgeResult<Value> {
    let class = classify(&value);
    if class.addressable {
        tracing::error!(ty = %value.ty(), "addressable value reached wrap");
        return Err(BridgeError::Invariant(format!(
            "addressable value of type {} wrapped without a copy",
            value.ty()
        )));
    }
    Ok(match class.class {
        FacadeClass::Primitive => primitive(&value)?,
        FacadeClass::Interface => match value.unbox()? {
            Some(inner) => wrap(inner)?,
            None => Value::None,
        },
        FacadeClass::NamedPrimitive => Value::Host(Facade::Named(NamedFacade(value))),
        FacadeClass::Complex => Value::Host(Facade::Complex(ComplexFacade(value))),
        FacadeClass::Pointer => Value::Host(Facade::Pointer(PointerFacade(value))),
        FacadeClass::UnsafePointer => {
            Value::Host(Facade::UnsafePointer(UnsafePointerFacade(value)))
        }
        FacadeClass::Struct => Value::Host(Facade::Struct(StructFacade(value))),
        FacadeClass::Array => Value::Host(Facade::Array(ArrayFacade(value))),
        FacadeClass::Slice => Value::Host(Facade::Slice(SliceFacade(value))),
        FacadeClass::Map => Value::Host(Facade::Map(MapFacade(value))),
        FacadeClass::Chan => Value::Host(Facade::Chan(ChanFacade(value))),
        FacadeClass::Func => Value::Host(Facade::Func(FuncFacade(value))),
        FacadeClass::TypeDescriptor => Value::Host(Facade::Type(TypeFacade(value))),
    })
}

fn primitive(value: &NativeValue) -> BridgeResult<Value> {
    Ok(match value.data()? {
        Data::Bool(b) => Value::Bool(b),
        Data::Int(i) => Value::Int(i as i128),
        Data::Uint(u) => Value::Int(u as i128),
        Data::Float(f) => Value::Float(f),
        Data::Str(s) => Value::Str(s),
        other => {
            tracing::error!(ty = %value.ty(), ?other, "primitive storage mismatch");
            return Err(BridgeError::Invariant(format!(
                "storage of {} is not primitive",
                value.ty()
            )));
        }
    })
}
