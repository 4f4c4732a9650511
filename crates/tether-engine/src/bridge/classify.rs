//! Kind classification of host values

use tether_sdk::{Kind, NativeValue};

/// Which script representation a host value gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacadeClass {
    /// Unnamed bool, integer, float or string: a script primitive
    Primitive,
    /// Defined bool, integer, float or string type
    NamedPrimitive,
    /// complex64 or complex128
    Complex,
    /// Typed pointer
    Pointer,
    /// unsafe.Pointer
    UnsafePointer,
    /// Struct
    Struct,
    /// Array
    Array,
    /// Slice
    Slice,
    /// Map
    Map,
    /// Channel
    Chan,
    /// Function
    Func,
    /// Interface: unwrapped one level before surfacing
    Interface,
    /// Type descriptor: a first-class type value
    TypeDescriptor,
}

/// Result of [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Kind of the static type
    pub kind: Kind,
    /// Representation to build
    pub class: FacadeClass,
    /// Whether the value names a location
    pub addressable: bool,
}

/// Classify a host value
pub fn classify(value: &NativeValue) -> Classification {
    let ty = value.ty();
    let kind = ty.kind();
    let class = if ty.is_descriptor() {
        FacadeClass::TypeDescriptor
    } else {
        match kind {
            k if k.is_primitive() && ty.is_defined() => FacadeClass::NamedPrimitive,
            k if k.is_primitive() => FacadeClass::Primitive,
            Kind::Complex64 | Kind::Complex128 => FacadeClass::Complex,
            Kind::Pointer => FacadeClass::Pointer,
            Kind::UnsafePointer => FacadeClass::UnsafePointer,
            Kind::Struct => FacadeClass::Struct,
            Kind::Array => FacadeClass::Array,
            Kind::Slice => FacadeClass::Slice,
            Kind::Map => FacadeClass::Map,
            Kind::Chan => FacadeClass::Chan,
            Kind::Func => FacadeClass::Func,
            _ => FacadeClass::Interface,
        }
    };
    Classification {
        kind,
        class,
        addressable: value.is_addressable(),
    }
}
