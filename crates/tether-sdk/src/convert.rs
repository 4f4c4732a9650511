//! Conversions between Rust values and host values.
//!
//! `From` impls build detached host values of the matching predeclared type
//! (`i64` becomes `int`, `f64` becomes `float64`, `&str` becomes `string`).
//! [`FromNative`] goes the other way and is what host function bodies use to
//! read their arguments.
//!
//! # Example
//!
//! ```ignore
//! use tether_sdk::{FromNative, NativeFunc, NativeValue, Type};
//!
//! let repeat = NativeFunc::with_signature(
//!     "strings.Repeat",
//!     vec![Type::string(), Type::int()],
//!     vec![Type::string()],
//!     false,
//!     |args| {
//!         let s = String::from_native(&args[0])?;
//!         let n = i64::from_native(&args[1])?;
//!         Ok(vec![NativeValue::from(s.repeat(n.max(0) as usize))])
//!     },
//! );
//! ```

use std::sync::Arc;

use crate::error::HostResult;
use crate::types::Type;
use crate::value::{Data, NativeValue};

/// Extract a Rust value from a host value
pub trait FromNative: Sized {
    /// Convert, failing on a type mismatch
    fn from_native(value: &NativeValue) -> HostResult<Self>;
}

macro_rules! native_from_int {
    ($($rust:ty => $ctor:ident, $variant:ident, $wide:ty);* $(;)?) => {
        $(
            impl From<$rust> for NativeValue {
                fn from(v: $rust) -> Self {
                    NativeValue::new(Type::$ctor(), Data::$variant(v as $wide))
                }
            }
        )*
    };
}

native_from_int! {
    i8 => int8, Int, i64;
    i16 => int16, Int, i64;
    i32 => int32, Int, i64;
    i64 => int, Int, i64;
    isize => int, Int, i64;
    u8 => uint8, Uint, u64;
    u16 => uint16, Uint, u64;
    u32 => uint32, Uint, u64;
    u64 => uint64, Uint, u64;
    usize => uint, Uint, u64;
}

impl From<bool> for NativeValue {
    fn from(v: bool) -> Self {
        NativeValue::new(Type::bool(), Data::Bool(v))
    }
}

impl From<f32> for NativeValue {
    fn from(v: f32) -> Self {
        NativeValue::new(Type::float32(), Data::Float(v as f64))
    }
}

impl From<f64> for NativeValue {
    fn from(v: f64) -> Self {
        NativeValue::new(Type::float64(), Data::Float(v))
    }
}

impl From<&str> for NativeValue {
    fn from(v: &str) -> Self {
        NativeValue::new(Type::string(), Data::Str(Arc::from(v)))
    }
}

impl From<String> for NativeValue {
    fn from(v: String) -> Self {
        NativeValue::new(Type::string(), Data::Str(Arc::from(v)))
    }
}

impl From<Arc<str>> for NativeValue {
    fn from(v: Arc<str>) -> Self {
        NativeValue::new(Type::string(), Data::Str(v))
    }
}

impl From<Type> for NativeValue {
    fn from(t: Type) -> Self {
        NativeValue::of_type(&t)
    }
}

impl FromNative for bool {
    fn from_native(value: &NativeValue) -> HostResult<Self> {
        value.as_bool()
    }
}

impl FromNative for i64 {
    fn from_native(value: &NativeValue) -> HostResult<Self> {
        value.as_int()
    }
}

impl FromNative for u64 {
    fn from_native(value: &NativeValue) -> HostResult<Self> {
        value.as_uint()
    }
}

impl FromNative for usize {
    fn from_native(value: &NativeValue) -> HostResult<Self> {
        let n = value.as_uint()?;
        usize::try_from(n).map_err(|_| crate::HostError::Conversion {
            from: value.ty().to_string(),
            to: "usize".to_string(),
        })
    }
}

impl FromNative for f64 {
    fn from_native(value: &NativeValue) -> HostResult<Self> {
        value.as_float()
    }
}

impl FromNative for String {
    fn from_native(value: &NativeValue) -> HostResult<Self> {
        value.as_str().map(|s| s.to_string())
    }
}

impl FromNative for Type {
    fn from_native(value: &NativeValue) -> HostResult<Self> {
        value.as_type()
    }
}

impl FromNative for NativeValue {
    fn from_native(value: &NativeValue) -> HostResult<Self> {
        value.detach()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Kind;

    #[test]
    fn test_rust_to_native_types() {
        assert_eq!(NativeValue::from(1i64).ty(), &Type::int());
        assert_eq!(NativeValue::from(1u8).ty(), &Type::byte());
        assert_eq!(NativeValue::from(1.5f32).kind(), Kind::Float32);
        assert_eq!(NativeValue::from("s").kind(), Kind::String);
        assert_eq!(NativeValue::from(Type::int()).ty(), &Type::descriptor());
    }

    #[test]
    fn test_native_to_rust() {
        assert_eq!(i64::from_native(&NativeValue::from(-3i64)).unwrap(), -3);
        assert_eq!(usize::from_native(&NativeValue::from(3u32)).unwrap(), 3);
        assert!(usize::from_native(&NativeValue::from(-3i64)).is_err());
        assert_eq!(String::from_native(&NativeValue::from("hi")).unwrap(), "hi");
        assert!(bool::from_native(&NativeValue::from("hi")).is_err());
    }
}
