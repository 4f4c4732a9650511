//! Runtime kinds of host values
//!
//! A [`Kind`] is the coarse category of a [`Type`](crate::Type): every
//! defined type shares the kind of its underlying type.

use std::fmt;

/// Coarse category of a host type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    /// Boolean
    Bool,
    /// Platform-width signed integer (64 bits)
    Int,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// Platform-width unsigned integer (64 bits)
    Uint,
    /// 8-bit unsigned integer
    Uint8,
    /// 16-bit unsigned integer
    Uint16,
    /// 32-bit unsigned integer
    Uint32,
    /// 64-bit unsigned integer
    Uint64,
    /// Integer large enough to hold an address
    Uintptr,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Complex number with 32-bit parts
    Complex64,
    /// Complex number with 64-bit parts
    Complex128,
    /// Immutable UTF-8 string
    String,
    /// Typed pointer to a variable
    Pointer,
    /// Fixed-length array
    Array,
    /// View onto a shared backing array
    Slice,
    /// Hash map
    Map,
    /// Channel
    Chan,
    /// Function
    Func,
    /// Struct with named fields
    Struct,
    /// Interface (boxed value of any type implementing its methods)
    Interface,
    /// Untyped raw address
    UnsafePointer,
}

impl Kind {
    /// All kinds, in declaration order
    pub const ALL: [Kind; 26] = [
        Kind::Bool,
        Kind::Int,
        Kind::Int8,
        Kind::Int16,
        Kind::Int32,
        Kind::Int64,
        Kind::Uint,
        Kind::Uint8,
        Kind::Uint16,
        Kind::Uint32,
        Kind::Uint64,
        Kind::Uintptr,
        Kind::Float32,
        Kind::Float64,
        Kind::Complex64,
        Kind::Complex128,
        Kind::String,
        Kind::Pointer,
        Kind::Array,
        Kind::Slice,
        Kind::Map,
        Kind::Chan,
        Kind::Func,
        Kind::Struct,
        Kind::Interface,
        Kind::UnsafePointer,
    ];

    /// Signed integer kinds
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Kind::Int | Kind::Int8 | Kind::Int16 | Kind::Int32 | Kind::Int64
        )
    }

    /// Unsigned integer kinds, including `Uintptr`
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Kind::Uint | Kind::Uint8 | Kind::Uint16 | Kind::Uint32 | Kind::Uint64 | Kind::Uintptr
        )
    }

    /// Any integer kind
    pub fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    /// Float kinds
    pub fn is_float(self) -> bool {
        matches!(self, Kind::Float32 | Kind::Float64)
    }

    /// Complex kinds
    pub fn is_complex(self) -> bool {
        matches!(self, Kind::Complex64 | Kind::Complex128)
    }

    /// Integer or float (complex excluded)
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Bool, integer, float or string: kinds that map onto script primitives
    pub fn is_primitive(self) -> bool {
        self == Kind::Bool || self == Kind::String || self.is_numeric()
    }

    /// Kinds whose zero value is a nil reference
    pub fn is_nilable(self) -> bool {
        matches!(
            self,
            Kind::Pointer
                | Kind::Func
                | Kind::Interface
                | Kind::Map
                | Kind::Slice
                | Kind::Chan
                | Kind::UnsafePointer
        )
    }

    /// Width in bits of numeric kinds
    pub fn bits(self) -> Option<u32> {
        match self {
            Kind::Int8 | Kind::Uint8 => Some(8),
            Kind::Int16 | Kind::Uint16 => Some(16),
            Kind::Int32 | Kind::Uint32 | Kind::Float32 => Some(32),
            Kind::Int | Kind::Int64 | Kind::Uint | Kind::Uint64 | Kind::Uintptr => Some(64),
            Kind::Float64 | Kind::Complex64 => Some(64),
            Kind::Complex128 => Some(128),
            _ => None,
        }
    }

    /// Inclusive range of representable values for integer kinds
    pub fn int_bounds(self) -> Option<(i128, i128)> {
        let bits = self.bits()? as i128;
        if self.is_signed() {
            Some((-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1))
        } else if self.is_unsigned() {
            Some((0, (1i128 << bits) - 1))
        } else {
            None
        }
    }

    /// Lowercase name used in type strings and error messages
    pub fn name(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint => "uint",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Uintptr => "uintptr",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::Complex64 => "complex64",
            Kind::Complex128 => "complex128",
            Kind::String => "string",
            Kind::Pointer => "ptr",
            Kind::Array => "array",
            Kind::Slice => "slice",
            Kind::Map => "map",
            Kind::Chan => "chan",
            Kind::Func => "func",
            Kind::Struct => "struct",
            Kind::Interface => "interface",
            Kind::UnsafePointer => "unsafe.Pointer",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_bounds() {
        assert_eq!(Kind::Int8.int_bounds(), Some((-128, 127)));
        assert_eq!(Kind::Uint8.int_bounds(), Some((0, 255)));
        assert_eq!(
            Kind::Uint64.int_bounds(),
            Some((0, u64::MAX as i128))
        );
        assert_eq!(
            Kind::Int.int_bounds(),
            Some((i64::MIN as i128, i64::MAX as i128))
        );
        assert_eq!(Kind::Float64.int_bounds(), None);
    }

    #[test]
    fn test_kind_families() {
        assert!(Kind::Uintptr.is_unsigned());
        assert!(Kind::Float32.is_numeric());
        assert!(!Kind::Complex64.is_numeric());
        assert!(Kind::String.is_primitive());
        assert!(!Kind::Struct.is_nilable());
        assert!(Kind::UnsafePointer.is_nilable());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Kind::Pointer.to_string(), "ptr");
        assert_eq!(Kind::UnsafePointer.to_string(), "unsafe.Pointer");
        assert_eq!(Kind::ALL.len(), 26);
    }
}
