//! Host type descriptors
//!
//! A [`Type`] is a cheap handle onto an immutable type description plus a
//! mutable method table. Two handles are equal iff they denote the same host
//! type:
//! - every call to [`Type::define`] creates a new, distinct defined type;
//! - unnamed composite types (`*T`, `[]T`, `map[K]V`, `func(..)`, struct and
//!   interface literals) are interned structurally, so building `[]int` twice
//!   yields the same type.
//!
//! Predeclared types (`int`, `string`, `error`, ...) are process-wide
//! singletons.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::error::{HostError, HostResult};
use crate::func::{MethodDef, Receiver};
use crate::kind::Kind;
use crate::value::Data;

/// Global type ID counter
static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// Most storage slots a single zero value, slice backing array or channel
/// buffer may hold
pub const MAX_ALLOC_SLOTS: usize = 1 << 28;

/// Bumped whenever a method is added to any type
static METHOD_EPOCH: AtomicU64 = AtomicU64::new(0);

/// Current method epoch.
///
/// Caches derived from method sets (promotion tables) must be rebuilt when
/// this changes.
pub fn method_epoch() -> u64 {
    METHOD_EPOCH.load(Ordering::Acquire)
}

/// Whether a member name is visible outside its package
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

// ============================================================================
// Type components
// ============================================================================

/// A struct field
#[derive(Debug, Clone)]
pub struct Field {
    /// Field name; for embedded fields, the name of the embedded type
    pub name: String,
    /// Field type
    pub ty: Type,
    /// Whether the field is embedded (its members are promoted)
    pub embedded: bool,
}

impl Field {
    /// A regular named field
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            embedded: false,
        }
    }

    /// An embedded field. Its name is the (pointer-stripped) type name.
    pub fn embedded(ty: Type) -> Self {
        let base = match ty.shape() {
            Shape::Pointer(elem) if ty.name().is_none() => elem.clone(),
            _ => ty.clone(),
        };
        let name = match base.name() {
            Some(name) => name.to_string(),
            None => base.to_string(),
        };
        Self {
            name,
            ty,
            embedded: true,
        }
    }

    /// Whether the field is visible outside its package
    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }
}

/// Parameter and result types of a function type
#[derive(Debug, Clone)]
pub struct Signature {
    /// Parameter types; for variadic functions the last one is a slice
    pub params: Vec<Type>,
    /// Result types
    pub results: Vec<Type>,
    /// Whether the last parameter collects trailing arguments
    pub variadic: bool,
}

/// A method required by an interface type
#[derive(Debug, Clone)]
pub struct InterfaceMethod {
    /// Method name
    pub name: String,
    /// Method signature (a func type, receiver excluded)
    pub sig: Type,
}

impl InterfaceMethod {
    /// Create an interface method requirement
    pub fn new(name: impl Into<String>, sig: Type) -> Self {
        Self {
            name: name.into(),
            sig,
        }
    }
}

/// Structure of a type
#[derive(Debug, Clone)]
pub enum Shape {
    /// Bool, numeric, complex and string types
    Basic,
    /// `*T`
    Pointer(Type),
    /// `[N]T`
    Array(usize, Type),
    /// `[]T`
    Slice(Type),
    /// `map[K]V`
    Map(Type, Type),
    /// `chan T`
    Chan(Type),
    /// `func(..) (..)`
    Func(Signature),
    /// `struct { .. }`
    Struct(Vec<Field>),
    /// `interface { .. }`
    Interface(Vec<InterfaceMethod>),
    /// `unsafe.Pointer`
    UnsafePointer,
    /// The type of type descriptors themselves
    Descriptor,
}

/// Interning key for unnamed composite types
#[derive(Clone, PartialEq, Eq, Hash)]
enum ShapeKey {
    Pointer(u64),
    Array(usize, u64),
    Slice(u64),
    Map(u64, u64),
    Chan(u64),
    Func(Vec<u64>, Vec<u64>, bool),
    Struct(Vec<(String, u64, bool)>),
    Interface(Vec<(String, u64)>),
}

/// Interned unnamed composite types
static INTERNED: Lazy<Mutex<FxHashMap<ShapeKey, Type>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

fn intern(key: ShapeKey, kind: Kind, shape: impl FnOnce() -> Shape) -> Type {
    let mut table = INTERNED.lock();
    table
        .entry(key)
        .or_insert_with(|| Type::build(kind, None, None, None, shape()))
        .clone()
}

// ============================================================================
// Type
// ============================================================================

struct TypeData {
    id: u64,
    kind: Kind,
    name: Option<String>,
    pkg_path: Option<String>,
    underlying: Option<Type>,
    shape: Shape,
    /// Declared methods, sorted by name
    methods: RwLock<Vec<Arc<MethodDef>>>,
}

/// Handle to a host type descriptor
#[derive(Clone)]
pub struct Type(Arc<TypeData>);

macro_rules! predeclared {
    ($($ctor:ident => $kind:ident),* $(,)?) => {
        $(
            #[doc = concat!("The predeclared `", stringify!($ctor), "` type")]
            pub fn $ctor() -> Type {
                static T: Lazy<Type> = Lazy::new(|| Type::predeclared(Kind::$kind));
                T.clone()
            }
        )*

        /// The predeclared type of a basic kind, if there is one
        pub fn basic(kind: Kind) -> Option<Type> {
            match kind {
                $(Kind::$kind => Some(Type::$ctor()),)*
                _ => None,
            }
        }
    };
}

impl Type {
    fn build(
        kind: Kind,
        name: Option<String>,
        pkg_path: Option<String>,
        underlying: Option<Type>,
        shape: Shape,
    ) -> Type {
        Type(Arc::new(TypeData {
            id: NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            name,
            pkg_path,
            underlying,
            shape,
            methods: RwLock::new(Vec::new()),
        }))
    }

    fn predeclared(kind: Kind) -> Type {
        let shape = if kind == Kind::UnsafePointer {
            Shape::UnsafePointer
        } else {
            Shape::Basic
        };
        Type::build(kind, Some(kind.name().to_string()), None, None, shape)
    }

    predeclared! {
        bool => Bool,
        int => Int,
        int8 => Int8,
        int16 => Int16,
        int32 => Int32,
        int64 => Int64,
        uint => Uint,
        uint8 => Uint8,
        uint16 => Uint16,
        uint32 => Uint32,
        uint64 => Uint64,
        uintptr => Uintptr,
        float32 => Float32,
        float64 => Float64,
        complex64 => Complex64,
        complex128 => Complex128,
        string => String,
        unsafe_pointer => UnsafePointer,
    }

    /// `byte`, an alias for `uint8`
    pub fn byte() -> Type {
        Type::uint8()
    }

    /// `rune`, an alias for `int32`
    pub fn rune() -> Type {
        Type::int32()
    }

    /// The predeclared `error` interface: `interface { Error() string }`
    pub fn error() -> Type {
        static ERROR: Lazy<Type> = Lazy::new(|| {
            let methods = vec![InterfaceMethod::new(
                "Error",
                Type::func_of(vec![], vec![Type::string()], false),
            )];
            let underlying = Type::interface_of(methods.clone());
            Type::build(
                Kind::Interface,
                Some("error".to_string()),
                None,
                Some(underlying),
                Shape::Interface(methods),
            )
        });
        ERROR.clone()
    }

    /// The empty interface, satisfied by every type
    pub fn any() -> Type {
        Type::interface_of(Vec::new())
    }

    /// The type of type descriptors (`host.Type`).
    ///
    /// Values of this type carry a [`Type`] and expose reflective methods
    /// such as `Name`, `Kind` and `Elem`.
    pub fn descriptor() -> Type {
        static DESCRIPTOR: Lazy<Type> = Lazy::new(|| {
            let t = Type::build(
                Kind::Pointer,
                Some("Type".to_string()),
                Some("host".to_string()),
                None,
                Shape::Descriptor,
            );
            crate::descriptor::install(&t);
            t
        });
        DESCRIPTOR.clone()
    }

    // ===== Constructors =====

    /// Create a new defined type `pkg.name` with the given underlying type
    pub fn define(pkg_path: &str, name: &str, underlying: &Type) -> Type {
        let base = underlying.underlying();
        Type::build(
            base.kind(),
            Some(name.to_string()),
            Some(pkg_path.to_string()),
            Some(base.clone()),
            base.shape().clone(),
        )
    }

    /// `*elem`
    pub fn pointer_to(elem: &Type) -> Type {
        intern(ShapeKey::Pointer(elem.id()), Kind::Pointer, || {
            Shape::Pointer(elem.clone())
        })
    }

    /// `[]elem`
    pub fn slice_of(elem: &Type) -> Type {
        intern(ShapeKey::Slice(elem.id()), Kind::Slice, || {
            Shape::Slice(elem.clone())
        })
    }

    /// `[len]elem`
    pub fn array_of(len: usize, elem: &Type) -> Type {
        intern(ShapeKey::Array(len, elem.id()), Kind::Array, || {
            Shape::Array(len, elem.clone())
        })
    }

    /// `[len]elem`, rejected when a zero value would exceed
    /// [`MAX_ALLOC_SLOTS`]
    pub fn try_array_of(len: usize, elem: &Type) -> HostResult<Type> {
        let fits = elem
            .footprint()
            .and_then(|e| e.checked_mul(len))
            .and_then(|n| n.checked_add(1))
            .is_some_and(|n| n <= MAX_ALLOC_SLOTS);
        if !fits {
            return Err(HostError::SizeOutOfRange { what: "array length", len });
        }
        Ok(Type::array_of(len, elem))
    }

    /// `map[key]value`; fails if `key` is not comparable
    pub fn map_of(key: &Type, value: &Type) -> HostResult<Type> {
        if !key.comparable() {
            return Err(HostError::InvalidType(format!("invalid map key type {}", key)));
        }
        Ok(intern(ShapeKey::Map(key.id(), value.id()), Kind::Map, || {
            Shape::Map(key.clone(), value.clone())
        }))
    }

    /// `chan elem`
    pub fn chan_of(elem: &Type) -> Type {
        intern(ShapeKey::Chan(elem.id()), Kind::Chan, || Shape::Chan(elem.clone()))
    }

    /// A function type. `variadic` only takes effect when the last
    /// parameter is a slice.
    pub fn func_of(params: Vec<Type>, results: Vec<Type>, variadic: bool) -> Type {
        let variadic = variadic && params.last().is_some_and(|p| p.kind() == Kind::Slice);
        let key = ShapeKey::Func(
            params.iter().map(Type::id).collect(),
            results.iter().map(Type::id).collect(),
            variadic,
        );
        intern(key, Kind::Func, || {
            Shape::Func(Signature {
                params,
                results,
                variadic,
            })
        })
    }

    /// An unnamed struct type
    pub fn struct_of(fields: Vec<Field>) -> Type {
        let key = ShapeKey::Struct(
            fields
                .iter()
                .map(|f| (f.name.clone(), f.ty.id(), f.embedded))
                .collect(),
        );
        intern(key, Kind::Struct, || Shape::Struct(fields))
    }

    /// An unnamed interface type
    pub fn interface_of(mut methods: Vec<InterfaceMethod>) -> Type {
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        let key = ShapeKey::Interface(
            methods
                .iter()
                .map(|m| (m.name.clone(), m.sig.id()))
                .collect(),
        );
        intern(key, Kind::Interface, || Shape::Interface(methods))
    }

    // ===== Accessors =====

    /// Unique ID of this type
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Kind of this type (shared with its underlying type)
    pub fn kind(&self) -> Kind {
        self.0.kind
    }

    /// Type name, for named types
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// Import path of the declaring package, for defined types
    pub fn pkg_path(&self) -> Option<&str> {
        self.0.pkg_path.as_deref()
    }

    /// Whether the type has a name (predeclared or defined)
    pub fn is_named(&self) -> bool {
        self.0.name.is_some()
    }

    /// Whether the type is declared by a host package (not predeclared)
    pub fn is_defined(&self) -> bool {
        self.0.pkg_path.is_some()
    }

    /// Whether this is the descriptor type
    pub fn is_descriptor(&self) -> bool {
        matches!(self.0.shape, Shape::Descriptor)
    }

    /// Structure of the type
    pub fn shape(&self) -> &Shape {
        &self.0.shape
    }

    /// Underlying type; unnamed and predeclared types are their own
    pub fn underlying(&self) -> Type {
        self.0.underlying.clone().unwrap_or_else(|| self.clone())
    }

    /// Element type of pointer, array, slice, map and channel types
    pub fn elem(&self) -> Option<Type> {
        match &self.0.shape {
            Shape::Pointer(e) | Shape::Array(_, e) | Shape::Slice(e) | Shape::Chan(e) => {
                Some(e.clone())
            }
            Shape::Map(_, v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Key type of map types
    pub fn key(&self) -> Option<Type> {
        match &self.0.shape {
            Shape::Map(k, _) => Some(k.clone()),
            _ => None,
        }
    }

    /// Length of array types
    pub fn len(&self) -> Option<usize> {
        match &self.0.shape {
            Shape::Array(n, _) => Some(*n),
            _ => None,
        }
    }

    /// Fields of struct types; empty for everything else
    pub fn fields(&self) -> &[Field] {
        match &self.0.shape {
            Shape::Struct(fields) => fields,
            _ => &[],
        }
    }

    /// Signature of function types
    pub fn signature(&self) -> Option<&Signature> {
        match &self.0.shape {
            Shape::Func(sig) => Some(sig),
            _ => None,
        }
    }

    /// Required methods of interface types
    pub fn interface_methods(&self) -> &[InterfaceMethod] {
        match &self.0.shape {
            Shape::Interface(methods) => methods,
            _ => &[],
        }
    }

    // ===== Methods =====

    /// Attach a method to a defined type.
    ///
    /// Replaces any method of the same name. Pointer and interface types
    /// cannot carry methods.
    pub fn add_method(&self, method: MethodDef) -> HostResult<()> {
        if !self.is_defined() || matches!(self.kind(), Kind::Pointer | Kind::Interface) {
            return Err(HostError::InvalidType(format!(
                "cannot define methods on {}",
                self
            )));
        }
        if method.signature().kind() != Kind::Func {
            return Err(HostError::InvalidType(format!(
                "method {} has non-function signature {}",
                method.name(),
                method.signature()
            )));
        }
        self.insert_method(method);
        Ok(())
    }

    pub(crate) fn insert_method(&self, method: MethodDef) {
        let method = Arc::new(method);
        {
            let mut methods = self.0.methods.write();
            match methods.binary_search_by(|m| m.name().cmp(method.name())) {
                Ok(i) => methods[i] = method,
                Err(i) => methods.insert(i, method),
            }
        }
        METHOD_EPOCH.fetch_add(1, Ordering::AcqRel);
    }

    /// Methods declared on this type, both receiver kinds, sorted by name
    pub fn declared_methods(&self) -> Vec<Arc<MethodDef>> {
        self.0.methods.read().clone()
    }

    /// Method set of this type, promoted methods excluded.
    ///
    /// For a defined type `T` these are its value-receiver methods; for
    /// `*T` they are all methods declared on `T`.
    pub fn method_set(&self) -> Vec<Arc<MethodDef>> {
        match &self.0.shape {
            Shape::Pointer(elem) if !self.is_named() => elem.declared_methods(),
            _ => self
                .0
                .methods
                .read()
                .iter()
                .filter(|m| m.receiver() == Receiver::Value)
                .cloned()
                .collect(),
        }
    }

    /// Look up a method in [`Type::method_set`]
    pub fn method_by_name(&self, name: &str) -> Option<Arc<MethodDef>> {
        self.method_set().into_iter().find(|m| m.name() == name)
    }

    /// Storage slots held by a zero value of this type; `None` on overflow
    pub fn footprint(&self) -> Option<usize> {
        match &self.0.shape {
            Shape::Array(n, e) => e.footprint()?.checked_mul(*n)?.checked_add(1),
            Shape::Struct(fields) => fields
                .iter()
                .try_fold(1usize, |acc, f| acc.checked_add(f.ty.footprint()?)),
            _ => Some(1),
        }
    }

    // ===== Relations =====

    /// Whether values of this type support `==` (and can be map keys)
    pub fn comparable(&self) -> bool {
        match &self.0.shape {
            Shape::Slice(_) | Shape::Map(..) | Shape::Func(_) => false,
            Shape::Array(_, e) => e.comparable(),
            Shape::Struct(fields) => fields.iter().all(|f| f.ty.comparable()),
            _ => true,
        }
    }

    /// Whether this type's method set satisfies an interface type
    pub fn implements(&self, iface: &Type) -> bool {
        let Shape::Interface(required) = iface.shape() else {
            return false;
        };
        if required.is_empty() {
            return true;
        }
        match &self.0.shape {
            Shape::Interface(own) => required
                .iter()
                .all(|m| own.iter().any(|o| o.name == m.name && o.sig == m.sig)),
            _ => {
                let set = self.method_set();
                required
                    .iter()
                    .all(|m| set.iter().any(|o| o.name() == m.name && *o.signature() == m.sig))
            }
        }
    }

    /// Whether a value of this type may be stored in a location of type `to`
    pub fn assignable_to(&self, to: &Type) -> bool {
        if self == to {
            return true;
        }
        if to.kind() == Kind::Interface {
            return self.implements(to);
        }
        (!self.is_named() || !to.is_named()) && self.underlying() == to.underlying()
    }

    /// Whether an explicit conversion from this type to `to` is allowed
    pub fn convertible_to(&self, to: &Type) -> bool {
        if self.assignable_to(to) {
            return true;
        }
        let (from_u, to_u) = (self.underlying(), to.underlying());
        if from_u == to_u {
            return true;
        }
        if let (Shape::Pointer(a), Shape::Pointer(b)) = (from_u.shape(), to_u.shape()) {
            if !self.is_named() && !to.is_named() && a.underlying() == b.underlying() {
                return true;
            }
        }
        let (from_k, to_k) = (self.kind(), to.kind());
        if from_k.is_numeric() && to_k.is_numeric() {
            return true;
        }
        if from_k.is_complex() && to_k.is_complex() {
            return true;
        }
        if to_k == Kind::String && (from_k.is_integer() || from_u.is_text_slice()) {
            return true;
        }
        from_k == Kind::String && to_u.is_text_slice()
    }

    /// `[]byte` or `[]rune` (element types may be defined)
    pub(crate) fn is_text_slice(&self) -> bool {
        match &self.0.shape {
            Shape::Slice(e) => matches!(e.kind(), Kind::Uint8 | Kind::Int32),
            _ => false,
        }
    }

    /// Zero value storage for this type
    pub fn zero_data(&self) -> Data {
        match &self.0.shape {
            Shape::Basic => match self.kind() {
                Kind::Bool => Data::Bool(false),
                Kind::String => Data::Str(Arc::from("")),
                k if k.is_signed() => Data::Int(0),
                k if k.is_unsigned() => Data::Uint(0),
                k if k.is_float() => Data::Float(0.0),
                _ => Data::Complex(0.0, 0.0),
            },
            Shape::Pointer(_) => Data::Pointer(None),
            Shape::Array(n, e) => Data::Array((0..*n).map(|_| e.zero_data()).collect()),
            Shape::Slice(_) => Data::Slice(None),
            Shape::Map(..) => Data::Map(None),
            Shape::Chan(_) => Data::Chan(None),
            Shape::Func(_) => Data::Func(None),
            Shape::Struct(fields) => Data::Struct(fields.iter().map(|f| f.ty.zero_data()).collect()),
            Shape::Interface(_) => Data::Interface(None),
            Shape::UnsafePointer => Data::UnsafePointer(0),
            Shape::Descriptor => Data::Descriptor(None),
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self)
    }
}

/// Last element of an import path
fn package_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn write_signature(f: &mut fmt::Formatter<'_>, sig: &Signature) -> fmt::Result {
    f.write_str("(")?;
    for (i, p) in sig.params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        match p.elem() {
            Some(elem) if sig.variadic && i + 1 == sig.params.len() => write!(f, "...{}", elem)?,
            _ => write!(f, "{}", p)?,
        }
    }
    f.write_str(")")?;
    match sig.results.as_slice() {
        [] => Ok(()),
        [single] => write!(f, " {}", single),
        many => {
            f.write_str(" (")?;
            for (i, r) in many.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", r)?;
            }
            f.write_str(")")
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.0.name {
            return match &self.0.pkg_path {
                Some(path) => write!(f, "{}.{}", package_name(path), name),
                None => f.write_str(name),
            };
        }
        match &self.0.shape {
            Shape::Pointer(e) => write!(f, "*{}", e),
            Shape::Array(n, e) => write!(f, "[{}]{}", n, e),
            Shape::Slice(e) => write!(f, "[]{}", e),
            Shape::Map(k, v) => write!(f, "map[{}]{}", k, v),
            Shape::Chan(e) => write!(f, "chan {}", e),
            Shape::Func(sig) => {
                f.write_str("func")?;
                write_signature(f, sig)
            }
            Shape::Struct(fields) if fields.is_empty() => f.write_str("struct {}"),
            Shape::Struct(fields) => {
                f.write_str("struct { ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    if field.embedded {
                        write!(f, "{}", field.ty)?;
                    } else {
                        write!(f, "{} {}", field.name, field.ty)?;
                    }
                }
                f.write_str(" }")
            }
            Shape::Interface(methods) if methods.is_empty() => f.write_str("interface {}"),
            Shape::Interface(methods) => {
                f.write_str("interface { ")?;
                for (i, m) in methods.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    f.write_str(&m.name)?;
                    if let Some(sig) = m.sig.signature() {
                        write_signature(f, sig)?;
                    }
                }
                f.write_str(" }")
            }
            Shape::Basic | Shape::UnsafePointer | Shape::Descriptor => {
                f.write_str(self.kind().name())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NativeValue;

    fn point() -> Type {
        Type::define(
            "main",
            "Point",
            &Type::struct_of(vec![Field::new("X", Type::int()), Field::new("Y", Type::int())]),
        )
    }

    #[test]
    fn test_structural_interning() {
        assert_eq!(Type::slice_of(&Type::int()), Type::slice_of(&Type::int()));
        assert_eq!(
            Type::map_of(&Type::string(), &Type::int()).unwrap(),
            Type::map_of(&Type::string(), &Type::int()).unwrap()
        );
        assert_ne!(Type::slice_of(&Type::int()), Type::slice_of(&Type::int64()));
        assert_eq!(Type::byte(), Type::uint8());
    }

    #[test]
    fn test_defined_types_have_identity() {
        let a = point();
        let b = point();
        assert_ne!(a, b);
        assert_eq!(a.underlying(), b.underlying());
        assert!(a.convertible_to(&b));
        assert!(!a.assignable_to(&b));
    }

    #[test]
    fn test_type_strings() {
        assert_eq!(point().to_string(), "main.Point");
        assert_eq!(Type::pointer_to(&point()).to_string(), "*main.Point");
        assert_eq!(Type::array_of(3, &Type::int()).to_string(), "[3]int");
        assert_eq!(
            Type::map_of(&Type::string(), &Type::slice_of(&Type::byte()))
                .unwrap()
                .to_string(),
            "map[string][]uint8"
        );
        assert_eq!(
            Type::func_of(
                vec![Type::string(), Type::slice_of(&Type::any())],
                vec![Type::int(), Type::error()],
                true
            )
            .to_string(),
            "func(string, ...interface {}) (int, error)"
        );
        assert_eq!(
            point().underlying().to_string(),
            "struct { X int; Y int }"
        );
        assert_eq!(Type::error().underlying().to_string(), "interface { Error() string }");
        assert_eq!(
            Type::define("net/http", "Header", &Type::int()).to_string(),
            "http.Header"
        );
        assert_eq!(Type::descriptor().to_string(), "host.Type");
    }

    #[test]
    fn test_map_of_rejects_uncomparable_key() {
        let err = Type::map_of(&Type::slice_of(&Type::int()), &Type::int()).unwrap_err();
        assert!(err.to_string().contains("invalid map key type []int"));
    }

    #[test]
    fn test_conversion_rules() {
        let celsius = Type::define("main", "Celsius", &Type::float64());
        assert!(Type::float64().convertible_to(&celsius));
        assert!(Type::int().convertible_to(&celsius));
        assert!(!Type::float64().assignable_to(&celsius));
        assert!(Type::string().convertible_to(&Type::slice_of(&Type::byte())));
        assert!(Type::slice_of(&Type::rune()).convertible_to(&Type::string()));
        assert!(!Type::string().convertible_to(&Type::int()));
        assert!(!point().convertible_to(&Type::int()));
    }

    #[test]
    fn test_method_sets_and_interfaces() {
        let t = point();
        let stringer = Type::interface_of(vec![InterfaceMethod::new(
            "String",
            Type::func_of(vec![], vec![Type::string()], false),
        )]);
        assert!(!t.implements(&stringer));

        let before = method_epoch();
        t.add_method(MethodDef::new(
            "String",
            Receiver::Value,
            vec![],
            vec![Type::string()],
            |_, _| Ok(vec![NativeValue::from("pt")]),
        ))
        .unwrap();
        t.add_method(MethodDef::new(
            "Reset",
            Receiver::Pointer,
            vec![],
            vec![],
            |_, _| Ok(vec![]),
        ))
        .unwrap();
        assert!(method_epoch() > before);

        assert!(t.implements(&stringer));
        assert!(t.assignable_to(&Type::any()));
        let names: Vec<String> = t.method_set().iter().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["String"]);
        let ptr_names: Vec<String> = Type::pointer_to(&t)
            .method_set()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(ptr_names, vec!["Reset", "String"]);
    }

    #[test]
    fn test_methods_rejected_on_unnamed_types() {
        let err = Type::slice_of(&Type::int())
            .add_method(MethodDef::new("Len", Receiver::Value, vec![], vec![], |_, _| Ok(vec![])))
            .unwrap_err();
        assert!(matches!(err, HostError::InvalidType(_)));
    }

    #[test]
    fn test_comparable() {
        assert!(point().comparable());
        assert!(!Type::struct_of(vec![Field::new("S", Type::slice_of(&Type::int()))]).comparable());
        assert!(Type::array_of(2, &Type::string()).comparable());
    }

    #[test]
    fn test_array_footprint_bounded() {
        let pair = Type::try_array_of(2, &point()).unwrap();
        assert_eq!(pair.footprint(), Some(7));
        assert_eq!(pair, Type::array_of(2, &point()));

        let err = Type::try_array_of(1 << 62, &Type::int()).unwrap_err();
        assert_eq!(err, HostError::SizeOutOfRange { what: "array length", len: 1 << 62 });
        let wide = Type::try_array_of(1 << 20, &Type::int()).unwrap();
        assert!(Type::try_array_of(1 << 10, &wide).is_err());
        assert_eq!(Type::array_of(usize::MAX, &wide).footprint(), None);
    }

    #[test]
    fn test_zero_data_shapes() {
        match point().zero_data() {
            Data::Struct(fields) => assert_eq!(fields.len(), 2),
            other => panic!("unexpected zero value {:?}", other),
        }
        assert!(matches!(Type::error().zero_data(), Data::Interface(None)));
        assert!(matches!(Type::descriptor().zero_data(), Data::Descriptor(None)));
    }

    #[test]
    fn test_embedded_field_name() {
        let inner = point();
        assert_eq!(Field::embedded(Type::pointer_to(&inner)).name, "Point");
        assert!(Field::embedded(inner).embedded);
    }
}
