//! Host values and the storage model
//!
//! Host memory is a set of shared storage cells. A [`NativeValue`] is either
//! *detached*, owning a copy of its data, or *addressable*, naming a location
//! ([`Place`]) inside a cell. Arrays and structs are stored inline, so
//! copying one copies its elements; pointers, slices, maps, channels and
//! functions share their referent.
//!
//! Locks on cells are only held for the duration of a single read or write
//! and never across a call into host code.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::chan::{Channel, TryRecv};
use crate::error::{HostError, HostResult};
use crate::func::NativeFunc;
use crate::kind::Kind;
use crate::map::{HostMap, MapKey};
use crate::types::{Shape, Type, MAX_ALLOC_SLOTS};

/// A storage cell: the root of one host variable
pub type Cell = Arc<RwLock<Data>>;

// ============================================================================
// Data
// ============================================================================

/// Raw contents of a host value; its meaning depends on the value's type
#[derive(Debug, Clone)]
pub enum Data {
    /// bool
    Bool(bool),
    /// Signed integer kinds
    Int(i64),
    /// Unsigned integer kinds
    Uint(u64),
    /// Float kinds (float32 values are stored rounded)
    Float(f64),
    /// Complex kinds: real and imaginary parts
    Complex(f64, f64),
    /// string
    Str(Arc<str>),
    /// Pointer to a variable, or nil
    Pointer(Option<Place>),
    /// Array elements, stored inline
    Array(Vec<Data>),
    /// Struct fields, stored inline
    Struct(Vec<Data>),
    /// Slice header, or nil
    Slice(Option<SliceRef>),
    /// Map reference, or nil
    Map(Option<Arc<HostMap>>),
    /// Channel reference, or nil
    Chan(Option<Arc<Channel>>),
    /// Function, or nil
    Func(Option<Arc<NativeFunc>>),
    /// Interface: boxed detached value with its dynamic type, or nil
    Interface(Option<Box<NativeValue>>),
    /// Raw address
    UnsafePointer(usize),
    /// Type descriptor, or nil
    Descriptor(Option<Type>),
}

impl Data {
    /// Whether this storage has the layout of `ty`
    pub fn conforms(&self, ty: &Type) -> bool {
        let kind = ty.kind();
        match (self, ty.shape()) {
            (Data::Bool(_), Shape::Basic) => kind == Kind::Bool,
            (Data::Int(_), Shape::Basic) => kind.is_signed(),
            (Data::Uint(_), Shape::Basic) => kind.is_unsigned(),
            (Data::Float(_), Shape::Basic) => kind.is_float(),
            (Data::Complex(..), Shape::Basic) => kind.is_complex(),
            (Data::Str(_), Shape::Basic) => kind == Kind::String,
            (Data::Pointer(_), Shape::Pointer(_))
            | (Data::Slice(_), Shape::Slice(_))
            | (Data::Map(_), Shape::Map(..))
            | (Data::Chan(_), Shape::Chan(_))
            | (Data::Func(_), Shape::Func(_))
            | (Data::Interface(_), Shape::Interface(_))
            | (Data::UnsafePointer(_), Shape::UnsafePointer)
            | (Data::Descriptor(_), Shape::Descriptor) => true,
            (Data::Array(items), Shape::Array(n, elem)) => {
                items.len() == *n && items.iter().all(|d| d.conforms(elem))
            }
            (Data::Struct(items), Shape::Struct(fields)) => {
                items.len() == fields.len()
                    && items.iter().zip(fields).all(|(d, f)| d.conforms(&f.ty))
            }
            _ => false,
        }
    }
}

fn at<'a>(data: &'a Data, path: &[usize]) -> Option<&'a Data> {
    path.iter().try_fold(data, |d, &i| match d {
        Data::Array(items) | Data::Struct(items) => items.get(i),
        _ => None,
    })
}

fn at_mut<'a>(mut data: &'a mut Data, path: &[usize]) -> Option<&'a mut Data> {
    for &i in path {
        data = match data {
            Data::Array(items) | Data::Struct(items) => items.get_mut(i)?,
            _ => return None,
        };
    }
    Some(data)
}

// ============================================================================
// Places
// ============================================================================

/// A location inside a storage cell: the cell plus a path of
/// array/struct indices
#[derive(Clone)]
pub struct Place {
    cell: Cell,
    path: Vec<usize>,
}

impl Place {
    /// Allocate a new cell holding `data`
    pub fn new(data: Data) -> Self {
        Self {
            cell: Arc::new(RwLock::new(data)),
            path: Vec::new(),
        }
    }

    /// Location of element or field `index` within this location
    pub fn child(&self, index: usize) -> Place {
        let mut path = self.path.clone();
        path.push(index);
        Place {
            cell: Arc::clone(&self.cell),
            path,
        }
    }

    /// Index path from the cell root
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Address of the owning cell
    pub fn cell_address(&self) -> usize {
        Arc::as_ptr(&self.cell) as *const u8 as usize
    }

    /// Display address of this location
    pub fn address(&self) -> usize {
        self.path
            .iter()
            .fold(self.cell_address(), |addr, &i| addr.wrapping_add((i + 1) * 8))
    }

    /// Whether two places name the same location
    pub fn same(&self, other: &Place) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell) && self.path == other.path
    }

    fn corrupt(&self) -> HostError {
        HostError::Corrupt(format!("no location at path {:?}", self.path))
    }

    /// Run `f` on the stored data
    pub fn with<R>(&self, f: impl FnOnce(&Data) -> R) -> HostResult<R> {
        let guard = self.cell.read();
        at(&guard, &self.path).map(f).ok_or_else(|| self.corrupt())
    }

    /// Copy of the stored data
    pub fn read(&self) -> HostResult<Data> {
        self.with(Data::clone)
    }

    /// Run `f` on the stored data, mutably
    pub fn update<R>(&self, f: impl FnOnce(&mut Data) -> R) -> HostResult<R> {
        let mut guard = self.cell.write();
        match at_mut(&mut guard, &self.path) {
            Some(data) => Ok(f(data)),
            None => Err(self.corrupt()),
        }
    }

    /// Replace the stored data
    pub fn write(&self, data: Data) -> HostResult<()> {
        self.update(|slot| *slot = data)
    }
}

impl fmt::Debug for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Place({:#x}, {:?})", self.cell_address(), self.path)
    }
}

/// Slice header: a window onto an array location
#[derive(Debug, Clone)]
pub struct SliceRef {
    backing: Place,
    offset: usize,
    len: usize,
    cap: usize,
}

impl SliceRef {
    /// A fresh backing array holding exactly `items`
    pub fn from_vec(items: Vec<Data>) -> Self {
        let len = items.len();
        Self {
            backing: Place::new(Data::Array(items)),
            offset: 0,
            len,
            cap: len,
        }
    }

    /// Number of visible elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no elements are visible
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Elements available before reallocation
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Location of element `index` (unchecked against `len`)
    pub fn element(&self, index: usize) -> Place {
        self.backing.child(self.offset + index)
    }

    /// Address of the first element
    pub fn address(&self) -> usize {
        self.element(0).address()
    }

    /// Copy of the visible elements
    pub fn items(&self) -> HostResult<Vec<Data>> {
        let (start, end) = (self.offset, self.offset + self.len);
        self.backing
            .with(|d| match d {
                Data::Array(items) => items.get(start..end).map(<[Data]>::to_vec),
                _ => None,
            })?
            .ok_or_else(|| HostError::Corrupt("slice exceeds its backing array".to_string()))
    }
}

// ============================================================================
// NativeValue
// ============================================================================

#[derive(Debug, Clone)]
enum Repr {
    Direct(Data),
    Addressable(Place),
}

/// A typed host value
#[derive(Debug, Clone)]
pub struct NativeValue {
    ty: Type,
    repr: Repr,
}

impl NativeValue {
    /// A detached value. `data` must have the layout of `ty`.
    pub fn new(ty: Type, data: Data) -> Self {
        Self {
            ty,
            repr: Repr::Direct(data),
        }
    }

    /// An addressable value naming `place`
    pub fn at(ty: Type, place: Place) -> Self {
        Self {
            ty,
            repr: Repr::Addressable(place),
        }
    }

    /// The zero value of `ty`, detached
    pub fn zero(ty: &Type) -> Self {
        Self::new(ty.clone(), ty.zero_data())
    }

    /// A new zeroed variable of type `ty`
    pub fn alloc(ty: &Type) -> Self {
        Self::at(ty.clone(), Place::new(ty.zero_data()))
    }

    /// A pointer to a new zeroed variable of type `ty`
    pub fn new_pointer(ty: &Type) -> Self {
        Self::new(
            Type::pointer_to(ty),
            Data::Pointer(Some(Place::new(ty.zero_data()))),
        )
    }

    /// A type descriptor value for `t`
    pub fn of_type(t: &Type) -> Self {
        Self::new(Type::descriptor(), Data::Descriptor(Some(t.clone())))
    }

    /// Static type
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Kind of the static type
    pub fn kind(&self) -> Kind {
        self.ty.kind()
    }

    /// Whether the value names a location
    pub fn is_addressable(&self) -> bool {
        matches!(self.repr, Repr::Addressable(_))
    }

    /// Location named by an addressable value
    pub fn place(&self) -> Option<&Place> {
        match &self.repr {
            Repr::Addressable(place) => Some(place),
            Repr::Direct(_) => None,
        }
    }

    /// Run `f` on the current contents
    pub fn with_data<R>(&self, f: impl FnOnce(&Data) -> R) -> HostResult<R> {
        match &self.repr {
            Repr::Direct(data) => Ok(f(data)),
            Repr::Addressable(place) => place.with(f),
        }
    }

    /// Copy of the current contents
    pub fn data(&self) -> HostResult<Data> {
        self.with_data(Data::clone)
    }

    fn corrupt(&self) -> HostError {
        HostError::Corrupt(self.ty.to_string())
    }

    /// Detached copy of this value
    pub fn detach(&self) -> HostResult<NativeValue> {
        match &self.repr {
            Repr::Direct(_) => Ok(self.clone()),
            Repr::Addressable(place) => Ok(Self::new(self.ty.clone(), place.read()?)),
        }
    }

    /// Pointer to the location of an addressable value
    pub fn addr(&self) -> HostResult<NativeValue> {
        match &self.repr {
            Repr::Addressable(place) => Ok(Self::new(
                Type::pointer_to(&self.ty),
                Data::Pointer(Some(place.clone())),
            )),
            Repr::Direct(_) => Err(HostError::NotAddressable(self.ty.to_string())),
        }
    }

    /// Variable a pointer points to (addressable)
    pub fn elem(&self) -> HostResult<NativeValue> {
        let Shape::Pointer(elem) = self.ty.shape() else {
            return Err(HostError::invalid("dereference", &self.ty));
        };
        match self.data()? {
            Data::Pointer(Some(place)) => Ok(Self::at(elem.clone(), place)),
            Data::Pointer(None) => Err(HostError::NilDereference),
            _ => Err(self.corrupt()),
        }
    }

    /// Dynamic value boxed in an interface; `None` for a nil interface
    pub fn unbox(&self) -> HostResult<Option<NativeValue>> {
        match self.data()? {
            Data::Interface(inner) => Ok(inner.map(|b| *b)),
            _ if self.kind() == Kind::Interface => Err(self.corrupt()),
            _ => Err(HostError::invalid("unbox", &self.ty)),
        }
    }

    /// Whether a nilable value is nil
    pub fn is_nil(&self) -> HostResult<bool> {
        self.with_data(|d| match d {
            Data::Pointer(p) => Ok(p.is_none()),
            Data::Slice(s) => Ok(s.is_none()),
            Data::Map(m) => Ok(m.is_none()),
            Data::Chan(c) => Ok(c.is_none()),
            Data::Func(f) => Ok(f.is_none()),
            Data::Interface(i) => Ok(i.is_none()),
            Data::Descriptor(t) => Ok(t.is_none()),
            Data::UnsafePointer(a) => Ok(*a == 0),
            _ => Err(HostError::invalid("nil check", &self.ty)),
        })?
    }

    /// Address of the referent of reference kinds, for identity and display
    pub fn address(&self) -> HostResult<usize> {
        self.with_data(|d| match d {
            Data::Pointer(p) => p.as_ref().map_or(0, Place::address),
            Data::Slice(s) => s.as_ref().map_or(0, SliceRef::address),
            Data::Map(m) => m.as_ref().map_or(0, |m| Arc::as_ptr(m) as *const u8 as usize),
            Data::Chan(c) => c.as_ref().map_or(0, |c| Arc::as_ptr(c) as *const u8 as usize),
            Data::Func(f) => f.as_ref().map_or(0, |f| Arc::as_ptr(f) as *const u8 as usize),
            Data::UnsafePointer(a) => *a,
            Data::Descriptor(t) => t.as_ref().map_or(0, |t| t.id() as usize),
            _ => 0,
        })
    }

    // ===== Aggregates =====

    /// Struct field `index`; addressable iff the struct is
    pub fn field(&self, index: usize) -> HostResult<NativeValue> {
        if self.kind() != Kind::Struct {
            return Err(HostError::invalid("field access", &self.ty));
        }
        let fields = self.ty.fields();
        let field = fields.get(index).ok_or(HostError::IndexOutOfRange {
            index,
            len: fields.len(),
        })?;
        match &self.repr {
            Repr::Addressable(place) => Ok(Self::at(field.ty.clone(), place.child(index))),
            Repr::Direct(Data::Struct(items)) => items
                .get(index)
                .map(|d| Self::new(field.ty.clone(), d.clone()))
                .ok_or_else(|| self.corrupt()),
            Repr::Direct(_) => Err(self.corrupt()),
        }
    }

    /// Declared (not promoted) field by name
    pub fn field_by_name(&self, name: &str) -> HostResult<Option<NativeValue>> {
        match self.ty.fields().iter().position(|f| f.name == name) {
            Some(i) => self.field(i).map(Some),
            None => Ok(None),
        }
    }

    /// Element `index` of an array, slice or string.
    ///
    /// Slice elements are always addressable; array elements are
    /// addressable iff the array is; string bytes never are.
    pub fn index(&self, index: usize) -> HostResult<NativeValue> {
        match self.ty.shape() {
            Shape::Array(len, elem) => {
                if index >= *len {
                    return Err(HostError::IndexOutOfRange { index, len: *len });
                }
                match &self.repr {
                    Repr::Addressable(place) => Ok(Self::at(elem.clone(), place.child(index))),
                    Repr::Direct(Data::Array(items)) => items
                        .get(index)
                        .map(|d| Self::new(elem.clone(), d.clone()))
                        .ok_or_else(|| self.corrupt()),
                    Repr::Direct(_) => Err(self.corrupt()),
                }
            }
            Shape::Slice(elem) => match self.data()? {
                Data::Slice(Some(s)) if index < s.len() => Ok(Self::at(elem.clone(), s.element(index))),
                Data::Slice(s) => Err(HostError::IndexOutOfRange {
                    index,
                    len: s.map_or(0, |s| s.len()),
                }),
                _ => Err(self.corrupt()),
            },
            _ if self.kind() == Kind::String => {
                let s = self.as_str()?;
                let byte = s.as_bytes().get(index).copied().ok_or(HostError::IndexOutOfRange {
                    index,
                    len: s.len(),
                })?;
                Ok(Self::new(Type::uint8(), Data::Uint(byte as u64)))
            }
            _ => Err(HostError::invalid("index", &self.ty)),
        }
    }

    /// Length of arrays, slices, maps, channels and strings
    pub fn len(&self) -> HostResult<usize> {
        if let Some(n) = self.ty.len() {
            return Ok(n);
        }
        self.with_data(|d| match d {
            Data::Slice(s) => Ok(s.as_ref().map_or(0, SliceRef::len)),
            Data::Map(m) => Ok(m.as_ref().map_or(0, |m| m.len())),
            Data::Chan(c) => Ok(c.as_ref().map_or(0, |c| c.len())),
            Data::Str(s) => Ok(s.len()),
            _ => Err(HostError::invalid("len", &self.ty)),
        })?
    }

    /// Capacity of arrays, slices and channels
    pub fn cap(&self) -> HostResult<usize> {
        if let Some(n) = self.ty.len() {
            return Ok(n);
        }
        self.with_data(|d| match d {
            Data::Slice(s) => Ok(s.as_ref().map_or(0, SliceRef::cap)),
            Data::Chan(c) => Ok(c.as_ref().map_or(0, |c| c.capacity())),
            _ => Err(HostError::invalid("cap", &self.ty)),
        })?
    }

    /// Store `value` into this location
    pub fn set(&self, value: &NativeValue) -> HostResult<()> {
        let Repr::Addressable(place) = &self.repr else {
            return Err(HostError::NotSettable(self.ty.to_string()));
        };
        let data = assign_data(&self.ty, value)?;
        place.write(data)
    }

    /// Host `==`. Values of different types are unequal; uncomparable
    /// types fail.
    pub fn equals(&self, other: &NativeValue) -> HostResult<bool> {
        if self.ty != other.ty {
            return Ok(false);
        }
        data_eq(&self.ty, &self.data()?, &other.data()?)
    }

    // ===== Primitive accessors =====

    /// bool contents
    pub fn as_bool(&self) -> HostResult<bool> {
        match self.data()? {
            Data::Bool(b) => Ok(b),
            _ => Err(HostError::mismatch("bool", &self.ty)),
        }
    }

    /// Integer contents as i64
    pub fn as_int(&self) -> HostResult<i64> {
        match self.data()? {
            Data::Int(i) => Ok(i),
            Data::Uint(u) => i64::try_from(u).map_err(|_| HostError::Conversion {
                from: self.ty.to_string(),
                to: "int64".to_string(),
            }),
            _ => Err(HostError::mismatch("integer", &self.ty)),
        }
    }

    /// Integer contents as u64
    pub fn as_uint(&self) -> HostResult<u64> {
        match self.data()? {
            Data::Uint(u) => Ok(u),
            Data::Int(i) => u64::try_from(i).map_err(|_| HostError::Conversion {
                from: self.ty.to_string(),
                to: "uint64".to_string(),
            }),
            _ => Err(HostError::mismatch("integer", &self.ty)),
        }
    }

    /// Float contents
    pub fn as_float(&self) -> HostResult<f64> {
        match self.data()? {
            Data::Float(f) => Ok(f),
            _ => Err(HostError::mismatch("float", &self.ty)),
        }
    }

    /// Complex contents as (real, imaginary)
    pub fn as_complex(&self) -> HostResult<(f64, f64)> {
        match self.data()? {
            Data::Complex(re, im) => Ok((re, im)),
            _ => Err(HostError::mismatch("complex", &self.ty)),
        }
    }

    /// String contents
    pub fn as_str(&self) -> HostResult<Arc<str>> {
        match self.data()? {
            Data::Str(s) => Ok(s),
            _ => Err(HostError::mismatch("string", &self.ty)),
        }
    }

    /// Type carried by a descriptor value
    pub fn as_type(&self) -> HostResult<Type> {
        match self.data()? {
            Data::Descriptor(Some(t)) => Ok(t),
            Data::Descriptor(None) => Err(HostError::NilDereference),
            _ => Err(HostError::mismatch(Type::descriptor(), &self.ty)),
        }
    }

    // ===== Functions =====

    /// Function carried by a func value; `None` if nil
    pub fn as_func(&self) -> HostResult<Option<Arc<NativeFunc>>> {
        match self.data()? {
            Data::Func(f) => Ok(f),
            _ => Err(HostError::mismatch("func", &self.ty)),
        }
    }

    /// Call a func value with already-converted arguments
    pub fn call(&self, args: &[NativeValue]) -> HostResult<Vec<NativeValue>> {
        match self.as_func()? {
            Some(f) => f.invoke(args),
            None => Err(HostError::NilDereference),
        }
    }

    // ===== Constructors for reference kinds =====

    /// `make(ty, len, cap)` for slice types
    pub fn make_slice(ty: &Type, len: usize, cap: usize) -> HostResult<NativeValue> {
        let Shape::Slice(elem) = ty.shape() else {
            return Err(HostError::InvalidType(format!("make_slice of non-slice type {}", ty)));
        };
        if len > cap {
            return Err(HostError::InvalidType(format!(
                "make_slice: len {} larger than cap {}",
                len, cap
            )));
        }
        let fits = elem
            .footprint()
            .and_then(|e| e.checked_mul(cap))
            .is_some_and(|n| n <= MAX_ALLOC_SLOTS);
        if !fits {
            return Err(HostError::SizeOutOfRange { what: "make_slice: cap", len: cap });
        }
        let items = (0..cap).map(|_| elem.zero_data()).collect();
        let mut slice = SliceRef::from_vec(items);
        slice.len = len;
        Ok(Self::new(ty.clone(), Data::Slice(Some(slice))))
    }

    /// A slice of type `ty` holding copies of `items`
    pub fn slice_from(ty: &Type, items: &[NativeValue]) -> HostResult<NativeValue> {
        let Shape::Slice(elem) = ty.shape() else {
            return Err(HostError::InvalidType(format!("{} is not a slice type", ty)));
        };
        let data = items
            .iter()
            .map(|v| assign_data(elem, v))
            .collect::<HostResult<Vec<_>>>()?;
        Ok(Self::new(ty.clone(), Data::Slice(Some(SliceRef::from_vec(data)))))
    }

    /// `make(ty)` for map types
    pub fn make_map(ty: &Type) -> HostResult<NativeValue> {
        if ty.kind() != Kind::Map {
            return Err(HostError::InvalidType(format!("make_map of non-map type {}", ty)));
        }
        Ok(Self::new(ty.clone(), Data::Map(Some(Arc::new(HostMap::new())))))
    }

    /// `make(ty, cap)` for channel types
    pub fn make_chan(ty: &Type, cap: usize) -> HostResult<NativeValue> {
        if ty.kind() != Kind::Chan {
            return Err(HostError::InvalidType(format!("make_chan of non-chan type {}", ty)));
        }
        if cap > MAX_ALLOC_SLOTS {
            return Err(HostError::SizeOutOfRange { what: "make_chan: cap", len: cap });
        }
        Ok(Self::new(ty.clone(), Data::Chan(Some(Arc::new(Channel::new(cap))))))
    }

    // ===== Slices =====

    /// `append(s, vals...)`: shares the backing array while capacity allows
    pub fn append(&self, vals: &[NativeValue]) -> HostResult<NativeValue> {
        let Shape::Slice(elem) = self.ty.shape() else {
            return Err(HostError::invalid("append", &self.ty));
        };
        let extra = vals
            .iter()
            .map(|v| assign_data(elem, v))
            .collect::<HostResult<Vec<_>>>()?;
        let current = match self.data()? {
            Data::Slice(s) => s,
            _ => return Err(self.corrupt()),
        };
        if extra.is_empty() {
            return self.detach();
        }
        let (len, cap) = current.as_ref().map_or((0, 0), |s| (s.len, s.cap));
        let new_len = len + extra.len();

        if let Some(s) = current.as_ref().filter(|_| new_len <= cap) {
            let start = s.offset + len;
            s.backing.update(|d| match d {
                Data::Array(items) => {
                    for (i, value) in extra.into_iter().enumerate() {
                        if let Some(slot) = items.get_mut(start + i) {
                            *slot = value;
                        }
                    }
                    Ok(())
                }
                _ => Err(HostError::Corrupt("slice backing is not an array".to_string())),
            })??;
            let grown = SliceRef {
                len: new_len,
                ..s.clone()
            };
            return Ok(Self::new(self.ty.clone(), Data::Slice(Some(grown))));
        }

        let new_cap = new_len.max(if cap < 256 { cap * 2 } else { cap + cap / 4 });
        let mut items = match &current {
            Some(s) => s.items()?,
            None => Vec::with_capacity(new_cap),
        };
        items.extend(extra);
        items.resize_with(new_cap, || elem.zero_data());
        let mut grown = SliceRef::from_vec(items);
        grown.len = new_len;
        Ok(Self::new(self.ty.clone(), Data::Slice(Some(grown))))
    }

    /// `s[lo:hi]` or `s[lo:hi:max]` on slices, addressable arrays, pointers
    /// to arrays and strings
    pub fn reslice(&self, lo: usize, hi: usize, max: Option<usize>) -> HostResult<NativeValue> {
        match self.ty.shape() {
            Shape::Slice(_) => {
                let current = match self.data()? {
                    Data::Slice(s) => s,
                    _ => return Err(self.corrupt()),
                };
                let cap = current.as_ref().map_or(0, |s| s.cap);
                let max = max.unwrap_or(cap);
                check_bounds(lo, hi, max, cap)?;
                let sliced = current.map(|s| SliceRef {
                    backing: s.backing,
                    offset: s.offset + lo,
                    len: hi - lo,
                    cap: max - lo,
                });
                Ok(Self::new(self.ty.clone(), Data::Slice(sliced)))
            }
            Shape::Array(len, elem) => {
                let Repr::Addressable(place) = &self.repr else {
                    return Err(HostError::NotAddressable(self.ty.to_string()));
                };
                let max = max.unwrap_or(*len);
                check_bounds(lo, hi, max, *len)?;
                let slice = SliceRef {
                    backing: place.clone(),
                    offset: lo,
                    len: hi - lo,
                    cap: max - lo,
                };
                Ok(Self::new(Type::slice_of(elem), Data::Slice(Some(slice))))
            }
            Shape::Pointer(elem) if elem.kind() == Kind::Array => self.elem()?.reslice(lo, hi, max),
            _ if self.kind() == Kind::String => {
                if max.is_some() {
                    return Err(HostError::invalid("3-index slice", &self.ty));
                }
                let s = self.as_str()?;
                check_bounds(lo, hi, hi, s.len())?;
                let sub = s
                    .get(lo..hi)
                    .ok_or_else(|| HostError::invalid("slice inside a UTF-8 sequence", &self.ty))?;
                Ok(Self::new(self.ty.clone(), Data::Str(Arc::from(sub))))
            }
            _ => Err(HostError::invalid("slice", &self.ty)),
        }
    }

    // ===== Maps =====

    fn map_ref(&self) -> HostResult<Option<Arc<HostMap>>> {
        match self.data()? {
            Data::Map(m) => Ok(m),
            _ => Err(HostError::invalid("map operation", &self.ty)),
        }
    }

    fn map_types(&self) -> HostResult<(Type, Type)> {
        match self.ty.shape() {
            Shape::Map(k, v) => Ok((k.clone(), v.clone())),
            _ => Err(HostError::invalid("map operation", &self.ty)),
        }
    }

    /// `m[key]`, detached; `None` if absent
    pub fn map_get(&self, key: &NativeValue) -> HostResult<Option<NativeValue>> {
        let (kt, vt) = self.map_types()?;
        let kdata = assign_data(&kt, key)?;
        let mkey = MapKey::from_data(&kdata, &kt)?;
        Ok(self
            .map_ref()?
            .and_then(|m| m.get(&mkey))
            .map(|d| Self::new(vt, d)))
    }

    /// `m[key] = value`; fails on a nil map
    pub fn map_insert(&self, key: &NativeValue, value: &NativeValue) -> HostResult<()> {
        let (kt, vt) = self.map_types()?;
        let kdata = assign_data(&kt, key)?;
        let vdata = assign_data(&vt, value)?;
        let map = self.map_ref()?.ok_or(HostError::UninitializedMap)?;
        map.insert(MapKey::from_data(&kdata, &kt)?, kdata, vdata);
        Ok(())
    }

    /// `delete(m, key)`; a no-op on nil maps
    pub fn map_delete(&self, key: &NativeValue) -> HostResult<bool> {
        let (kt, _) = self.map_types()?;
        let kdata = assign_data(&kt, key)?;
        let mkey = MapKey::from_data(&kdata, &kt)?;
        Ok(self.map_ref()?.is_some_and(|m| m.remove(&mkey)))
    }

    /// Snapshot of the keys, detached
    pub fn map_keys(&self) -> HostResult<Vec<NativeValue>> {
        let (kt, _) = self.map_types()?;
        Ok(self
            .map_ref()?
            .map(|m| m.keys())
            .unwrap_or_default()
            .into_iter()
            .map(|d| Self::new(kt.clone(), d))
            .collect())
    }

    /// Snapshot of the entries, detached
    pub fn map_entries(&self) -> HostResult<Vec<(NativeValue, NativeValue)>> {
        let (kt, vt) = self.map_types()?;
        Ok(self
            .map_ref()?
            .map(|m| m.entries())
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (Self::new(kt.clone(), k), Self::new(vt.clone(), v)))
            .collect())
    }

    // ===== Channels =====

    fn chan_ref(&self, op: &'static str) -> HostResult<(Arc<Channel>, Type)> {
        let Shape::Chan(elem) = self.ty.shape() else {
            return Err(HostError::invalid("channel operation", &self.ty));
        };
        match self.data()? {
            Data::Chan(Some(ch)) => Ok((ch, elem.clone())),
            Data::Chan(None) => Err(HostError::NilChannel(op)),
            _ => Err(self.corrupt()),
        }
    }

    /// Blocking send
    pub fn chan_send(&self, value: &NativeValue) -> HostResult<()> {
        let (ch, elem) = self.chan_ref("send on")?;
        ch.send(assign_data(&elem, value)?)
    }

    /// Blocking receive: the value and whether it was sent (false once
    /// closed and drained, with the zero value)
    pub fn chan_recv(&self) -> HostResult<(NativeValue, bool)> {
        let (ch, elem) = self.chan_ref("receive from")?;
        Ok(match ch.recv() {
            Some(data) => (Self::new(elem, data), true),
            None => (Self::zero(&elem), false),
        })
    }

    /// Non-blocking send
    pub fn chan_try_send(&self, value: &NativeValue) -> HostResult<bool> {
        let (ch, elem) = self.chan_ref("send on")?;
        ch.try_send(assign_data(&elem, value)?)
    }

    /// Non-blocking receive; `None` when nothing is ready
    pub fn chan_try_recv(&self) -> HostResult<Option<(NativeValue, bool)>> {
        let (ch, elem) = self.chan_ref("receive from")?;
        Ok(match ch.try_recv() {
            TryRecv::Value(data) => Some((Self::new(elem, data), true)),
            TryRecv::Closed => Some((Self::zero(&elem), false)),
            TryRecv::Empty => None,
        })
    }

    /// Close a channel
    pub fn chan_close(&self) -> HostResult<()> {
        let (ch, _) = self.chan_ref("close of")?;
        ch.close()
    }

    // ===== Conversion =====

    /// Host conversion `T(v)`.
    ///
    /// Numeric conversions wrap or truncate the way host arithmetic does;
    /// range checking is the caller's concern.
    pub fn convert(&self, to: &Type) -> HostResult<NativeValue> {
        if &self.ty == to {
            return self.detach();
        }
        if !self.ty.convertible_to(to) {
            return Err(HostError::Conversion {
                from: self.ty.to_string(),
                to: to.to_string(),
            });
        }
        let data = self.data()?;
        let (from_k, to_k) = (self.kind(), to.kind());
        let out = if to_k == Kind::Interface {
            if from_k == Kind::Interface {
                data
            } else {
                Data::Interface(Some(Box::new(Self::new(self.ty.clone(), data))))
            }
        } else if from_k.is_numeric() && to_k.is_numeric() {
            convert_number(&data, to_k).ok_or_else(|| self.corrupt())?
        } else if from_k.is_complex() && to_k.is_complex() {
            match data {
                Data::Complex(re, im) if to_k == Kind::Complex64 => {
                    Data::Complex(re as f32 as f64, im as f32 as f64)
                }
                other => other,
            }
        } else if to_k == Kind::String && from_k.is_integer() {
            let code = match data {
                Data::Int(i) => u32::try_from(i).ok(),
                Data::Uint(u) => u32::try_from(u).ok(),
                _ => None,
            };
            let c = code.and_then(char::from_u32).unwrap_or(char::REPLACEMENT_CHARACTER);
            Data::Str(Arc::from(c.to_string()))
        } else if to_k == Kind::String && from_k == Kind::Slice {
            Data::Str(Arc::from(text_from_slice(&data)?))
        } else if from_k == Kind::String && to_k == Kind::Slice {
            let Data::Str(s) = data else {
                return Err(self.corrupt());
            };
            let items = match to.elem().map(|e| e.kind()) {
                Some(Kind::Uint8) => s.bytes().map(|b| Data::Uint(b as u64)).collect(),
                _ => s.chars().map(|c| Data::Int(c as i64)).collect(),
            };
            Data::Slice(Some(SliceRef::from_vec(items)))
        } else {
            data
        };
        Ok(Self::new(to.clone(), out))
    }
}

/// Storage for `value` in a location of type `target`, boxing into
/// interfaces as needed
pub(crate) fn assign_data(target: &Type, value: &NativeValue) -> HostResult<Data> {
    if !value.ty().assignable_to(target) {
        return Err(HostError::mismatch(target, value.ty()));
    }
    if target.kind() == Kind::Interface && value.kind() != Kind::Interface {
        return Ok(Data::Interface(Some(Box::new(value.detach()?))));
    }
    value.data()
}

fn check_bounds(lo: usize, hi: usize, max: usize, cap: usize) -> HostResult<()> {
    if lo <= hi && hi <= max && max <= cap {
        Ok(())
    } else {
        Err(HostError::SliceBounds { lo, hi, max, cap })
    }
}

fn wrap_signed(v: i128, bits: u32) -> i64 {
    let shift = 128 - bits;
    ((v << shift) >> shift) as i64
}

fn wrap_unsigned(v: i128, bits: u32) -> u64 {
    ((v as u128) & (u128::MAX >> (128 - bits))) as u64
}

fn convert_number(data: &Data, to: Kind) -> Option<Data> {
    if to.is_float() {
        let f = match *data {
            Data::Int(i) => i as f64,
            Data::Uint(u) => u as f64,
            Data::Float(f) => f,
            _ => return None,
        };
        return Some(Data::Float(if to == Kind::Float32 { f as f32 as f64 } else { f }));
    }
    let wide = match *data {
        Data::Int(i) => i as i128,
        Data::Uint(u) => u as i128,
        Data::Float(f) => f.trunc() as i128,
        _ => return None,
    };
    let bits = to.bits()?;
    Some(if to.is_signed() {
        Data::Int(wrap_signed(wide, bits))
    } else {
        Data::Uint(wrap_unsigned(wide, bits))
    })
}

fn text_from_slice(data: &Data) -> HostResult<String> {
    let items = match data {
        Data::Slice(Some(s)) => s.items()?,
        Data::Slice(None) => Vec::new(),
        _ => return Err(HostError::Corrupt("expected slice".to_string())),
    };
    let mut bytes = Vec::with_capacity(items.len());
    let mut text = String::new();
    for item in items {
        match item {
            Data::Uint(b) => bytes.push(b as u8),
            Data::Int(r) => text.push(
                u32::try_from(r)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER),
            ),
            _ => return Err(HostError::Corrupt("expected byte or rune".to_string())),
        }
    }
    if !bytes.is_empty() {
        text.push_str(&String::from_utf8_lossy(&bytes));
    }
    Ok(text)
}

fn data_eq(ty: &Type, a: &Data, b: &Data) -> HostResult<bool> {
    Ok(match (a, b) {
        (Data::Bool(x), Data::Bool(y)) => x == y,
        (Data::Int(x), Data::Int(y)) => x == y,
        (Data::Uint(x), Data::Uint(y)) => x == y,
        (Data::Float(x), Data::Float(y)) => x == y,
        (Data::Complex(a, b), Data::Complex(c, d)) => a == c && b == d,
        (Data::Str(x), Data::Str(y)) => x == y,
        (Data::Pointer(x), Data::Pointer(y)) => match (x, y) {
            (Some(p), Some(q)) => p.same(q),
            (None, None) => true,
            _ => false,
        },
        (Data::Chan(x), Data::Chan(y)) => match (x, y) {
            (Some(p), Some(q)) => Arc::ptr_eq(p, q),
            (None, None) => true,
            _ => false,
        },
        (Data::UnsafePointer(x), Data::UnsafePointer(y)) => x == y,
        (Data::Descriptor(x), Data::Descriptor(y)) => x == y,
        (Data::Interface(x), Data::Interface(y)) => match (x, y) {
            (Some(p), Some(q)) => p.equals(q)?,
            (None, None) => true,
            _ => false,
        },
        (Data::Array(xs), Data::Array(ys)) => {
            let elem = ty.elem().ok_or_else(|| HostError::Corrupt(ty.to_string()))?;
            for (x, y) in xs.iter().zip(ys) {
                if !data_eq(&elem, x, y)? {
                    return Ok(false);
                }
            }
            xs.len() == ys.len()
        }
        (Data::Struct(xs), Data::Struct(ys)) => {
            for ((x, y), field) in xs.iter().zip(ys).zip(ty.fields()) {
                if !data_eq(&field.ty, x, y)? {
                    return Ok(false);
                }
            }
            true
        }
        (Data::Slice(_), _) | (Data::Map(_), _) | (Data::Func(_), _) => {
            return Err(HostError::Unhashable(ty.to_string()))
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;

    fn point() -> Type {
        Type::define(
            "main",
            "Point",
            &Type::struct_of(vec![Field::new("X", Type::int()), Field::new("Y", Type::int())]),
        )
    }

    #[test]
    fn test_detached_field_is_a_copy() {
        let var = NativeValue::alloc(&point());
        var.field(0).unwrap().set(&NativeValue::from(3i64)).unwrap();

        let copy = var.field(0).unwrap().detach().unwrap();
        assert!(!copy.is_addressable());
        var.field(0).unwrap().set(&NativeValue::from(9i64)).unwrap();
        assert_eq!(copy.as_int().unwrap(), 3);
        assert_eq!(var.field(0).unwrap().as_int().unwrap(), 9);
    }

    #[test]
    fn test_set_requires_addressable() {
        let detached = NativeValue::zero(&point());
        let err = detached.field(0).unwrap().set(&NativeValue::from(1i64)).unwrap_err();
        assert_eq!(err, HostError::NotSettable("int".to_string()));
    }

    #[test]
    fn test_set_checks_assignability() {
        let var = NativeValue::alloc(&Type::int());
        let err = var.set(&NativeValue::from("x")).unwrap_err();
        assert!(matches!(err, HostError::TypeMismatch { .. }));
    }

    #[test]
    fn test_pointer_roundtrip() {
        let var = NativeValue::alloc(&point());
        let ptr = var.addr().unwrap();
        assert_eq!(ptr.ty().to_string(), "*main.Point");
        ptr.elem().unwrap().field(1).unwrap().set(&NativeValue::from(4i64)).unwrap();
        assert_eq!(var.field(1).unwrap().as_int().unwrap(), 4);

        let nil = NativeValue::zero(&Type::pointer_to(&point()));
        assert_eq!(nil.elem().unwrap_err(), HostError::NilDereference);
    }

    #[test]
    fn test_slices_share_backing() {
        let ty = Type::slice_of(&Type::int());
        let s = NativeValue::make_slice(&ty, 2, 4).unwrap();
        let t = s.append(&[NativeValue::from(5i64)]).unwrap();
        assert_eq!(t.len().unwrap(), 3);
        assert_eq!(t.cap().unwrap(), 4);

        t.index(0).unwrap().set(&NativeValue::from(1i64)).unwrap();
        assert_eq!(s.index(0).unwrap().as_int().unwrap(), 1);

        let sub = t.reslice(1, 3, None).unwrap();
        assert_eq!(sub.len().unwrap(), 2);
        assert_eq!(sub.cap().unwrap(), 3);
        assert_eq!(sub.index(1).unwrap().as_int().unwrap(), 5);

        let err = t.reslice(2, 1, None).unwrap_err();
        assert!(matches!(err, HostError::SliceBounds { .. }));
    }

    #[test]
    fn test_oversized_make_rejected() {
        let ty = Type::slice_of(&Type::int());
        let err = NativeValue::make_slice(&ty, 0, 1 << 62).unwrap_err();
        assert_eq!(err.to_string(), "make_slice: cap 4611686018427387904 out of range");
        let wide = Type::slice_of(&Type::array_of(1 << 20, &Type::int()));
        assert!(NativeValue::make_slice(&wide, 1 << 10, 1 << 10).is_err());

        let ch = Type::chan_of(&Type::int());
        let err = NativeValue::make_chan(&ch, MAX_ALLOC_SLOTS + 1).unwrap_err();
        assert!(matches!(err, HostError::SizeOutOfRange { what: "make_chan: cap", .. }));
        assert!(NativeValue::make_chan(&ch, 16).is_ok());
    }

    #[test]
    fn test_append_grows_into_new_backing() {
        let ty = Type::slice_of(&Type::int());
        let s = NativeValue::slice_from(&ty, &[NativeValue::from(1i64)]).unwrap();
        let t = s.append(&[NativeValue::from(2i64), NativeValue::from(3i64)]).unwrap();
        t.index(0).unwrap().set(&NativeValue::from(10i64)).unwrap();
        assert_eq!(s.index(0).unwrap().as_int().unwrap(), 1);
        assert_eq!(t.len().unwrap(), 3);

        let nil = NativeValue::zero(&ty);
        assert!(nil.append(&[]).unwrap().is_nil().unwrap());
    }

    #[test]
    fn test_map_operations() {
        let ty = Type::map_of(&Type::string(), &Type::int()).unwrap();
        let nil = NativeValue::zero(&ty);
        assert_eq!(
            nil.map_insert(&NativeValue::from("a"), &NativeValue::from(1i64))
                .unwrap_err(),
            HostError::UninitializedMap
        );
        assert!(nil.map_get(&NativeValue::from("a")).unwrap().is_none());

        let m = NativeValue::make_map(&ty).unwrap();
        m.map_insert(&NativeValue::from("a"), &NativeValue::from(1i64)).unwrap();
        assert_eq!(m.len().unwrap(), 1);
        let got = m.map_get(&NativeValue::from("a")).unwrap().unwrap();
        assert_eq!(got.as_int().unwrap(), 1);
        assert_eq!(m.map_keys().unwrap()[0].as_str().unwrap().as_ref(), "a");
        assert!(m.map_delete(&NativeValue::from("a")).unwrap());
    }

    #[test]
    fn test_channel_operations() {
        let ty = Type::chan_of(&Type::int());
        let nil = NativeValue::zero(&ty);
        assert_eq!(nil.chan_close().unwrap_err().to_string(), "close of nil channel");

        let ch = NativeValue::make_chan(&ty, 1).unwrap();
        ch.chan_send(&NativeValue::from(3i64)).unwrap();
        assert!(!ch.chan_try_send(&NativeValue::from(4i64)).unwrap());
        ch.chan_close().unwrap();
        let (v, ok) = ch.chan_recv().unwrap();
        assert!(ok);
        assert_eq!(v.as_int().unwrap(), 3);
        let (v, ok) = ch.chan_recv().unwrap();
        assert!(!ok);
        assert_eq!(v.as_int().unwrap(), 0);
    }

    #[test]
    fn test_numeric_conversion_wraps() {
        let v = NativeValue::from(300i64);
        assert_eq!(v.convert(&Type::uint8()).unwrap().as_uint().unwrap(), 44);
        assert_eq!(
            NativeValue::from(-1i64).convert(&Type::uint16()).unwrap().as_uint().unwrap(),
            65535
        );
        assert_eq!(
            NativeValue::from(2.9f64).convert(&Type::int()).unwrap().as_int().unwrap(),
            2
        );
    }

    #[test]
    fn test_string_conversions() {
        let bytes = NativeValue::from("hé").convert(&Type::slice_of(&Type::byte())).unwrap();
        assert_eq!(bytes.len().unwrap(), 3);
        let back = bytes.convert(&Type::string()).unwrap();
        assert_eq!(back.as_str().unwrap().as_ref(), "hé");
        let rune = NativeValue::from(65i64).convert(&Type::string()).unwrap();
        assert_eq!(rune.as_str().unwrap().as_ref(), "A");
    }

    #[test]
    fn test_boxing_into_interface() {
        let boxed = NativeValue::from(7i64).convert(&Type::any()).unwrap();
        assert_eq!(boxed.kind(), Kind::Interface);
        let inner = boxed.unbox().unwrap().unwrap();
        assert_eq!(inner.ty(), &Type::int());
        assert!(NativeValue::zero(&Type::any()).unbox().unwrap().is_none());
    }

    #[test]
    fn test_equality() {
        let a = NativeValue::from(1.5f64);
        assert!(a.equals(&NativeValue::from(1.5f64)).unwrap());
        assert!(!a.equals(&NativeValue::from(1i64)).unwrap());
        let s = NativeValue::zero(&Type::slice_of(&Type::int()));
        assert!(s.equals(&s).is_err());

        let var = NativeValue::alloc(&point());
        assert!(var.addr().unwrap().equals(&var.addr().unwrap()).unwrap());
        assert!(!var.addr().unwrap().equals(&NativeValue::new_pointer(&point())).unwrap());
    }

    #[test]
    fn test_array_elements_follow_addressability() {
        let ty = Type::array_of(3, &Type::int());
        assert!(!NativeValue::zero(&ty).index(1).unwrap().is_addressable());
        let var = NativeValue::alloc(&ty);
        var.index(1).unwrap().set(&NativeValue::from(2i64)).unwrap();
        let view = var.reslice(1, 3, None).unwrap();
        assert_eq!(view.index(0).unwrap().as_int().unwrap(), 2);
        assert_eq!(
            var.index(3).unwrap_err(),
            HostError::IndexOutOfRange { index: 3, len: 3 }
        );
    }

    #[test]
    fn test_conforms() {
        assert!(Data::Int(1).conforms(&Type::int()));
        assert!(!Data::Int(1).conforms(&Type::uint()));
        assert!(point().zero_data().conforms(&point()));
        assert!(!Data::Struct(vec![Data::Int(1)]).conforms(&point()));
    }
}
