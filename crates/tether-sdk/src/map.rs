//! Host map storage
//!
//! Maps are reference types: every copy of a map value shares one
//! [`HostMap`]. Keys are normalized into [`MapKey`] so that host equality
//! (`-0.0 == 0.0`, pointer identity, element-wise arrays) matches hashing.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{HostError, HostResult};
use crate::types::Type;
use crate::value::Data;

/// Hashable image of a comparable host value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    /// Nil reference of any nilable kind
    Nil,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    Uint(u64),
    /// Float bits, with negative zero folded into zero
    Float(u64),
    /// Complex parts as float bits
    Complex(u64, u64),
    /// String contents
    Str(Arc<str>),
    /// Address of a variable, or identity of a channel
    Addr(usize, Vec<usize>),
    /// Array or struct, element-wise
    Seq(Vec<MapKey>),
    /// Interface value: dynamic type plus value
    Boxed(u64, Box<MapKey>),
    /// Type descriptor
    Type(u64),
}

fn float_bits(f: f64) -> u64 {
    if f == 0.0 {
        0
    } else {
        f.to_bits()
    }
}

impl MapKey {
    /// Build the key for a value of type `ty`
    pub fn from_data(data: &Data, ty: &Type) -> HostResult<MapKey> {
        Ok(match data {
            Data::Bool(b) => MapKey::Bool(*b),
            Data::Int(i) => MapKey::Int(*i),
            Data::Uint(u) => MapKey::Uint(*u),
            Data::Float(f) => MapKey::Float(float_bits(*f)),
            Data::Complex(re, im) => MapKey::Complex(float_bits(*re), float_bits(*im)),
            Data::Str(s) => MapKey::Str(s.clone()),
            Data::Pointer(None)
            | Data::Chan(None)
            | Data::Interface(None)
            | Data::Descriptor(None) => MapKey::Nil,
            Data::Pointer(Some(place)) => MapKey::Addr(place.cell_address(), place.path().to_vec()),
            Data::Chan(Some(ch)) => MapKey::Addr(Arc::as_ptr(ch) as *const u8 as usize, Vec::new()),
            Data::UnsafePointer(addr) => MapKey::Addr(*addr, Vec::new()),
            Data::Descriptor(Some(t)) => MapKey::Type(t.id()),
            Data::Interface(Some(inner)) => MapKey::Boxed(
                inner.ty().id(),
                Box::new(MapKey::from_data(&inner.data()?, inner.ty())?),
            ),
            Data::Array(items) => {
                let elem = ty.elem().ok_or_else(|| HostError::Corrupt(ty.to_string()))?;
                MapKey::Seq(
                    items
                        .iter()
                        .map(|d| MapKey::from_data(d, &elem))
                        .collect::<HostResult<_>>()?,
                )
            }
            Data::Struct(items) => MapKey::Seq(
                items
                    .iter()
                    .zip(ty.fields())
                    .map(|(d, f)| MapKey::from_data(d, &f.ty))
                    .collect::<HostResult<_>>()?,
            ),
            Data::Slice(_) | Data::Map(_) | Data::Func(_) => {
                return Err(HostError::Unhashable(ty.to_string()))
            }
        })
    }
}

/// Shared storage behind a non-nil map value
#[derive(Default)]
pub struct HostMap {
    entries: Mutex<FxHashMap<MapKey, (Data, Data)>>,
}

impl HostMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Value stored under `key`
    pub fn get(&self, key: &MapKey) -> Option<Data> {
        self.entries.lock().get(key).map(|(_, v)| v.clone())
    }

    /// Insert or replace an entry
    pub fn insert(&self, key: MapKey, key_data: Data, value: Data) {
        self.entries.lock().insert(key, (key_data, value));
    }

    /// Remove an entry, returning whether it existed
    pub fn remove(&self, key: &MapKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Snapshot of all entries
    pub fn entries(&self) -> Vec<(Data, Data)> {
        self.entries.lock().values().cloned().collect()
    }

    /// Snapshot of all keys
    pub fn keys(&self) -> Vec<Data> {
        self.entries.lock().values().map(|(k, _)| k.clone()).collect()
    }
}

impl fmt::Debug for HostMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostMap").field("len", &self.len()).finish()
    }
}
