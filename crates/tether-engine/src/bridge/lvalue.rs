//! Script variables holding host values
//!
//! A variable owns addressable storage, so `p.X = 3` can write into it and
//! `&p` can hand out a pointer that stays valid across later stores.

use tether_sdk::{NativeValue, Type};

use crate::bridge::convert::convert;
use crate::bridge::copy_policy::{surface, AccessMode};
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::resolve::resolve_attr;
use crate::bridge::wrap::wrap;
use crate::value::Value;

/// Addressable home of a host value bound to a script name
#[derive(Debug, Clone)]
pub struct Variable {
    cell: NativeValue,
}

impl Variable {
    /// Fresh storage holding a copy of `value`
    pub fn new(value: &NativeValue) -> BridgeResult<Self> {
        let cell = NativeValue::alloc(value.ty());
        cell.set(&value.detach()?)?;
        Ok(Self { cell })
    }

    /// Variable for the result of a script expression; only host values
    /// have storage of their own
    pub fn declare(value: &Value) -> BridgeResult<Self> {
        match value.native() {
            Some(native) => Self::new(native),
            None => Err(BridgeError::unsupported("host variables", value.type_name())),
        }
    }

    /// Static type of the stored value
    pub fn ty(&self) -> &Type {
        self.cell.ty()
    }

    /// `p`: a copy of the current contents
    pub fn load(&self) -> BridgeResult<Value> {
        surface(self.cell.clone(), AccessMode::Copy)
    }

    /// `p` as the base of an assignment: aliases the storage
    pub fn target(&self) -> BridgeResult<Value> {
        surface(self.cell.clone(), AccessMode::Alias)
    }

    /// `&p`
    pub fn address(&self) -> BridgeResult<Value> {
        wrap(self.cell.addr()?)
    }

    /// `p = value`.
    ///
    /// A host value of another type rebinds the variable to new storage;
    /// anything else is converted and written in place.
    pub fn store(&mut self, value: &Value) -> BridgeResult<()> {
        if let Some(native) = value.native() {
            if native.ty() != self.ty() {
                tracing::trace!(from = %self.ty(), to = %native.ty(), "variable rebound");
                *self = Self::new(native)?;
                return Ok(());
            }
        }
        let converted = convert(value, self.ty())?;
        self.cell.set(&converted)?;
        Ok(())
    }

    /// `p.name`, resolved against the storage so pointer-receiver methods
    /// are reachable
    pub fn attr(&self, name: &str) -> BridgeResult<Option<Value>> {
        resolve_attr(&self.cell, name, AccessMode::Copy)
    }
}
