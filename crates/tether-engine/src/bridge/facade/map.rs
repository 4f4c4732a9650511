//! Map values

use tether_sdk::{NativeValue, Type};

use super::host_type_name;
use crate::bridge::convert::convert;
use crate::bridge::copy_policy::{surface, AccessMode};
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::value::{ScriptObject, Value, ValueIter};

/// A map. Copies share the entries.
#[derive(Debug, Clone)]
pub struct MapFacade(pub(crate) NativeValue);

impl MapFacade {
    fn key_and_value_types(&self) -> BridgeResult<(Type, Type)> {
        let ty = self.0.ty();
        match (ty.key(), ty.elem()) {
            (Some(k), Some(v)) => Ok((k, v)),
            _ => Err(BridgeError::Invariant(format!("map type {} without key or element", ty))),
        }
    }
}

impl ScriptObject for MapFacade {
    fn type_name(&self) -> String {
        host_type_name(&self.0)
    }

    fn to_text(&self) -> String {
        self.0.to_string()
    }

    fn truth(&self) -> bool {
        self.0.is_nil().is_ok_and(|nil| !nil)
    }

    fn native(&self) -> Option<&NativeValue> {
        Some(&self.0)
    }

    fn get_key(&self, key: &Value) -> BridgeResult<Value> {
        Err(BridgeError::NotImplemented(format!("m[{}]", key)))
    }

    fn set_key(&self, key: &Value, value: &Value) -> BridgeResult<()> {
        let (key_ty, value_ty) = self.key_and_value_types()?;
        let k = convert(key, &key_ty).map_err(|e| BridgeError::MapEntry {
            part: "key",
            source: Box::new(e),
        })?;
        let v = convert(value, &value_ty).map_err(|e| BridgeError::MapEntry {
            part: "element",
            source: Box::new(e),
        })?;
        self.0.map_insert(&k, &v)?;
        Ok(())
    }

    fn len(&self) -> BridgeResult<usize> {
        Ok(self.0.len()?)
    }

    /// Keys, snapshotted in host iteration order
    fn iterate(&self) -> BridgeResult<ValueIter> {
        let keys = self
            .0
            .map_keys()?
            .into_iter()
            .map(|k| surface(k, AccessMode::Copy))
            .collect::<BridgeResult<Vec<_>>>()?;
        Ok(ValueIter::new(keys))
    }
}
