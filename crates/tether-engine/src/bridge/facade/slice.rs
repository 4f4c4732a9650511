//! Slice values

use tether_sdk::NativeValue;

use super::{element, elements, host_type_name, index_arg};
use crate::bridge::convert::convert;
use crate::bridge::copy_policy::AccessMode;
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::value::{CompareOp, ScriptObject, Value, ValueIter};

/// A slice. Copies share the backing array, so element stores are visible
/// through every copy.
#[derive(Debug, Clone)]
pub struct SliceFacade(pub(crate) NativeValue);

impl ScriptObject for SliceFacade {
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

    fn index(&self, index: &Value, mode: AccessMode) -> BridgeResult<Value> {
        element(&self.0, index, mode)
    }

    fn set_index(&self, index: &Value, value: &Value) -> BridgeResult<()> {
        let slot = self.0.index(index_arg(index, self.0.len()?)?)?;
        let converted = convert(value, slot.ty())?;
        Ok(slot.set(&converted)?)
    }

    fn len(&self) -> BridgeResult<usize> {
        Ok(self.0.len()?)
    }

    fn iterate(&self) -> BridgeResult<ValueIter> {
        elements(&self.0)
    }

    fn compare(&self, _op: CompareOp, _other: &Value) -> BridgeResult<bool> {
        Err(BridgeError::NotImplemented("slice comparison".to_string()))
    }
}
