//! Array values

use tether_sdk::NativeValue;

use super::{element, elements, hash_native, host_type_name, index_arg};
use crate::bridge::convert::convert;
use crate::bridge::copy_policy::AccessMode;
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::value::{CompareOp, ScriptObject, Value, ValueIter};

/// A detached array. Elements read as copies; stores need a pointer to
/// the array.
#[derive(Debug, Clone)]
pub struct ArrayFacade(pub(crate) NativeValue);

impl ScriptObject for ArrayFacade {
    fn type_name(&self) -> String {
        host_type_name(&self.0)
    }

    fn to_text(&self) -> String {
        self.0.to_string()
    }

    fn truth(&self) -> bool {
        self.0.len().is_ok_and(|n| n > 0)
    }

    fn hash(&self) -> BridgeResult<u64> {
        hash_native(&self.0)
    }

    fn native(&self) -> Option<&NativeValue> {
        Some(&self.0)
    }

    fn index(&self, index: &Value, mode: AccessMode) -> BridgeResult<Value> {
        element(&self.0, index, mode)
    }

    fn set_index(&self, index: &Value, value: &Value) -> BridgeResult<()> {
        let slot = self.0.index(index_arg(index, self.0.len()?)?)?;
        convert(value, slot.ty())?;
        Err(BridgeError::CannotSet("array element".to_string()))
    }

    fn len(&self) -> BridgeResult<usize> {
        Ok(self.0.len()?)
    }

    fn iterate(&self) -> BridgeResult<ValueIter> {
        elements(&self.0)
    }

    fn compare(&self, _op: CompareOp, _other: &Value) -> BridgeResult<bool> {
        Err(BridgeError::NotImplemented("array comparison".to_string()))
    }
}
