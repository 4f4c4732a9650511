//! Raw pointers

use tether_sdk::NativeValue;

use super::{hash_native, host_type_name, same_type_equality};
use crate::bridge::error::BridgeResult;
use crate::value::{CompareOp, ScriptObject, Value};

/// unsafe.Pointer: an opaque address. Never dereferenced.
#[derive(Debug, Clone)]
pub struct UnsafePointerFacade(pub(crate) NativeValue);

impl ScriptObject for UnsafePointerFacade {
    fn type_name(&self) -> String {
        host_type_name(&self.0)
    }

    fn to_text(&self) -> String {
        self.0.to_string()
    }

    fn truth(&self) -> bool {
        self.0.address().is_ok_and(|a| a != 0)
    }

    fn hash(&self) -> BridgeResult<u64> {
        hash_native(&self.0)
    }

    fn native(&self) -> Option<&NativeValue> {
        Some(&self.0)
    }

    fn compare(&self, op: CompareOp, other: &Value) -> BridgeResult<bool> {
        same_type_equality(&self.0, op, other)
    }
}
