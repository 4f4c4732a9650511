//! Defined bool, number and string types

use tether_sdk::NativeValue;

use super::{hash_native, host_type_name, same_type_equality};
use crate::bridge::error::BridgeResult;
use crate::value::{CompareOp, ScriptObject, UnaryOp, Value};

/// A value of a defined type whose underlying type is bool, a number or
/// string. It carries its type's methods.
#[derive(Debug, Clone)]
pub struct NamedFacade(pub(crate) NativeValue);

impl ScriptObject for NamedFacade {
    fn type_name(&self) -> String {
        host_type_name(&self.0)
    }

    fn to_text(&self) -> String {
        self.0.to_string()
    }

    // Always true, whatever the contents.
    fn truth(&self) -> bool {
        true
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

    fn unary(&self, op: UnaryOp) -> BridgeResult<Option<Value>> {
        match op {
            UnaryOp::Plus => Ok(Some(Value::Host(super::Facade::Named(self.clone())))),
            _ => Ok(None),
        }
    }
}
