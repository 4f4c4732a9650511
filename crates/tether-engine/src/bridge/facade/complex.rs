//! Complex numbers

use tether_sdk::NativeValue;

use super::{hash_native, host_type_name, same_type_equality, Facade};
use crate::bridge::error::BridgeResult;
use crate::value::{BinaryOp, CompareOp, ScriptObject, Side, UnaryOp, Value};

/// complex64 or complex128 value.
///
/// Supports equality; arithmetic yields no result rather than an error.
#[derive(Debug, Clone)]
pub struct ComplexFacade(pub(crate) NativeValue);

impl ScriptObject for ComplexFacade {
    fn type_name(&self) -> String {
        host_type_name(&self.0)
    }

    fn to_text(&self) -> String {
        self.0.to_string()
    }

    fn truth(&self) -> bool {
        self.0.as_complex().is_ok_and(|(re, im)| re != 0.0 || im != 0.0)
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
            UnaryOp::Plus => Ok(Some(Value::Host(Facade::Complex(self.clone())))),
            _ => Ok(None),
        }
    }

    fn binary(&self, _op: BinaryOp, _other: &Value, _side: Side) -> BridgeResult<Option<Value>> {
        Ok(None)
    }
}
