//! Struct values

use tether_sdk::NativeValue;

use super::{host_type_name, same_type_equality};
use crate::bridge::convert::convert;
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::resolve;
use crate::value::{CompareOp, ScriptObject, Value};

/// A detached struct. Fields read as copies; stores need a pointer.
#[derive(Debug, Clone)]
pub struct StructFacade(pub(crate) NativeValue);

impl ScriptObject for StructFacade {
    fn type_name(&self) -> String {
        host_type_name(&self.0)
    }

    fn to_text(&self) -> String {
        self.0.to_string()
    }

    fn native(&self) -> Option<&NativeValue> {
        Some(&self.0)
    }

    fn set_field(&self, name: &str, value: &Value) -> BridgeResult<()> {
        let Some(location) = resolve::field_location(&self.0, name)? else {
            return Err(BridgeError::NoSuchField {
                ty: "struct".to_string(),
                field: name.to_string(),
            });
        };
        convert(value, location.ty())?;
        Err(BridgeError::CannotSet(format!(".{} field of struct", name)))
    }

    fn compare(&self, op: CompareOp, other: &Value) -> BridgeResult<bool> {
        same_type_equality(&self.0, op, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::error::ErrorCategory;
    use crate::bridge::wrap::wrap;
    use tether_sdk::{Field, Type};

    fn point() -> Type {
        Type::define(
            "main",
            "Point",
            &Type::struct_of(vec![Field::new("X", Type::int()), Field::new("Y", Type::int())]),
        )
    }

    #[test]
    fn test_fields_read_as_copies() {
        let s = wrap(NativeValue::zero(&point())).unwrap();
        assert!(s.attr("X").unwrap().unwrap().equals(&Value::Int(0)).unwrap());
        assert_eq!(s.attr_names(), vec!["X", "Y"]);
        assert!(s.truth());
        assert_eq!(s.to_string(), "{0 0}");
    }

    #[test]
    fn test_detached_struct_cannot_be_set() {
        let s = wrap(NativeValue::zero(&point())).unwrap();
        let err = s.set_field("X", &Value::Int(1)).unwrap_err();
        assert_eq!(err.to_string(), "can't set .X field of struct");
        assert_eq!(err.category(), ErrorCategory::Mutation);
        let err = s.set_field("X", &Value::str("1")).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Conversion);
        let err = s.set_field("Z", &Value::Int(1)).unwrap_err();
        assert_eq!(err.to_string(), "struct has no .Z field");
    }

    #[test]
    fn test_unhashable() {
        let s = wrap(NativeValue::zero(&point())).unwrap();
        assert!(matches!(s.hash(), Err(BridgeError::Unhashable(_))));
    }

    #[test]
    fn test_equality() {
        let a = wrap(NativeValue::zero(&point())).unwrap();
        let b = wrap(NativeValue::zero(&point())).unwrap();
        assert!(!a.equals(&b).unwrap());
        let t = point();
        let c = wrap(NativeValue::zero(&t)).unwrap();
        let d = wrap(NativeValue::zero(&t)).unwrap();
        assert!(c.equals(&d).unwrap());
    }
}
