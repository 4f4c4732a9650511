//! Typed pointers: the script's reference handle to host storage

use tether_sdk::{HostError, Kind, NativeValue};

use super::{element, elements, hash_native, host_type_name, index_arg, same_type_equality};
use crate::bridge::convert::convert;
use crate::bridge::copy_policy::AccessMode;
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::resolve;
use crate::value::{CompareOp, ScriptObject, Value, ValueIter};

/// Pointer value. Field and element stores go through it into the
/// pointee; equality is identity of the pointee.
#[derive(Debug, Clone)]
pub struct PointerFacade(pub(crate) NativeValue);

impl PointerFacade {
    /// Pointee, when it is an array
    fn array(&self, op: &'static str) -> BridgeResult<NativeValue> {
        match self.0.ty().elem() {
            Some(elem) if elem.kind() == Kind::Array => Ok(self.0.elem()?),
            _ => Err(BridgeError::unsupported(op, self.type_name())),
        }
    }
}

impl ScriptObject for PointerFacade {
    fn type_name(&self) -> String {
        host_type_name(&self.0)
    }

    fn to_text(&self) -> String {
        self.0.to_string()
    }

    fn truth(&self) -> bool {
        self.0.is_nil().is_ok_and(|nil| !nil)
    }

    fn hash(&self) -> BridgeResult<u64> {
        hash_native(&self.0)
    }

    fn native(&self) -> Option<&NativeValue> {
        Some(&self.0)
    }

    fn set_field(&self, name: &str, value: &Value) -> BridgeResult<()> {
        if self.0.is_nil()? {
            return Err(HostError::NilDereference.into());
        }
        let Some(location) = resolve::field_location(&self.0, name)? else {
            return Err(BridgeError::CannotSet(format!(".{} field of {}", name, self.0.ty())));
        };
        let converted = convert(value, location.ty())?;
        location.set(&converted)?;
        Ok(())
    }

    fn index(&self, index: &Value, mode: AccessMode) -> BridgeResult<Value> {
        element(&self.array("indexing")?, index, mode)
    }

    fn set_index(&self, index: &Value, value: &Value) -> BridgeResult<()> {
        let array = self.array("index assignment")?;
        let slot = array.index(index_arg(index, array.len()?)?)?;
        let converted = convert(value, slot.ty())?;
        slot.set(&converted)?;
        Ok(())
    }

    fn len(&self) -> BridgeResult<usize> {
        Ok(self.array("len")?.len()?)
    }

    fn iterate(&self) -> BridgeResult<ValueIter> {
        elements(&self.array("iteration")?)
    }

    fn compare(&self, op: CompareOp, other: &Value) -> BridgeResult<bool> {
        same_type_equality(&self.0, op, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::wrap::wrap;
    use tether_sdk::{Field, Type};

    fn point() -> Type {
        Type::define(
            "main",
            "Point",
            &Type::struct_of(vec![Field::new("X", Type::int()), Field::new("y", Type::int())]),
        )
    }

    #[test]
    fn test_store_through_pointer() {
        let var = NativeValue::alloc(&point());
        let p = wrap(var.addr().unwrap()).unwrap();
        p.set_field("X", &Value::Int(10)).unwrap();
        assert_eq!(var.field(0).unwrap().as_int().unwrap(), 10);
        assert!(p.attr("X").unwrap().unwrap().equals(&Value::Int(10)).unwrap());

        let err = p.set_field("X", &Value::str("ten")).unwrap_err();
        assert_eq!(err.to_string(), "cannot convert string to host int");
        assert!(matches!(p.set_field("y", &Value::Int(1)), Err(BridgeError::Unexported(_))));
        let err = p.set_field("Z", &Value::Int(1)).unwrap_err();
        assert_eq!(err.to_string(), "can't set .Z field of *main.Point");
    }

    #[test]
    fn test_nil_pointer() {
        let nil = wrap(NativeValue::zero(&Type::pointer_to(&point()))).unwrap();
        assert!(!nil.truth());
        assert_eq!(nil.set_field("X", &Value::Int(1)).unwrap_err().to_string(), "nil dereference");
        assert_eq!(nil.attr("X").unwrap_err().to_string(), "nil dereference");
        assert!(!nil.equals(&Value::None).unwrap());
    }

    #[test]
    fn test_identity_equality() {
        let var = NativeValue::alloc(&point());
        let a = wrap(var.addr().unwrap()).unwrap();
        let b = wrap(var.addr().unwrap()).unwrap();
        let other = wrap(NativeValue::new_pointer(&point())).unwrap();
        assert!(a.equals(&b).unwrap());
        assert!(!a.equals(&other).unwrap());
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn test_pointer_to_array() {
        let arr = Type::array_of(3, &Type::int());
        let p = wrap(NativeValue::new_pointer(&arr)).unwrap();
        p.set_index(&Value::Int(1), &Value::Int(5)).unwrap();
        assert_eq!(p.len().unwrap(), 3);
        assert!(p.index(&Value::Int(1)).unwrap().equals(&Value::Int(5)).unwrap());
        let items: Vec<Value> = p.iterate().unwrap().collect();
        assert_eq!(items.len(), 3);
        assert!(p.index(&Value::Int(3)).is_err());
    }
}
