//! Type descriptors: `T()` is the zero value, `T(x)` a conversion

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use tether_sdk::{NativeValue, Type};

use crate::bridge::convert::convert;
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::thread::Thread;
use crate::bridge::wrap::wrap;
use crate::value::{CompareOp, ScriptObject, Value};

/// A host type as a script value
#[derive(Debug, Clone)]
pub struct TypeFacade(pub(crate) NativeValue);

impl TypeFacade {
    /// The described type
    pub fn described(&self) -> BridgeResult<Type> {
        Ok(self.0.as_type()?)
    }
}

impl ScriptObject for TypeFacade {
    fn type_name(&self) -> String {
        "host.type".to_string()
    }

    fn to_text(&self) -> String {
        self.0.to_string()
    }

    fn truth(&self) -> bool {
        self.0.is_nil().is_ok_and(|nil| !nil)
    }

    fn hash(&self) -> BridgeResult<u64> {
        let mut h = FxHasher::default();
        self.described()?.id().hash(&mut h);
        Ok(h.finish())
    }

    fn native(&self) -> Option<&NativeValue> {
        Some(&self.0)
    }

    fn call(
        &self,
        _thread: &Thread,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> BridgeResult<Value> {
        let ty = self.described()?;
        if !kwargs.is_empty() {
            return Err(BridgeError::NamedArguments(ty.to_string()));
        }
        match args {
            [] => wrap(NativeValue::zero(&ty)),
            [arg] => wrap(convert(arg, &ty)?),
            _ => Err(BridgeError::Arity {
                func: ty.to_string(),
                got: args.len(),
                want: "zero or one".to_string(),
            }),
        }
    }

    fn compare(&self, op: CompareOp, other: &Value) -> BridgeResult<bool> {
        if !op.is_equality() {
            return Err(BridgeError::Comparison {
                op: op.symbol(),
                left: self.type_name(),
                right: other.type_name(),
            });
        }
        let same = match other.native() {
            Some(o) if o.ty().is_descriptor() => o.as_type().ok() == self.0.as_type().ok(),
            _ => false,
        };
        Ok(same == (op == CompareOp::Eq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_sdk::Field;

    fn desc(t: &Type) -> Value {
        wrap(NativeValue::of_type(t)).unwrap()
    }

    #[test]
    fn test_construct_and_convert() {
        let th = Thread::new("test");
        let zero = desc(&Type::int8()).call(&th, &[], &[]).unwrap();
        assert!(zero.equals(&Value::Int(0)).unwrap());
        let v = desc(&Type::int8()).call(&th, &[Value::Int(-3)], &[]).unwrap();
        assert!(v.equals(&Value::Int(-3)).unwrap());
        assert!(desc(&Type::int8()).call(&th, &[Value::Int(300)], &[]).is_err());
        let err = desc(&Type::int8())
            .call(&th, &[Value::Int(1), Value::Int(2)], &[])
            .unwrap_err();
        assert_eq!(err.to_string(), "in call to int8, got 2 arguments, want zero or one");
    }

    #[test]
    fn test_named_types() {
        let th = Thread::new("test");
        let celsius = Type::define("main", "Celsius", &Type::float64());
        let c = desc(&celsius).call(&th, &[Value::Float(21.5)], &[]).unwrap();
        let n = c.native().unwrap();
        assert_eq!(n.ty(), &celsius);
        assert_eq!(n.as_float().unwrap(), 21.5);

        let point = Type::define("main", "Point", &Type::struct_of(vec![Field::new("X", Type::int())]));
        let p = desc(&point).call(&th, &[], &[]).unwrap();
        assert_eq!(p.type_name(), "host.struct<main.Point>");
    }

    #[test]
    fn test_identity() {
        let a = desc(&Type::slice_of(&Type::int()));
        let b = desc(&Type::slice_of(&Type::int()));
        assert!(a.equals(&b).unwrap());
        assert!(!a.equals(&desc(&Type::int())).unwrap());
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
        assert_eq!(a.to_string(), "[]int");
        assert_eq!(a.type_name(), "host.type");
    }

    #[test]
    fn test_descriptor_methods() {
        let point = Type::define("main", "Point", &Type::struct_of(vec![]));
        let d = desc(&point);
        let th = Thread::new("test");
        let name = d.attr("Name").unwrap().unwrap().call(&th, &[], &[]).unwrap();
        assert!(name.equals(&Value::str("Point")).unwrap());
    }
}
