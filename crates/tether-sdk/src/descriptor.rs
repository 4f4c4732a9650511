//! Reflective methods of type descriptor values
//!
//! A value of type `host.Type` carries a [`Type`]. Its methods let scripts
//! inspect the type: `t.Name()`, `t.Elem()`, `t.NumField()` and so on.

use crate::error::{HostError, HostResult};
use crate::func::{MethodDef, Receiver};
use crate::types::Type;
use crate::value::NativeValue;

fn subject(recv: &NativeValue) -> HostResult<Type> {
    recv.as_type()
}

fn one(value: impl Into<NativeValue>) -> HostResult<Vec<NativeValue>> {
    Ok(vec![value.into()])
}

fn method<F>(name: &str, results: Vec<Type>, imp: F) -> MethodDef
where
    F: Fn(&Type) -> HostResult<Vec<NativeValue>> + Send + Sync + 'static,
{
    MethodDef::new(name, Receiver::Value, vec![], results, move |recv, _| {
        imp(&subject(recv)?)
    })
}

/// Attach the descriptor methods to `descriptor`, the type being built
pub(crate) fn install(descriptor: &Type) {
    let string = Type::string();
    let int = Type::int();
    let methods = vec![
        method("Name", vec![string.clone()], |t| {
            one(t.name().unwrap_or_default())
        }),
        method("PkgPath", vec![string.clone()], |t| {
            one(t.pkg_path().unwrap_or_default())
        }),
        method("String", vec![string.clone()], |t| one(t.to_string())),
        method("Kind", vec![string.clone()], |t| one(t.kind().name())),
        method("Elem", vec![descriptor.clone()], |t| match t.elem() {
            Some(elem) => Ok(vec![NativeValue::of_type(&elem)]),
            None => Err(HostError::Abort(format!("Elem of invalid type {}", t))),
        }),
        method("Key", vec![descriptor.clone()], |t| match t.key() {
            Some(key) => Ok(vec![NativeValue::of_type(&key)]),
            None => Err(HostError::Abort(format!("Key of non-map type {}", t))),
        }),
        method("Len", vec![int.clone()], |t| match t.len() {
            Some(n) => one(n as i64),
            None => Err(HostError::Abort(format!("Len of non-array type {}", t))),
        }),
        method("NumField", vec![int.clone()], |t| {
            one(t.fields().len() as i64)
        }),
        method("NumMethod", vec![int], |t| {
            one(t.method_set().iter().filter(|m| m.is_exported()).count() as i64)
        }),
        method("Comparable", vec![Type::bool()], |t| one(t.comparable())),
    ];
    for m in methods {
        descriptor.insert_method(m);
    }
}
