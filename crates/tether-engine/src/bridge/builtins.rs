//! The `host` package: builtins and predeclared types
//!
//! Builtins validate their arguments up front and fail with ordinary
//! errors. `typeof`, `new`, `complex` and `panic` are host functions and
//! run through the call trap like any other host code.

use std::sync::Arc;

use tether_sdk::{Data, HostError, Kind, NativeFunc, NativeValue, Type};

use crate::bridge::convert::convert;
use crate::bridge::copy_policy::{surface, AccessMode};
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::package::Package;
use crate::bridge::thread::Thread;
use crate::bridge::wrap::wrap;
use crate::bridge::type_of;
use crate::value::{ScriptObject, Value};

/// Implementation of a builtin, called once the argument count is checked
pub type BuiltinFn = fn(&Thread, &[Value]) -> BridgeResult<Value>;

/// A function implemented by the bridge itself
#[derive(Debug)]
pub struct Builtin {
    name: &'static str,
    min_args: usize,
    max_args: Option<usize>,
    imp: BuiltinFn,
}

impl Builtin {
    /// Builtin taking between `min_args` and `max_args` positional
    /// arguments (`None` for no upper bound)
    pub fn new(name: &'static str, min_args: usize, max_args: Option<usize>, imp: BuiltinFn) -> Self {
        Self {
            name,
            min_args,
            max_args,
            imp,
        }
    }

    /// Name in the `host` package
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn want(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }
}

impl ScriptObject for Builtin {
    fn type_name(&self) -> String {
        "builtin_function_or_method".to_string()
    }

    fn to_text(&self) -> String {
        format!("<built-in function {}>", self.name)
    }

    fn call(
        &self,
        thread: &Thread,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> BridgeResult<Value> {
        if !kwargs.is_empty() {
            return Err(BridgeError::NamedArguments(self.name.to_string()));
        }
        let too_few = args.len() < self.min_args;
        let too_many = self.max_args.is_some_and(|max| args.len() > max);
        if too_few || too_many {
            return Err(BridgeError::Arity {
                func: self.name.to_string(),
                got: args.len(),
                want: self.want(),
            });
        }
        tracing::trace!(builtin = self.name, args = args.len(), "builtin call");
        (self.imp)(thread, args)
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

fn bad(func: &'static str, index: usize, want: &'static str, got: &Value) -> BridgeError {
    BridgeError::BadArgument {
        func,
        position: index + 1,
        want,
        got: got.type_name(),
    }
}

fn native_arg<'a>(
    func: &'static str,
    args: &'a [Value],
    index: usize,
    want: &'static str,
    accept: impl Fn(&NativeValue) -> bool,
) -> BridgeResult<&'a NativeValue> {
    match args[index].native() {
        Some(v) if accept(v) => Ok(v),
        _ => Err(bad(func, index, want, &args[index])),
    }
}

fn chan_arg<'a>(func: &'static str, args: &'a [Value]) -> BridgeResult<&'a NativeValue> {
    native_arg(func, args, 0, "channel", |v| v.kind() == Kind::Chan)
}

fn type_arg(func: &'static str, args: &[Value], index: usize) -> BridgeResult<Type> {
    let v = native_arg(func, args, index, "type", |v| v.ty().is_descriptor())?;
    Ok(v.as_type()?)
}

fn size_arg(func: &'static str, args: &[Value], index: usize) -> BridgeResult<usize> {
    match &args[index] {
        Value::Int(n) => usize::try_from(*n).map_err(|_| bad(func, index, "non-negative int", &args[index])),
        other => Err(bad(func, index, "non-negative int", other)),
    }
}

fn copy_out(value: NativeValue) -> BridgeResult<Value> {
    surface(value, AccessMode::Copy)
}

// ============================================================================
// Builtins
// ============================================================================

fn cap(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    let v = native_arg("cap", args, 0, "slice, array or channel", |v| match v.kind() {
        Kind::Slice | Kind::Array | Kind::Chan => true,
        Kind::Pointer => v.ty().elem().is_some_and(|e| e.kind() == Kind::Array),
        _ => false,
    })?;
    let n = match v.ty().elem() {
        Some(elem) if v.kind() == Kind::Pointer => elem.len().unwrap_or_default(),
        _ => v.cap()?,
    };
    Ok(Value::Int(n as i128))
}

fn len(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    Ok(Value::Int(args[0].len()? as i128))
}

fn close(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    chan_arg("close", args)?.chan_close()?;
    Ok(Value::None)
}

fn chan_element(func: &'static str, ch: &NativeValue, value: &Value) -> BridgeResult<NativeValue> {
    let elem = ch
        .ty()
        .elem()
        .ok_or_else(|| BridgeError::Invariant(format!("channel type {} has no element", ch.ty())))?;
    convert(value, &elem).map_err(|e| e.in_argument(2, func))
}

fn send(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    let ch = chan_arg("send", args)?;
    ch.chan_send(&chan_element("send", ch, &args[1])?)?;
    Ok(Value::None)
}

fn recv(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    let (value, ok) = chan_arg("recv", args)?.chan_recv()?;
    Ok(Value::Tuple(vec![copy_out(value)?, Value::Bool(ok)]))
}

fn try_send(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    let ch = chan_arg("try_send", args)?;
    Ok(Value::Bool(ch.chan_try_send(&chan_element("try_send", ch, &args[1])?)?))
}

fn try_recv(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    match chan_arg("try_recv", args)?.chan_try_recv()? {
        Some((value, ok)) => Ok(Value::Tuple(vec![copy_out(value)?, Value::Bool(ok)])),
        None => Ok(Value::None),
    }
}

fn append(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    let s = native_arg("append", args, 0, "slice", |v| v.kind() == Kind::Slice)?;
    let elem = s
        .ty()
        .elem()
        .ok_or_else(|| BridgeError::Invariant(format!("slice type {} has no element", s.ty())))?;
    let vals = args[1..]
        .iter()
        .enumerate()
        .map(|(i, v)| convert(v, &elem).map_err(|e| e.in_argument(i + 2, "append")))
        .collect::<BridgeResult<Vec<_>>>()?;
    copy_out(s.append(&vals)?)
}

fn slice(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    let base = match &args[0] {
        Value::Str(_) => convert(&args[0], &Type::string())?,
        other => other
            .native()
            .cloned()
            .ok_or_else(|| bad("slice", 0, "slice, string or pointer to array", other))?,
    };
    let lo = size_arg("slice", args, 1)?;
    let hi = size_arg("slice", args, 2)?;
    let max = match args.get(3) {
        Some(_) => Some(size_arg("slice", args, 3)?),
        None => None,
    };
    copy_out(base.reslice(lo, hi, max)?)
}

fn indirect(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    let p = native_arg("indirect", args, 0, "pointer", |v| {
        v.kind() == Kind::Pointer && !v.ty().is_descriptor()
    })?;
    if p.is_nil()? {
        return Err(HostError::NilDereference.into());
    }
    copy_out(p.elem()?)
}

fn make_slice(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    let ty = type_arg("make_slice", args, 0)?;
    if ty.kind() != Kind::Slice {
        return Err(bad("make_slice", 0, "slice type", &args[0]));
    }
    let len = size_arg("make_slice", args, 1)?;
    let cap = match args.get(2) {
        Some(_) => size_arg("make_slice", args, 2)?,
        None => len,
    };
    wrap(NativeValue::make_slice(&ty, len, cap)?)
}

fn make_map(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    let ty = type_arg("make_map", args, 0)?;
    if ty.kind() != Kind::Map {
        return Err(bad("make_map", 0, "map type", &args[0]));
    }
    wrap(NativeValue::make_map(&ty)?)
}

fn make_chan(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    let ty = type_arg("make_chan", args, 0)?;
    if ty.kind() != Kind::Chan {
        return Err(bad("make_chan", 0, "channel type", &args[0]));
    }
    let cap = match args.get(1) {
        Some(_) => size_arg("make_chan", args, 1)?,
        None => 0,
    };
    wrap(NativeValue::make_chan(&ty, cap)?)
}

fn map_of(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    let key = type_arg("map_of", args, 0)?;
    let value = type_arg("map_of", args, 1)?;
    Ok(type_of(&Type::map_of(&key, &value)?))
}

fn array_of(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    let n = size_arg("array_of", args, 0)?;
    Ok(type_of(&Type::try_array_of(n, &type_arg("array_of", args, 1)?)?))
}

fn slice_of(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    Ok(type_of(&Type::slice_of(&type_arg("slice_of", args, 0)?)))
}

fn ptr_to(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    Ok(type_of(&Type::pointer_to(&type_arg("ptr_to", args, 0)?)))
}

fn chan_of(_: &Thread, args: &[Value]) -> BridgeResult<Value> {
    Ok(type_of(&Type::chan_of(&type_arg("chan_of", args, 0)?)))
}

const BUILTINS: &[(&str, usize, Option<usize>, BuiltinFn)] = &[
    ("cap", 1, Some(1), cap),
    ("len", 1, Some(1), len),
    ("close", 1, Some(1), close),
    ("send", 2, Some(2), send),
    ("recv", 1, Some(1), recv),
    ("try_send", 2, Some(2), try_send),
    ("try_recv", 1, Some(1), try_recv),
    ("append", 1, None, append),
    ("slice", 3, Some(4), slice),
    ("indirect", 1, Some(1), indirect),
    ("make_slice", 2, Some(3), make_slice),
    ("make_map", 1, Some(1), make_map),
    ("make_chan", 1, Some(2), make_chan),
    ("map_of", 2, Some(2), map_of),
    ("array_of", 2, Some(2), array_of),
    ("slice_of", 1, Some(1), slice_of),
    ("ptr_to", 1, Some(1), ptr_to),
    ("chan_of", 1, Some(1), chan_of),
];

// ============================================================================
// Host functions
// ============================================================================

fn host_funcs() -> Vec<NativeFunc> {
    vec![
        NativeFunc::with_signature(
            "typeof",
            vec![Type::any()],
            vec![Type::descriptor()],
            false,
            |args| {
                Ok(vec![match args[0].unbox()? {
                    Some(inner) => NativeValue::of_type(inner.ty()),
                    None => NativeValue::zero(&Type::descriptor()),
                }])
            },
        ),
        NativeFunc::with_signature(
            "new",
            vec![Type::descriptor()],
            vec![Type::any()],
            false,
            |args| Ok(vec![NativeValue::new_pointer(&args[0].as_type()?)]),
        ),
        NativeFunc::with_signature(
            "complex",
            vec![Type::float64(), Type::float64()],
            vec![Type::complex128()],
            false,
            |args| {
                let (re, im) = (args[0].as_float()?, args[1].as_float()?);
                Ok(vec![NativeValue::new(Type::complex128(), Data::Complex(re, im))])
            },
        ),
        NativeFunc::with_signature("panic", vec![Type::any()], vec![], false, |args| {
            let text = match args[0].unbox()? {
                Some(inner) => inner.to_string(),
                None => "nil".to_string(),
            };
            Err(HostError::Abort(text))
        }),
    ]
}

fn predeclared() -> Vec<(&'static str, Type)> {
    vec![
        ("bool", Type::bool()),
        ("int", Type::int()),
        ("int8", Type::int8()),
        ("int16", Type::int16()),
        ("int32", Type::int32()),
        ("int64", Type::int64()),
        ("uint", Type::uint()),
        ("uint8", Type::uint8()),
        ("uint16", Type::uint16()),
        ("uint32", Type::uint32()),
        ("uint64", Type::uint64()),
        ("uintptr", Type::uintptr()),
        ("byte", Type::byte()),
        ("rune", Type::rune()),
        ("float32", Type::float32()),
        ("float64", Type::float64()),
        ("complex64", Type::complex64()),
        ("complex128", Type::complex128()),
        ("string", Type::string()),
        ("error", Type::error()),
        ("any", Type::any()),
    ]
}

/// The `host` package
pub fn module() -> BridgeResult<Arc<Package>> {
    let mut pkg = Package::new("host");
    for &(name, min, max, imp) in BUILTINS {
        pkg.insert(name, Value::Builtin(Arc::new(Builtin::new(name, min, max, imp))));
    }
    for f in host_funcs() {
        let name = f.name().to_string();
        pkg.insert(name, wrap(f.into_value())?);
    }
    for (name, ty) in predeclared() {
        pkg.insert(name, type_of(&ty));
    }
    Ok(Arc::new(pkg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::error::ErrorCategory;
    use tether_sdk::Field;

    fn host() -> Value {
        Value::Package(module().unwrap())
    }

    fn call(name: &str, args: &[Value]) -> BridgeResult<Value> {
        let t = Thread::new("test");
        host().attr(name).unwrap().unwrap().call(&t, args, &[])
    }

    fn ty(name: &str) -> Value {
        host().attr(name).unwrap().unwrap()
    }

    fn int_slice(items: &[i64]) -> Value {
        let vals: Vec<NativeValue> = items.iter().map(|&i| NativeValue::from(i)).collect();
        wrap(NativeValue::slice_from(&Type::slice_of(&Type::int()), &vals).unwrap()).unwrap()
    }

    #[test]
    fn test_module_contents() {
        let names = host().attr_names();
        for expected in ["append", "cap", "complex", "int64", "make_chan", "new", "panic", "typeof"] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
        assert_eq!(ty("len").to_string(), "<built-in function len>");
        assert_eq!(ty("len").type_name(), "builtin_function_or_method");
    }

    #[test]
    fn test_append() {
        let s = call("append", &[int_slice(&[1]), Value::Int(2), Value::Int(3)]).unwrap();
        assert_eq!(s.to_string(), "[1 2 3]");
        let err = call("append", &[]).unwrap_err();
        assert_eq!(err.to_string(), "in call to append, got 0 arguments, want at least 1");
        let err = call("append", &[Value::Int(1)]).unwrap_err();
        assert_eq!(err.to_string(), "append: want slice, got int for argument 1");
        let err = call("append", &[int_slice(&[]), Value::str("x")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "in argument 2 of call to append, cannot convert string to host int"
        );
    }

    #[test]
    fn test_len_and_cap() {
        let s = call("make_slice", &[call("slice_of", &[ty("int")]).unwrap(), Value::Int(2), Value::Int(5)]).unwrap();
        assert!(call("len", &[s.clone()]).unwrap().equals(&Value::Int(2)).unwrap());
        assert!(call("cap", &[s]).unwrap().equals(&Value::Int(5)).unwrap());
        assert!(call("len", &[Value::str("abc")]).unwrap().equals(&Value::Int(3)).unwrap());
        assert!(call("cap", &[Value::Int(1)]).is_err());
    }

    #[test]
    fn test_make_validates() {
        let err = call("make_slice", &[ty("int"), Value::Int(1)]).unwrap_err();
        assert_eq!(err.to_string(), "make_slice: want slice type, got host.type for argument 1");
        let slice_ty = call("slice_of", &[ty("int")]).unwrap();
        assert!(call("make_slice", &[slice_ty.clone(), Value::Int(-1)]).is_err());
        let err = call("make_slice", &[slice_ty, Value::Int(3), Value::Int(1)]).unwrap_err();
        assert_ne!(err.category(), ErrorCategory::HostFault);
    }

    #[test]
    fn test_type_constructors() {
        let m = call("map_of", &[ty("string"), ty("int")]).unwrap();
        assert_eq!(m.to_string(), "map[string]int");
        let bad_key = call("slice_of", &[ty("int")]).unwrap();
        assert!(call("map_of", &[bad_key, ty("int")]).is_err());
        assert_eq!(call("array_of", &[Value::Int(3), ty("uint8")]).unwrap().to_string(), "[3]uint8");
        assert_eq!(call("ptr_to", &[ty("int")]).unwrap().to_string(), "*int");
        assert_eq!(call("chan_of", &[ty("bool")]).unwrap().to_string(), "chan bool");
    }

    #[test]
    fn test_channels() {
        let ct = call("chan_of", &[ty("int")]).unwrap();
        let ch = call("make_chan", &[ct, Value::Int(1)]).unwrap();
        assert!(call("try_recv", &[ch.clone()]).unwrap().equals(&Value::None).unwrap());
        call("send", &[ch.clone(), Value::Int(4)]).unwrap();
        assert!(!call("try_send", &[ch.clone(), Value::Int(5)]).unwrap().truth());
        assert_eq!(call("recv", &[ch.clone()]).unwrap().to_string(), "(4, True)");
        call("close", &[ch.clone()]).unwrap();
        assert_eq!(call("recv", &[ch.clone()]).unwrap().to_string(), "(0, False)");
        let err = call("close", &[ch.clone()]).unwrap_err();
        assert_eq!(err.to_string(), "close of closed channel: already closed");
        let err = call("send", &[ch, Value::Int(1)]).unwrap_err();
        assert_eq!(err.to_string(), "send on closed channel");
    }

    #[test]
    fn test_nil_channel() {
        let nil = wrap(NativeValue::zero(&Type::chan_of(&Type::int()))).unwrap();
        let err = call("close", &[nil]).unwrap_err();
        assert_eq!(err.to_string(), "close of nil channel");
    }

    #[test]
    fn test_new_and_indirect() {
        let point = Type::define("main", "Point", &Type::struct_of(vec![Field::new("X", Type::int())]));
        let p = call("new", &[type_of(&point)]).unwrap();
        p.set_field("X", &Value::Int(2)).unwrap();
        let copy = call("indirect", &[p.clone()]).unwrap();
        p.set_field("X", &Value::Int(3)).unwrap();
        assert!(copy.attr("X").unwrap().unwrap().equals(&Value::Int(2)).unwrap());
        let nil = wrap(NativeValue::zero(&Type::pointer_to(&point))).unwrap();
        assert_eq!(call("indirect", &[nil]).unwrap_err().to_string(), "nil dereference");
    }

    #[test]
    fn test_slice() {
        let s = call("slice", &[int_slice(&[1, 2, 3, 4]), Value::Int(1), Value::Int(3)]).unwrap();
        assert_eq!(s.to_string(), "[2 3]");
        let sub = call("slice", &[Value::str("hello"), Value::Int(1), Value::Int(3)]).unwrap();
        assert!(sub.equals(&Value::str("el")).unwrap());
        let err = call("slice", &[int_slice(&[1]), Value::Int(0), Value::Int(5)]).unwrap_err();
        assert!(err.to_string().starts_with("slice bounds out of range"));
    }

    #[test]
    fn test_host_funcs() {
        let c = call("complex", &[Value::Int(1), Value::Float(-2.0)]).unwrap();
        assert_eq!(c.to_string(), "(1-2i)");
        let t = call("typeof", &[Value::Int(1)]).unwrap();
        assert!(t.equals(&ty("int")).unwrap());
        let err = call("panic", &[Value::str("boom")]).unwrap_err();
        assert_eq!(err.to_string(), "panic in host function panic: boom");
        assert_eq!(err.category(), ErrorCategory::HostFault);
    }

    #[test]
    fn test_predeclared_types_construct() {
        let t = Thread::new("test");
        let v = ty("uint8").call(&t, &[Value::Int(255)], &[]).unwrap();
        assert!(v.equals(&Value::Int(255)).unwrap());
        assert!(ty("byte").equals(&ty("uint8")).unwrap());
        assert!(ty("string").call(&t, &[], &[]).unwrap().equals(&Value::str("")).unwrap());
    }
}
