//! Example host API shared by the integration tests
//!
//! A small geometry package: `Point` with a value method `Sum` and a
//! pointer method `Scale`, `Celsius` with a `String` method, and `Box`,
//! which embeds `Point` and holds a label, tags and an array of corners.

#![allow(dead_code)]

use std::sync::Arc;

use once_cell::sync::Lazy;
use tether_engine::sdk::{
    Field, FromNative, HostError, MethodDef, NativeFunc, NativeValue, Receiver, Type,
};
use tether_engine::{type_of, value_of, Package, Thread, Value};

pub static POINT: Lazy<Type> = Lazy::new(|| {
    let t = Type::define(
        "example.com/geo",
        "Point",
        &Type::struct_of(vec![Field::new("X", Type::int()), Field::new("Y", Type::int())]),
    );
    t.add_method(MethodDef::new("Sum", Receiver::Value, vec![], vec![Type::int()], |recv, _| {
        let x = i64::from_native(&recv.field(0)?)?;
        let y = i64::from_native(&recv.field(1)?)?;
        Ok(vec![NativeValue::from(x + y)])
    }))
    .ok();
    t.add_method(MethodDef::new("Scale", Receiver::Pointer, vec![Type::int()], vec![], |recv, args| {
        let k = i64::from_native(&args[0])?;
        let p = recv.elem()?;
        for i in 0..2 {
            let f = p.field(i)?;
            f.set(&NativeValue::from(i64::from_native(&f)? * k))?;
        }
        Ok(vec![])
    }))
    .ok();
    t
});

pub static CELSIUS: Lazy<Type> = Lazy::new(|| {
    let t = Type::define("example.com/geo", "Celsius", &Type::float64());
    t.add_method(MethodDef::new("String", Receiver::Value, vec![], vec![Type::string()], |recv, _| {
        Ok(vec![NativeValue::from(format!("{}°C", recv.as_float()?))])
    }))
    .ok();
    t
});

pub static BOX: Lazy<Type> = Lazy::new(|| {
    Type::define(
        "example.com/geo",
        "Box",
        &Type::struct_of(vec![
            Field::embedded(POINT.clone()),
            Field::new("Label", Type::string()),
            Field::new("Tags", Type::slice_of(&Type::string())),
            Field::new("Corners", Type::array_of(2, &POINT)),
            Field::new("secret", Type::int()),
        ]),
    )
});

/// A detached `Point{x, y}`
pub fn point(x: i64, y: i64) -> NativeValue {
    let p = NativeValue::alloc(&POINT);
    p.field(0).and_then(|f| f.set(&NativeValue::from(x))).ok();
    p.field(1).and_then(|f| f.set(&NativeValue::from(y))).ok();
    p.detach().unwrap_or_else(|_| NativeValue::zero(&POINT))
}

fn funcs() -> Vec<NativeFunc> {
    vec![
        NativeFunc::with_signature("geo.Add", vec![Type::int(), Type::int()], vec![Type::int()], false, |args| {
            Ok(vec![NativeValue::from(i64::from_native(&args[0])? + i64::from_native(&args[1])?)])
        }),
        NativeFunc::with_signature(
            "geo.Total",
            vec![Type::slice_of(&Type::int())],
            vec![Type::int()],
            true,
            |args| {
                let mut total = 0i64;
                for i in 0..args[0].len()? {
                    total += i64::from_native(&args[0].index(i)?)?;
                }
                Ok(vec![NativeValue::from(total)])
            },
        ),
        NativeFunc::with_signature("geo.Origin", vec![], vec![POINT.clone()], false, |_| {
            Ok(vec![point(0, 0)])
        }),
        NativeFunc::with_signature("geo.Explode", vec![], vec![], false, |_| {
            panic!("boom")
        }),
        NativeFunc::with_signature("geo.Refuse", vec![Type::string()], vec![], false, |args| {
            Err(HostError::Abort(format!("refused {}", args[0])))
        }),
    ]
}

/// The `geo` package as a script sees it
pub fn geo() -> Value {
    let mut pkg = Package::new("example.com/geo");
    pkg.insert("Point", type_of(&POINT));
    pkg.insert("Celsius", type_of(&CELSIUS));
    pkg.insert("Box", type_of(&BOX));
    for f in funcs() {
        let name = f.name().trim_start_matches("geo.").to_string();
        if let Ok(v) = value_of(f.into_value()) {
            pkg.insert(name, v);
        }
    }
    Value::Package(Arc::new(pkg))
}

/// `geo.<name>`
pub fn member(name: &str) -> Value {
    geo().attr(name).unwrap().unwrap()
}

/// `v.<name>(args...)`
pub fn call_method(thread: &Thread, v: &Value, name: &str, args: &[Value]) -> Value {
    v.attr(name).unwrap().unwrap().call(thread, args, &[]).unwrap()
}

/// Integer contents of a script value
pub fn int(v: &Value) -> i128 {
    match v {
        Value::Int(i) => *i,
        other => panic!("expected int, got {}", other.type_name()),
    }
}

/// Route bridge logs to the test harness; filter with `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
