//! Conversion Engine Tests
//!
//! Script values flowing into host parameters, fields, elements and map
//! entries, and the error categories of rejected conversions.
//!
//! # Running Tests
//! ```bash
//! cargo test --test conversion_tests
//! ```

mod common;

use common::{member, point, BOX, POINT};
use tether_engine::sdk::{NativeValue, Type};
use tether_engine::{convert, value_of, ErrorCategory, Thread, Value, Variable};

// ===== Primitive Targets =====

#[test]
fn test_integer_targets_check_range() {
    for (ty, ok, bad) in [
        (Type::int8(), 127, 128),
        (Type::uint8(), 255, 256),
        (Type::int16(), -32768, -32769),
        (Type::uint32(), 4_294_967_295, -1),
    ] {
        assert!(convert(&Value::Int(ok), &ty).is_ok(), "{} should accept {}", ty, ok);
        let err = convert(&Value::Int(bad), &ty).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Conversion);
    }
    assert!(convert(&Value::Int(u64::MAX as i128), &Type::uint64()).is_ok());
    assert!(convert(&Value::Int(u64::MAX as i128 + 1), &Type::uint64()).is_err());
}

#[test]
fn test_float_targets() {
    let v = convert(&Value::Int(3), &Type::float64()).unwrap();
    assert_eq!(v.as_float().unwrap(), 3.0);
    assert!(convert(&Value::Float(f64::MAX), &Type::float32()).is_err());
    assert!(convert(&Value::Float(f64::INFINITY), &Type::float32()).is_ok());
    assert!(convert(&Value::str("1.0"), &Type::float64()).is_err());
}

#[test]
fn test_bool_and_string_targets() {
    assert!(convert(&Value::Int(2), &Type::bool()).unwrap().as_bool().unwrap());
    assert!(!convert(&Value::Tuple(vec![]), &Type::bool()).unwrap().as_bool().unwrap());
    assert!(convert(&Value::Int(65), &Type::string()).is_err());
    let err = convert(&Value::Bool(true), &Type::string()).unwrap_err();
    assert_eq!(err.to_string(), "cannot convert bool to host string");
}

#[test]
fn test_none_only_for_nilable_targets() {
    for ty in [
        Type::pointer_to(&POINT),
        Type::slice_of(&Type::int()),
        Type::chan_of(&Type::int()),
        Type::any(),
        Type::error(),
    ] {
        assert!(convert(&Value::None, &ty).unwrap().is_nil().unwrap());
    }
    assert!(convert(&Value::None, &Type::string()).is_err());
    assert!(convert(&Value::None, &POINT).is_err());
}

// ===== Host Values =====

#[test]
fn test_host_values_pass_through() {
    let p = value_of(point(1, 2)).unwrap();
    let back = convert(&p, &POINT).unwrap();
    assert!(!back.is_addressable());
    assert_eq!(back.to_string(), "{1 2}");
    assert!(convert(&p, &BOX).is_err());
}

#[test]
fn test_named_and_underlying_convert() {
    let thread = Thread::new("main");
    let c = member("Celsius").call(&thread, &[Value::Float(3.5)], &[]).unwrap();
    let f = convert(&c, &Type::float64()).unwrap();
    assert_eq!(f.as_float().unwrap(), 3.5);
    let i = convert(&c, &Type::int()).unwrap();
    assert_eq!(i.as_int().unwrap(), 3);
}

// ===== Conversion Sites =====

#[test]
fn test_argument_errors_name_the_position() {
    let thread = Thread::new("main");
    let err = member("Add")
        .call(&thread, &[Value::Int(1), Value::str("2")], &[])
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "in argument 2 of call to geo.Add, cannot convert string to host int"
    );
    assert_eq!(err.category(), ErrorCategory::Conversion);
    assert_eq!(thread.counters().calls(), 0);
}

#[test]
fn test_field_store_converts() {
    let b = Variable::new(&NativeValue::zero(&BOX)).unwrap();
    let target = b.target().unwrap();
    target.set_field("Label", &Value::str("home")).unwrap();
    let err = target.set_field("Label", &Value::Int(1)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conversion);
    let err = target.set_field("Missing", &Value::Int(1)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Mutation);
    assert!(b.load().unwrap().to_string().contains("home"));
}

#[test]
fn test_map_entries_convert() {
    let thread = Thread::new("main");
    let host = Value::Package(tether_engine::builtins::module().unwrap());
    let ty = host
        .attr("map_of")
        .unwrap()
        .unwrap()
        .call(&thread, &[host.attr("string").unwrap().unwrap(), host.attr("int").unwrap().unwrap()], &[])
        .unwrap();
    let m = host
        .attr("make_map")
        .unwrap()
        .unwrap()
        .call(&thread, &[ty], &[])
        .unwrap();
    m.set_key(&Value::str("a"), &Value::Int(1)).unwrap();
    m.set_key(&Value::str("a"), &Value::Int(2)).unwrap();
    assert_eq!(m.len().unwrap(), 1);
    assert_eq!(m.to_string(), "map[a:2]");
    let err = m.set_key(&Value::str("b"), &Value::Float(0.5)).unwrap_err();
    assert_eq!(err.to_string(), "invalid map element: cannot convert float to host int");
    let keys: Vec<Value> = m.iterate().unwrap().collect();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].equals(&Value::str("a")).unwrap());
}
