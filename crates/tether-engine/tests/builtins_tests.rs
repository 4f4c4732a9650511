//! Builtins Package Tests
//!
//! The `host` package as a script uses it: channels across OS threads,
//! slices built with `make_slice` and `append`, and type constructors.
//!
//! # Running Tests
//! ```bash
//! cargo test --test builtins_tests
//! ```

mod common;

use std::thread;

use common::{int, POINT};
use tether_engine::sdk::{NativeValue, Type};
use tether_engine::{builtins, type_of, value_of, ErrorCategory, Thread, Value};

fn host(name: &str) -> Value {
    Value::Package(builtins::module().unwrap())
        .attr(name)
        .unwrap()
        .unwrap()
}

fn call(name: &str, args: &[Value]) -> Value {
    host(name).call(&Thread::new("test"), args, &[]).unwrap()
}

// ===== Channels =====

#[test]
fn test_channel_between_threads() {
    let ch = NativeValue::make_chan(&Type::chan_of(&Type::int()), 0).unwrap();
    let producer_ch = ch.clone();
    let producer = thread::spawn(move || {
        let t = Thread::new("producer");
        let ch = value_of(producer_ch).unwrap();
        for i in 1..=3 {
            host("send").call(&t, &[ch.clone(), Value::Int(i)], &[]).unwrap();
        }
        host("close").call(&t, &[ch], &[]).unwrap();
    });

    let ch = value_of(ch).unwrap();
    let mut total = 0;
    loop {
        let Value::Tuple(items) = call("recv", &[ch.clone()]) else {
            panic!("recv returns a tuple");
        };
        if !items[1].truth() {
            break;
        }
        total += int(&items[0]);
    }
    producer.join().unwrap();
    assert_eq!(total, 6);
}

#[test]
fn test_channel_close_errors() {
    let ct = call("chan_of", &[host("string")]);
    let ch = call("make_chan", &[ct.clone(), Value::Int(1)]);
    call("close", &[ch.clone()]);
    let t = Thread::new("test");
    let err = host("close").call(&t, &[ch.clone()], &[]).unwrap_err();
    assert_eq!(err.to_string(), "close of closed channel: already closed");
    assert_eq!(err.category(), ErrorCategory::Mutation);

    let nil = ct.call(&t, &[], &[]).unwrap();
    let err = host("send").call(&t, &[nil, Value::str("x")], &[]).unwrap_err();
    assert_eq!(err.to_string(), "send on nil channel");
}

// ===== Slices =====

#[test]
fn test_make_and_append() {
    let st = call("slice_of", &[host("int")]);
    let s = call("make_slice", &[st, Value::Int(1), Value::Int(4)]);
    let grown = call("append", &[s.clone(), Value::Int(7), Value::Int(8)]);
    assert_eq!(grown.to_string(), "[0 7 8]");
    assert_eq!(int(&call("cap", &[grown.clone()])), 4);
    // Within capacity the backing array is shared
    grown.set_index(&Value::Int(0), &Value::Int(5)).unwrap();
    assert_eq!(s.to_string(), "[5]");
    let items: Vec<i128> = grown.iterate().unwrap().map(|v| int(&v)).collect();
    assert_eq!(items, vec![5, 7, 8]);
}

#[test]
fn test_oversized_sizes_are_errors() {
    let t = Thread::new("test");
    let huge = Value::Int(1 << 62);

    let st = call("slice_of", &[host("int")]);
    let err = host("make_slice").call(&t, &[st.clone(), huge.clone()], &[]).unwrap_err();
    assert_eq!(err.to_string(), "make_slice: cap 4611686018427387904 out of range");
    assert_eq!(err.category(), ErrorCategory::Conversion);
    let err = host("make_slice").call(&t, &[st, Value::Int(-1)], &[]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conversion);

    let ct = call("chan_of", &[host("int")]);
    let err = host("make_chan").call(&t, &[ct, huge.clone()], &[]).unwrap_err();
    assert_eq!(err.to_string(), "make_chan: cap 4611686018427387904 out of range");

    let err = host("array_of").call(&t, &[huge, host("int")], &[]).unwrap_err();
    assert_eq!(err.to_string(), "array length 4611686018427387904 out of range");
    let row = call("array_of", &[Value::Int(1 << 20), host("int")]);
    let err = host("array_of").call(&t, &[Value::Int(1 << 10), row], &[]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conversion);

    let small = call("array_of", &[Value::Int(3), host("int")]);
    assert_eq!(small.call(&t, &[], &[]).unwrap().to_string(), "[0 0 0]");
}

// ===== Types =====

#[test]
fn test_type_values() {
    let p = type_of(&POINT);
    let ptr_ty = call("ptr_to", &[p.clone()]);
    assert_eq!(ptr_ty.to_string(), "*geo.Point");
    let fresh = call("new", &[p.clone()]);
    assert!(call("typeof", &[fresh.clone()]).equals(&ptr_ty).unwrap());
    assert_eq!(call("indirect", &[fresh]).to_string(), "{0 0}");

    let name = p.attr("Name").unwrap().unwrap().call(&Thread::new("t"), &[], &[]).unwrap();
    assert!(name.equals(&Value::str("Point")).unwrap());
    assert!(p.hash().is_ok());
}
