//! Script value → host value of a target type
//!
//! Rules, in order:
//! 1. A wrapped host value converts by host rules (identity, assignability,
//!    numeric and text conversions, interface boxing).
//! 2. A type descriptor converts to the descriptor type as itself.
//! 3. `None` converts to the zero value of nilable kinds, and nothing else.
//! 4. Script primitives convert by target kind: bool by truthiness,
//!    integers and floats when representable, strings from strings, and the
//!    empty interface boxes bool, int, float and string. Every other target
//!    is unsupported.

use std::sync::Arc;

use tether_sdk::{Data, Kind, NativeValue, Type};

use crate::bridge::error::{BridgeError, BridgeResult};
use crate::value::Value;

fn rejected(value: &Value, to: &Type) -> BridgeError {
    BridgeError::Conversion {
        from: value.type_name(),
        to: to.to_string(),
    }
}

/// Convert `value` to a detached host value of type `to`
pub fn convert(value: &Value, to: &Type) -> BridgeResult<NativeValue> {
    let result = convert_inner(value, to);
    match &result {
        Ok(_) => tracing::trace!(from = %value.type_name(), %to, "converted"),
        Err(e) => tracing::trace!(from = %value.type_name(), %to, error = %e, "conversion rejected"),
    }
    result
}

fn convert_inner(value: &Value, to: &Type) -> BridgeResult<NativeValue> {
    if let Some(native) = value.native() {
        if native.ty() == to {
            return Ok(native.detach()?);
        }
        if native.ty().convertible_to(to) {
            return Ok(native.convert(to)?);
        }
        return Err(rejected(value, to));
    }

    let kind = to.kind();
    if let Value::None = value {
        if kind.is_nilable() {
            return Ok(NativeValue::zero(to));
        }
        return Err(rejected(value, to));
    }

    let data = match kind {
        Kind::Bool => Some(Data::Bool(value.truth())),
        k if k.is_integer() => integer(value, k),
        k if k.is_float() => float(value, k),
        Kind::String => match value {
            Value::Str(s) => Some(Data::Str(Arc::clone(s))),
            _ => None,
        },
        Kind::Interface if to.interface_methods().is_empty() => {
            let boxed = match value {
                Value::Bool(b) => Some(NativeValue::from(*b)),
                Value::Int(i) => i64::try_from(*i).ok().map(NativeValue::from),
                Value::Float(f) => Some(NativeValue::from(*f)),
                Value::Str(s) => Some(NativeValue::from(Arc::clone(s))),
                _ => None,
            };
            boxed.map(|b| Data::Interface(Some(Box::new(b))))
        }
        _ => None,
    };
    data.map(|d| NativeValue::new(to.clone(), d))
        .ok_or_else(|| rejected(value, to))
}

fn integer(value: &Value, kind: Kind) -> Option<Data> {
    let wide = match value {
        Value::Int(i) => *i,
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => {
            if f.abs() >= 2f64.powi(127) {
                return None;
            }
            *f as i128
        }
        _ => return None,
    };
    let (lo, hi) = kind.int_bounds()?;
    if wide < lo || wide > hi {
        return None;
    }
    if kind.is_signed() {
        i64::try_from(wide).ok().map(Data::Int)
    } else {
        u64::try_from(wide).ok().map(Data::Uint)
    }
}

fn float(value: &Value, kind: Kind) -> Option<Data> {
    let f = match value {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => return None,
    };
    if kind == Kind::Float32 {
        if f.is_finite() && f.abs() > f32::MAX as f64 {
            return None;
        }
        return Some(Data::Float(f as f32 as f64));
    }
    Some(Data::Float(f))
}
