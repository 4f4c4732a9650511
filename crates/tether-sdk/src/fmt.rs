//! Default text formatting of host values
//!
//! Mirrors the host's `%v` verb: values with an `Error() string` or
//! `String() string` method format through it, pointers to aggregates print
//! as `&{..}`, maps print with sorted keys.

use std::fmt;

use crate::func::Receiver;
use crate::kind::Kind;
use crate::types::{Shape, Type};
use crate::value::{Data, NativeValue};

/// Format a float the way the host prints `%v`: shortest representation,
/// exponent form for very large and very small magnitudes
pub fn format_float(v: f64, float32: bool) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    let abs = v.abs();
    if abs != 0.0 && !(1e-4..1e21).contains(&abs) {
        let s = if float32 {
            format!("{:e}", v as f32)
        } else {
            format!("{:e}", v)
        };
        return match s.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(d) => ('-', d),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => s,
        };
    }
    if float32 {
        format!("{}", v as f32)
    } else {
        format!("{}", v)
    }
}

fn format_complex(re: f64, im: f64, float32: bool) -> String {
    let im_text = format_float(im, float32);
    let sign = if im_text.starts_with('-') || im_text.starts_with('+') {
        ""
    } else {
        "+"
    };
    format!("({}{}{}i)", format_float(re, float32), sign, im_text)
}

/// Result of a `String()`/`Error()` method, if the type has one
fn stringer(ty: &Type, data: &Data) -> Option<String> {
    if !ty.is_named() && ty.kind() != Kind::Pointer {
        return None;
    }
    let want = Type::func_of(vec![], vec![Type::string()], false);
    let set = ty.method_set();
    let method = ["Error", "String"]
        .iter()
        .find_map(|name| set.iter().find(|m| m.name() == *name && *m.signature() == want))?;
    let mut recv = NativeValue::new(ty.clone(), data.clone());
    if ty.kind() == Kind::Pointer && method.receiver() == Receiver::Value {
        recv = recv.elem().and_then(|v| v.detach()).ok()?;
    }
    let out = method.invoke(&recv, &[]).ok()?;
    out.first()?.as_str().ok().map(|s| s.to_string())
}

fn write_seq(out: &mut String, elem: &Type, items: &[Data]) {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_value(out, elem, item, false);
    }
    out.push(']');
}

fn write_value(out: &mut String, ty: &Type, data: &Data, top: bool) {
    if let Some(s) = stringer(ty, data) {
        out.push_str(&s);
        return;
    }
    match data {
        Data::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Data::Int(i) => out.push_str(&i.to_string()),
        Data::Uint(u) => out.push_str(&u.to_string()),
        Data::Float(f) => out.push_str(&format_float(*f, ty.kind() == Kind::Float32)),
        Data::Complex(re, im) => {
            out.push_str(&format_complex(*re, *im, ty.kind() == Kind::Complex64))
        }
        Data::Str(s) => out.push_str(s),
        Data::Pointer(None)
        | Data::Chan(None)
        | Data::Func(None)
        | Data::Interface(None)
        | Data::Descriptor(None) => out.push_str("<nil>"),
        Data::Pointer(Some(place)) => {
            let elem = ty.elem();
            let aggregate = elem
                .as_ref()
                .is_some_and(|e| matches!(e.kind(), Kind::Struct | Kind::Array | Kind::Slice | Kind::Map));
            match (top && aggregate, elem, place.read()) {
                (true, Some(elem), Ok(pointee)) => {
                    out.push('&');
                    write_value(out, &elem, &pointee, false);
                }
                _ => out.push_str(&format!("{:#x}", place.address())),
            }
        }
        Data::Array(items) => match ty.elem() {
            Some(elem) => write_seq(out, &elem, items),
            None => out.push_str("[?]"),
        },
        Data::Slice(None) => out.push_str("[]"),
        Data::Slice(Some(slice)) => match (ty.elem(), slice.items()) {
            (Some(elem), Ok(items)) => write_seq(out, &elem, &items),
            _ => out.push_str("[?]"),
        },
        Data::Struct(items) => {
            out.push('{');
            for (i, (item, field)) in items.iter().zip(ty.fields()).enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_value(out, &field.ty, item, false);
            }
            out.push('}');
        }
        Data::Map(map) => {
            let (key_ty, value_ty) = match ty.shape() {
                Shape::Map(k, v) => (k.clone(), v.clone()),
                _ => return out.push_str("map[?]"),
            };
            let mut entries: Vec<(String, String)> = map
                .as_ref()
                .map(|m| m.entries())
                .unwrap_or_default()
                .iter()
                .map(|(k, v)| {
                    let (mut ks, mut vs) = (String::new(), String::new());
                    write_value(&mut ks, &key_ty, k, false);
                    write_value(&mut vs, &value_ty, v, false);
                    (ks, vs)
                })
                .collect();
            entries.sort();
            out.push_str("map[");
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(k);
                out.push(':');
                out.push_str(v);
            }
            out.push(']');
        }
        Data::Chan(Some(ch)) => out.push_str(&format!("{:#x}", std::sync::Arc::as_ptr(ch) as usize)),
        Data::Func(Some(f)) => out.push_str(&format!("{:#x}", std::sync::Arc::as_ptr(f) as usize)),
        Data::Interface(Some(inner)) => match inner.data() {
            Ok(d) => write_value(out, inner.ty(), &d, top),
            Err(_) => out.push_str("<?>"),
        },
        Data::UnsafePointer(addr) => out.push_str(&format!("{:#x}", addr)),
        Data::Descriptor(Some(t)) => out.push_str(&t.to_string()),
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data().map_err(|_| fmt::Error)?;
        let mut out = String::new();
        write_value(&mut out, self.ty(), &data, true);
        f.write_str(&out)
    }
}
