//! Host functions and bound methods

use tether_sdk::{NativeValue, Signature};

use super::host_type_name;
use crate::bridge::convert::convert;
use crate::bridge::copy_policy::{surface, AccessMode};
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::thread::Thread;
use crate::bridge::trap;
use crate::value::{ScriptObject, Value};

/// A host function value
#[derive(Debug, Clone)]
pub struct FuncFacade(pub(crate) NativeValue);

impl FuncFacade {
    /// Name used in error messages: the function's own name, or its type
    /// when nil
    pub fn name(&self) -> String {
        match self.0.as_func() {
            Ok(Some(f)) => f.name().to_string(),
            _ => self.0.ty().to_string(),
        }
    }
}

/// Convert script arguments to the parameter types of `sig`, packing the
/// trailing arguments of a variadic call into a slice
fn convert_args(func: &str, sig: &Signature, args: &[Value]) -> BridgeResult<Vec<NativeValue>> {
    let params = &sig.params;
    let fixed = if sig.variadic { params.len() - 1 } else { params.len() };

    let arity_ok = if sig.variadic {
        args.len() >= fixed
    } else {
        args.len() == fixed
    };
    if !arity_ok {
        let want = if sig.variadic {
            format!("at least {}", fixed)
        } else {
            fixed.to_string()
        };
        return Err(BridgeError::Arity {
            func: func.to_string(),
            got: args.len(),
            want,
        });
    }

    let mut out = Vec::with_capacity(params.len());
    for (i, (arg, param)) in args.iter().zip(params.iter()).take(fixed).enumerate() {
        out.push(convert(arg, param).map_err(|e| e.in_argument(i + 1, func))?);
    }

    if sig.variadic {
        let slice_ty = &params[fixed];
        let elem = slice_ty.elem().ok_or_else(|| {
            BridgeError::Invariant(format!("variadic parameter of {} is not a slice", func))
        })?;
        let rest = args[fixed..]
            .iter()
            .enumerate()
            .map(|(i, arg)| convert(arg, &elem).map_err(|e| e.in_argument(fixed + i + 1, func)))
            .collect::<BridgeResult<Vec<_>>>()?;
        out.push(NativeValue::slice_from(slice_ty, &rest)?);
    }
    Ok(out)
}

impl ScriptObject for FuncFacade {
    fn type_name(&self) -> String {
        host_type_name(&self.0)
    }

    fn to_text(&self) -> String {
        match self.0.as_func() {
            Ok(Some(f)) => format!("<host function {}>", f.name()),
            _ => self.0.to_string(),
        }
    }

    fn truth(&self) -> bool {
        self.0.is_nil().is_ok_and(|nil| !nil)
    }

    fn native(&self) -> Option<&NativeValue> {
        Some(&self.0)
    }

    fn call(
        &self,
        thread: &Thread,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> BridgeResult<Value> {
        let name = self.name();
        if !kwargs.is_empty() {
            return Err(BridgeError::NamedArguments(name));
        }
        let Some(func) = self.0.as_func()? else {
            return Err(BridgeError::NilFunction);
        };
        let sig = func.signature().ok_or_else(|| {
            BridgeError::Invariant(format!("function {} has no signature", name))
        })?;
        let host_args = convert_args(&name, sig, args)?;

        let results = trap::call_host(thread, &name, || func.invoke(&host_args))?;
        let mut results = results.into_iter();
        match (results.next(), results.len()) {
            (None, _) => Ok(Value::None),
            (Some(only), 0) => surface(only, AccessMode::Copy),
            (Some(first), _) => {
                let mut items = vec![surface(first, AccessMode::Copy)?];
                for r in results {
                    items.push(surface(r, AccessMode::Copy)?);
                }
                Ok(Value::Tuple(items))
            }
        }
    }
}
