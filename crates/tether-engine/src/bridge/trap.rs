//! Host call boundary
//!
//! Every call from script code into host code goes through [`call_host`]:
//! it enforces the thread's depth limit and turns panics and aborts inside
//! the host into [`BridgeError::HostFault`].

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tether_sdk::{HostResult, NativeValue};

use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::thread::Thread;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run a host call on `thread`
pub(crate) fn call_host<F>(thread: &Thread, func: &str, f: F) -> BridgeResult<Vec<NativeValue>>
where
    F: FnOnce() -> HostResult<Vec<NativeValue>>,
{
    let guard = thread.enter()?;
    tracing::debug!(thread = thread.name(), func, depth = guard.depth(), "host call");

    let outcome = if thread.options().trap_host_faults {
        catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
    } else {
        Ok(f())
    };

    let message = match outcome {
        Ok(Ok(results)) => {
            tracing::debug!(func, results = results.len(), "host call returned");
            return Ok(results);
        }
        Ok(Err(e)) => e.to_string(),
        Err(message) => message,
    };

    thread.counters().record_fault();
    if thread.options().capture_backtraces {
        let backtrace = Backtrace::force_capture();
        tracing::warn!(func, %message, %backtrace, "host fault trapped");
    } else {
        tracing::warn!(func, %message, "host fault trapped");
    }
    Err(BridgeError::HostFault {
        func: func.to_string(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::error::ErrorCategory;
    use crate::bridge::thread::{BridgeOptions, CallLimits};
    use tether_sdk::HostError;

    #[test]
    fn test_returns_results() {
        let t = Thread::new("t");
        let out = call_host(&t, "f", || Ok(vec![NativeValue::from(1i64)])).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(t.counters().calls(), 1);
        assert_eq!(t.counters().depth(), 0);
    }

    #[test]
    fn test_panic_becomes_fault() {
        let t = Thread::new("t");
        let err = call_host(&t, "main.Boom", || panic!("boom")).unwrap_err();
        assert_eq!(err.to_string(), "panic in host function main.Boom: boom");
        assert_eq!(err.category(), ErrorCategory::HostFault);
        assert_eq!(t.counters().faults(), 1);
        assert_eq!(t.counters().depth(), 0);
    }

    #[test]
    fn test_abort_becomes_fault() {
        let t = Thread::new("t");
        let err = call_host(&t, "f", || Err(HostError::Abort("bad input".into()))).unwrap_err();
        assert!(matches!(err, BridgeError::HostFault { ref message, .. } if message == "bad input"));
    }

    #[test]
    fn test_depth_limit_applies() {
        let t = Thread::with_options(
            "t",
            BridgeOptions {
                limits: CallLimits::with_call_depth(0),
                ..Default::default()
            },
        );
        let err = call_host(&t, "f", || Ok(vec![])).unwrap_err();
        assert!(matches!(err, BridgeError::CallDepth(0)));
    }
}
