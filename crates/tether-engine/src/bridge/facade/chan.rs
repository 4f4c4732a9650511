//! Channel values. Send, receive and close are builtins.

use tether_sdk::NativeValue;

use super::{hash_native, host_type_name, same_type_equality};
use crate::bridge::error::BridgeResult;
use crate::value::{CompareOp, ScriptObject, Value};

/// A channel. Copies share the queue; equality is identity.
#[derive(Debug, Clone)]
pub struct ChanFacade(pub(crate) NativeValue);

impl ScriptObject for ChanFacade {
    fn type_name(&self) -> String {
        host_type_name(&self.0)
    }

    fn to_text(&self) -> String {
        self.0.to_string()
    }

    fn truth(&self) -> bool {
        self.0.is_nil().is_ok_and(|nil| !nil)
    }

    fn hash(&self) -> BridgeResult<u64> {
        hash_native(&self.0)
    }

    fn native(&self) -> Option<&NativeValue> {
        Some(&self.0)
    }

    /// Values buffered and not yet received
    fn len(&self) -> BridgeResult<usize> {
        Ok(self.0.len()?)
    }

    fn compare(&self, op: CompareOp, other: &Value) -> BridgeResult<bool> {
        same_type_equality(&self.0, op, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::wrap::wrap;
    use tether_sdk::Type;

    #[test]
    fn test_len_and_identity() {
        let t = Type::chan_of(&Type::int());
        let ch = NativeValue::make_chan(&t, 2).unwrap();
        ch.chan_send(&NativeValue::from(1i64)).unwrap();
        let a = wrap(ch.clone()).unwrap();
        assert_eq!(a.len().unwrap(), 1);
        assert!(a.truth());
        assert!(a.equals(&wrap(ch).unwrap()).unwrap());
        let other = wrap(NativeValue::make_chan(&t, 0).unwrap()).unwrap();
        assert!(!a.equals(&other).unwrap());
        assert_eq!(a.hash().unwrap(), a.clone().hash().unwrap());
    }

    #[test]
    fn test_nil_channel() {
        let nil = wrap(NativeValue::zero(&Type::chan_of(&Type::int()))).unwrap();
        assert!(!nil.truth());
        assert_eq!(nil.len().unwrap(), 0);
        assert_eq!(nil.type_name(), "host.chan<chan int>");
    }
}
