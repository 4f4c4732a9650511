//! Script values
//!
//! The evaluator of the embedded language sees every value as a [`Value`].
//! Primitives are plain variants; everything that comes from the host is a
//! [`Facade`] exposing the [`ScriptObject`] capability set.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;
use tether_sdk::NativeValue;

use crate::bridge::builtins::Builtin;
use crate::bridge::copy_policy::AccessMode;
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::facade::Facade;
use crate::bridge::package::Package;
use crate::bridge::resolve;
use crate::bridge::thread::Thread;

// ============================================================================
// Operators
// ============================================================================

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// Operator text
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Whether this is `==` or `!=`
    pub fn is_equality(self) -> bool {
        matches!(self, CompareOp::Eq | CompareOp::Ne)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `+x`
    Plus,
    /// `-x`
    Minus,
    /// `~x`
    Invert,
}

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `//`
    FloorDiv,
    /// `%`
    Rem,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
}

/// Which operand of a binary operator the receiver is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Receiver is the left operand
    Left,
    /// Receiver is the right operand
    Right,
}

// ============================================================================
// Capability interface
// ============================================================================

/// Forward-only iteration over a snapshot taken at creation
#[derive(Debug)]
pub struct ValueIter {
    items: std::vec::IntoIter<Value>,
}

impl ValueIter {
    /// Iterate over `items`
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

/// Capabilities of non-primitive script values.
///
/// Every operation has a default that reports the operation as unsupported,
/// so each implementor only spells out what its kind supports.
pub trait ScriptObject: fmt::Debug {
    /// Script-visible type name, stable for the value's lifetime
    fn type_name(&self) -> String;

    /// Text form used by `str()` and printing
    fn to_text(&self) -> String;

    /// Truthiness
    fn truth(&self) -> bool {
        true
    }

    /// Hash for use as a dict key
    fn hash(&self) -> BridgeResult<u64> {
        Err(BridgeError::Unhashable(self.type_name()))
    }

    /// The host value behind this object, if any
    fn native(&self) -> Option<&NativeValue> {
        None
    }

    /// `x.name`; `Ok(None)` if there is no such member
    fn attr(&self, name: &str, mode: AccessMode) -> BridgeResult<Option<Value>> {
        match self.native() {
            Some(v) => resolve::resolve_attr(v, name, mode),
            None => Ok(None),
        }
    }

    /// Names visible through [`ScriptObject::attr`], sorted
    fn attr_names(&self) -> Vec<String> {
        self.native().map(resolve::attr_names).unwrap_or_default()
    }

    /// `x.name = value`
    fn set_field(&self, name: &str, _value: &Value) -> BridgeResult<()> {
        Err(BridgeError::NoSuchField {
            ty: self.type_name(),
            field: name.to_string(),
        })
    }

    /// `x[index]`
    fn index(&self, _index: &Value, _mode: AccessMode) -> BridgeResult<Value> {
        Err(BridgeError::unsupported("indexing", self.type_name()))
    }

    /// `x[index] = value`
    fn set_index(&self, _index: &Value, _value: &Value) -> BridgeResult<()> {
        Err(BridgeError::unsupported("index assignment", self.type_name()))
    }

    /// `x[key]` on mappings
    fn get_key(&self, _key: &Value) -> BridgeResult<Value> {
        Err(BridgeError::unsupported("key lookup", self.type_name()))
    }

    /// `x[key] = value` on mappings
    fn set_key(&self, _key: &Value, _value: &Value) -> BridgeResult<()> {
        Err(BridgeError::unsupported("key assignment", self.type_name()))
    }

    /// `len(x)`
    fn len(&self) -> BridgeResult<usize> {
        Err(BridgeError::unsupported("len", self.type_name()))
    }

    /// `for v in x`
    fn iterate(&self) -> BridgeResult<ValueIter> {
        Err(BridgeError::unsupported("iteration", self.type_name()))
    }

    /// `x(args..., name=kw...)`
    fn call(
        &self,
        _thread: &Thread,
        _args: &[Value],
        _kwargs: &[(String, Value)],
    ) -> BridgeResult<Value> {
        Err(BridgeError::unsupported("call", self.type_name()))
    }

    /// `x op other` where `other` is also a host object
    fn compare(&self, op: CompareOp, other: &Value) -> BridgeResult<bool> {
        Err(BridgeError::Comparison {
            op: op.symbol(),
            left: self.type_name(),
            right: other.type_name(),
        })
    }

    /// `op x`; `Ok(None)` when the operator yields no result
    fn unary(&self, _op: UnaryOp) -> BridgeResult<Option<Value>> {
        Ok(None)
    }

    /// `x op other` or `other op x`; `Ok(None)` when undefined
    fn binary(&self, _op: BinaryOp, _other: &Value, _side: Side) -> BridgeResult<Option<Value>> {
        Ok(None)
    }
}

// ============================================================================
// Value
// ============================================================================

/// A script value
#[derive(Debug, Clone)]
pub enum Value {
    /// `None`
    None,
    /// Boolean
    Bool(bool),
    /// Integer, wide enough for every host integer kind
    Int(i128),
    /// Float
    Float(f64),
    /// String
    Str(Arc<str>),
    /// Tuple, used for multiple results
    Tuple(Vec<Value>),
    /// Host value
    Host(Facade),
    /// Group of named members
    Package(Arc<Package>),
    /// Builtin function
    Builtin(Arc<Builtin>),
}

impl Value {
    /// A string value
    pub fn str(s: impl AsRef<str>) -> Value {
        Value::Str(Arc::from(s.as_ref()))
    }

    /// Capability view of non-primitive values
    pub fn object(&self) -> Option<&dyn ScriptObject> {
        match self {
            Value::Host(f) => Some(f),
            Value::Package(p) => Some(p.as_ref()),
            Value::Builtin(b) => Some(b.as_ref()),
            _ => None,
        }
    }

    /// Host value behind a host facade
    pub fn native(&self) -> Option<&NativeValue> {
        self.object().and_then(|o| o.native())
    }

    /// Script-visible type name
    pub fn type_name(&self) -> String {
        match self {
            Value::None => "NoneType".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "string".to_string(),
            Value::Tuple(_) => "tuple".to_string(),
            _ => self.object().map(|o| o.type_name()).unwrap_or_default(),
        }
    }

    /// Truthiness
    pub fn truth(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            _ => self.object().is_none_or(|o| o.truth()),
        }
    }

    /// Hash for use as a dict key
    pub fn hash(&self) -> BridgeResult<u64> {
        let mut h = FxHasher::default();
        match self {
            Value::None => 0u8.hash(&mut h),
            Value::Bool(b) => b.hash(&mut h),
            Value::Int(i) => i.hash(&mut h),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => (*f as i128).hash(&mut h),
            Value::Float(f) => f.to_bits().hash(&mut h),
            Value::Str(s) => s.hash(&mut h),
            Value::Tuple(items) => {
                for item in items {
                    item.hash()?.hash(&mut h);
                }
            }
            _ => {
                return match self.object() {
                    Some(o) => o.hash(),
                    None => Err(BridgeError::Unhashable(self.type_name())),
                }
            }
        }
        Ok(h.finish())
    }

    /// `self op other`
    pub fn compare(&self, op: CompareOp, other: &Value) -> BridgeResult<bool> {
        use std::cmp::Ordering;

        let ordering = match (self, other) {
            (Value::Host(a), Value::Host(_)) => return a.compare(op, other),
            (Value::None, Value::None) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Package(a), Value::Package(b)) if op.is_equality() => {
                return Ok(Arc::ptr_eq(a, b) == (op == CompareOp::Eq))
            }
            (Value::Builtin(a), Value::Builtin(b)) if op.is_equality() => {
                return Ok(Arc::ptr_eq(a, b) == (op == CompareOp::Eq))
            }
            (Value::Tuple(a), Value::Tuple(b)) if op.is_equality() => {
                let mut same = a.len() == b.len();
                for (x, y) in a.iter().zip(b) {
                    if !same {
                        break;
                    }
                    same = x.compare(CompareOp::Eq, y)?;
                }
                return Ok(same == (op == CompareOp::Eq));
            }
            _ if op.is_equality() => return Ok(op == CompareOp::Ne),
            _ => {
                return Err(BridgeError::Comparison {
                    op: op.symbol(),
                    left: self.type_name(),
                    right: other.type_name(),
                })
            }
        };
        Ok(match (op, ordering) {
            (CompareOp::Eq, o) => o == Some(Ordering::Equal),
            (CompareOp::Ne, o) => o != Some(Ordering::Equal),
            (CompareOp::Lt, o) => o == Some(Ordering::Less),
            (CompareOp::Le, o) => matches!(o, Some(Ordering::Less | Ordering::Equal)),
            (CompareOp::Gt, o) => o == Some(Ordering::Greater),
            (CompareOp::Ge, o) => matches!(o, Some(Ordering::Greater | Ordering::Equal)),
        })
    }

    /// `self == other`
    pub fn equals(&self, other: &Value) -> BridgeResult<bool> {
        self.compare(CompareOp::Eq, other)
    }

    /// `x.name` in a plain read
    pub fn attr(&self, name: &str) -> BridgeResult<Option<Value>> {
        self.attr_with(name, AccessMode::Copy)
    }

    /// `x.name` as the base of an assignment
    pub fn attr_alias(&self, name: &str) -> BridgeResult<Option<Value>> {
        self.attr_with(name, AccessMode::Alias)
    }

    fn attr_with(&self, name: &str, mode: AccessMode) -> BridgeResult<Option<Value>> {
        match self.object() {
            Some(o) => o.attr(name, mode),
            None => Ok(None),
        }
    }

    /// Member names, sorted
    pub fn attr_names(&self) -> Vec<String> {
        self.object().map(|o| o.attr_names()).unwrap_or_default()
    }

    /// `x.name = value`
    pub fn set_field(&self, name: &str, value: &Value) -> BridgeResult<()> {
        match self.object() {
            Some(o) => o.set_field(name, value),
            None => Err(BridgeError::unsupported("field assignment", self.type_name())),
        }
    }

    /// `x[index]` in a plain read
    pub fn index(&self, index: &Value) -> BridgeResult<Value> {
        self.index_with(index, AccessMode::Copy)
    }

    /// `x[index]` as the base of an assignment
    pub fn index_alias(&self, index: &Value) -> BridgeResult<Value> {
        self.index_with(index, AccessMode::Alias)
    }

    fn index_with(&self, index: &Value, mode: AccessMode) -> BridgeResult<Value> {
        match self {
            Value::Tuple(items) => {
                let i = crate::bridge::facade::index_arg(index, items.len())?;
                Ok(items[i].clone())
            }
            _ => match self.object() {
                Some(o) => o.index(index, mode),
                None => Err(BridgeError::unsupported("indexing", self.type_name())),
            },
        }
    }

    /// `x[index] = value`
    pub fn set_index(&self, index: &Value, value: &Value) -> BridgeResult<()> {
        match self.object() {
            Some(o) => o.set_index(index, value),
            None => Err(BridgeError::unsupported("index assignment", self.type_name())),
        }
    }

    /// `m[key]`
    pub fn get_key(&self, key: &Value) -> BridgeResult<Value> {
        match self.object() {
            Some(o) => o.get_key(key),
            None => Err(BridgeError::unsupported("key lookup", self.type_name())),
        }
    }

    /// `m[key] = value`
    pub fn set_key(&self, key: &Value, value: &Value) -> BridgeResult<()> {
        match self.object() {
            Some(o) => o.set_key(key, value),
            None => Err(BridgeError::unsupported("key assignment", self.type_name())),
        }
    }

    /// `len(x)`
    pub fn len(&self) -> BridgeResult<usize> {
        match self {
            Value::Str(s) => Ok(s.len()),
            Value::Tuple(items) => Ok(items.len()),
            _ => match self.object() {
                Some(o) => o.len(),
                None => Err(BridgeError::unsupported("len", self.type_name())),
            },
        }
    }

    /// `for v in x`
    pub fn iterate(&self) -> BridgeResult<ValueIter> {
        match self {
            Value::Tuple(items) => Ok(ValueIter::new(items.clone())),
            _ => match self.object() {
                Some(o) => o.iterate(),
                None => Err(BridgeError::unsupported("iteration", self.type_name())),
            },
        }
    }

    /// `x(args...)`
    pub fn call(
        &self,
        thread: &Thread,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> BridgeResult<Value> {
        match self.object() {
            Some(o) => o.call(thread, args, kwargs),
            None => Err(BridgeError::unsupported("call", self.type_name())),
        }
    }

    /// `op x`
    pub fn unary(&self, op: UnaryOp) -> BridgeResult<Option<Value>> {
        match (self, op) {
            (Value::Int(i), UnaryOp::Plus) => Ok(Some(Value::Int(*i))),
            (Value::Int(i), UnaryOp::Minus) => Ok(i.checked_neg().map(Value::Int)),
            (Value::Int(i), UnaryOp::Invert) => Ok(Some(Value::Int(!*i))),
            (Value::Float(f), UnaryOp::Plus) => Ok(Some(Value::Float(*f))),
            (Value::Float(f), UnaryOp::Minus) => Ok(Some(Value::Float(-*f))),
            _ => match self.object() {
                Some(o) => o.unary(op),
                None => Ok(None),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => f.write_str(&tether_sdk::fmt::format_float(*x, false)),
            Value::Str(s) => f.write_str(s),
            Value::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match item {
                        Value::Str(s) => write!(f, "{:?}", s)?,
                        other => write!(f, "{}", other)?,
                    }
                }
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            _ => match self.object() {
                Some(o) => f.write_str(&o.to_text()),
                None => Ok(()),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i as i128)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}
