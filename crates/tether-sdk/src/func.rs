//! Host functions and methods
//!
//! Host code is registered as Rust closures. Arguments arrive already
//! converted to the declared parameter types; for variadic functions the
//! trailing arguments arrive packed into a single slice value.

use std::fmt;
use std::sync::Arc;

use crate::error::HostResult;
use crate::types::{is_exported, Signature, Type};
use crate::value::{Data, NativeValue};

/// Implementation of a host function
pub type HostFn = Arc<dyn Fn(&[NativeValue]) -> HostResult<Vec<NativeValue>> + Send + Sync>;

/// Implementation of a host method: receiver, then arguments
pub type MethodFn =
    Arc<dyn Fn(&NativeValue, &[NativeValue]) -> HostResult<Vec<NativeValue>> + Send + Sync>;

// ============================================================================
// Functions
// ============================================================================

/// A callable host function with a static signature
pub struct NativeFunc {
    name: String,
    ty: Type,
    imp: HostFn,
}

impl NativeFunc {
    /// Create a function of the given func type
    pub fn new<F>(name: impl Into<String>, ty: Type, imp: F) -> Self
    where
        F: Fn(&[NativeValue]) -> HostResult<Vec<NativeValue>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            ty,
            imp: Arc::new(imp),
        }
    }

    /// Create a function from parameter and result types
    pub fn with_signature<F>(
        name: impl Into<String>,
        params: Vec<Type>,
        results: Vec<Type>,
        variadic: bool,
        imp: F,
    ) -> Self
    where
        F: Fn(&[NativeValue]) -> HostResult<Vec<NativeValue>> + Send + Sync + 'static,
    {
        Self::new(name, Type::func_of(params, results, variadic), imp)
    }

    /// Fully qualified function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Func type of this function
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Parameter and result types
    pub fn signature(&self) -> Option<&Signature> {
        self.ty.signature()
    }

    /// Run the host implementation
    pub fn invoke(&self, args: &[NativeValue]) -> HostResult<Vec<NativeValue>> {
        (self.imp)(args)
    }

    /// Wrap into a detached value of the function's type
    pub fn into_value(self) -> NativeValue {
        let ty = self.ty.clone();
        NativeValue::new(ty, Data::Func(Some(Arc::new(self))))
    }
}

impl fmt::Debug for NativeFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunc")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish()
    }
}

// ============================================================================
// Methods
// ============================================================================

/// Receiver kind of a method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// Receives a copy of the value (`func (t T) M()`)
    Value,
    /// Receives a pointer to the variable (`func (t *T) M()`)
    Pointer,
}

/// A method declared on a defined type
pub struct MethodDef {
    name: String,
    receiver: Receiver,
    sig: Type,
    imp: MethodFn,
}

impl MethodDef {
    /// Create a non-variadic method
    pub fn new<F>(
        name: impl Into<String>,
        receiver: Receiver,
        params: Vec<Type>,
        results: Vec<Type>,
        imp: F,
    ) -> Self
    where
        F: Fn(&NativeValue, &[NativeValue]) -> HostResult<Vec<NativeValue>>
            + Send
            + Sync
            + 'static,
    {
        Self::with_signature(name, receiver, Type::func_of(params, results, false), imp)
    }

    /// Create a method with an explicit func type (receiver excluded)
    pub fn with_signature<F>(name: impl Into<String>, receiver: Receiver, sig: Type, imp: F) -> Self
    where
        F: Fn(&NativeValue, &[NativeValue]) -> HostResult<Vec<NativeValue>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            receiver,
            sig,
            imp: Arc::new(imp),
        }
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receiver kind
    pub fn receiver(&self) -> Receiver {
        self.receiver
    }

    /// Func type of the method, receiver excluded
    pub fn signature(&self) -> &Type {
        &self.sig
    }

    /// Whether the method is visible outside its package
    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }

    /// Call with an explicit receiver.
    ///
    /// `recv` is a `T` for value receivers and a `*T` for pointer receivers.
    pub fn invoke(&self, recv: &NativeValue, args: &[NativeValue]) -> HostResult<Vec<NativeValue>> {
        (self.imp)(recv, args)
    }

    /// Bind a receiver, producing a method value.
    ///
    /// `owner` is the type the method is declared on and only affects the
    /// function name.
    pub fn bind(self: &Arc<Self>, owner: &Type, recv: NativeValue) -> NativeFunc {
        let name = match self.receiver {
            Receiver::Value => format!("{}.{}", owner, self.name),
            Receiver::Pointer => format!("(*{}).{}", owner, self.name),
        };
        let method = Arc::clone(self);
        NativeFunc {
            name,
            ty: self.sig.clone(),
            imp: Arc::new(move |args: &[NativeValue]| method.invoke(&recv, args)),
        }
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("receiver", &self.receiver)
            .field("sig", &self.sig)
            .finish()
    }
}
