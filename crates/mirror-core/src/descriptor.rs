//! Class descriptors: the runtime record of a registered type's
//! fields, methods and constructors.
//!
//! Descriptors are plain data plus type-erased callables. They are
//! built once (usually by a [`Reflect::describe`](crate::Reflect)
//! implementation using the builders in [`thunk`](crate::thunk)),
//! registered, and then only read.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::{CallError, TypeHash, TypeToken, Value};

/// Erased method invoker: optional receiver, tagged arguments, optional
/// tagged result. Static methods ignore the receiver slot.
pub type Invoker =
    Arc<dyn Fn(Option<&mut dyn Any>, &[Value]) -> Result<Option<Value>, CallError> + Send + Sync>;

/// Erased constructor invoker: tagged arguments to a fresh boxed
/// instance.
pub type ConstructorInvoker =
    Arc<dyn Fn(&[Value]) -> Result<Box<dyn Any>, CallError> + Send + Sync>;

/// Erased field read: receiver to a tagged copy of the field.
pub type FieldGet = Arc<dyn Fn(&dyn Any) -> Result<Value, CallError> + Send + Sync>;

/// Erased field write: receiver plus a tagged value to store.
pub type FieldSet = Arc<dyn Fn(&mut dyn Any, Value) -> Result<(), CallError> + Send + Sync>;

bitflags! {
    /// Qualifiers attached to a method descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodTraits: u8 {
        /// The method takes no receiver.
        const STATIC = 1 << 0;
        /// The method does not mutate its receiver.
        const CONST = 1 << 1;
    }
}

/// A reflected data member.
pub struct FieldDescriptor {
    pub name: &'static str,
    pub token: TypeToken,
    /// Size in bytes of the field's storage.
    pub size: usize,
    pub description: &'static str,
    /// Advisory editing range; `(0.0, 0.0)` when unspecified.
    pub min_value: f64,
    pub max_value: f64,
    get: FieldGet,
    set: FieldSet,
}

impl FieldDescriptor {
    pub fn new(
        name: &'static str,
        token: TypeToken,
        size: usize,
        description: &'static str,
        min_value: f64,
        max_value: f64,
        get: FieldGet,
        set: FieldSet,
    ) -> Self {
        FieldDescriptor {
            name,
            token,
            size,
            description,
            min_value,
            max_value,
            get,
            set,
        }
    }

    /// Read the field out of an instance as a tagged value.
    pub fn get(&self, instance: &dyn Any) -> Result<Value, CallError> {
        (self.get)(instance)
    }

    /// Store a tagged value into an instance's field.
    pub fn set(&self, instance: &mut dyn Any, value: Value) -> Result<(), CallError> {
        (self.set)(instance, value)
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("token", &self.token)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// A reflected method (instance or static).
pub struct MethodDescriptor {
    pub name: &'static str,
    pub doc: &'static str,
    /// Declared return token, `None` for void.
    pub return_type: Option<TypeToken>,
    pub arg_types: Vec<TypeToken>,
    pub traits: MethodTraits,
    /// Rendered as `Name(kind,kind,…)`, e.g. `"Add(u8)"`. Used for
    /// overload disambiguation.
    pub signature: String,
    invoker: Invoker,
}

impl MethodDescriptor {
    pub fn new(
        name: &'static str,
        doc: &'static str,
        return_type: Option<TypeToken>,
        arg_types: Vec<TypeToken>,
        traits: MethodTraits,
        invoker: Invoker,
    ) -> Self {
        let signature = render_signature(name, &arg_types);
        MethodDescriptor {
            name,
            doc,
            return_type,
            arg_types,
            traits,
            signature,
            invoker,
        }
    }

    pub fn arg_count(&self) -> usize {
        self.arg_types.len()
    }

    pub fn is_static(&self) -> bool {
        self.traits.contains(MethodTraits::STATIC)
    }

    /// Invoke through the erased thunk.
    ///
    /// Static methods ignore `instance`; instance methods fail with
    /// [`CallError::MissingReceiver`] when it is `None`. Arity and
    /// argument kinds are checked by the thunk itself.
    pub fn invoke(
        &self,
        instance: Option<&mut dyn Any>,
        args: &[Value],
    ) -> Result<Option<Value>, CallError> {
        let receiver = if self.is_static() { None } else { instance };
        (self.invoker)(receiver, args)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("signature", &self.signature)
            .field("traits", &self.traits)
            .finish_non_exhaustive()
    }
}

/// A reflected constructor.
pub struct ConstructorDescriptor {
    pub arg_types: Vec<TypeToken>,
    /// Rendered as `ClassName(kind,kind,…)`.
    pub signature: String,
    invoker: ConstructorInvoker,
}

impl ConstructorDescriptor {
    pub fn new(class_name: &'static str, arg_types: Vec<TypeToken>, invoker: ConstructorInvoker) -> Self {
        let signature = render_signature(class_name, &arg_types);
        ConstructorDescriptor {
            arg_types,
            signature,
            invoker,
        }
    }

    pub fn arg_count(&self) -> usize {
        self.arg_types.len()
    }

    /// Construct a fresh boxed instance.
    pub fn invoke(&self, args: &[Value]) -> Result<Box<dyn Any>, CallError> {
        (self.invoker)(args)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Render a member signature from its name and argument tokens.
pub fn render_signature(name: &str, arg_types: &[TypeToken]) -> String {
    let mut out = String::with_capacity(name.len() + 2 + arg_types.len() * 4);
    out.push_str(name);
    out.push('(');
    for (i, token) in arg_types.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(token.name);
    }
    out.push(')');
    out
}

/// The complete runtime description of a registered class.
#[derive(Debug)]
pub struct ClassDescriptor {
    pub name: &'static str,
    pub hash: TypeHash,
    pub fields: Vec<FieldDescriptor>,
    pub methods: Vec<MethodDescriptor>,
    pub constructors: Vec<ConstructorDescriptor>,
}

impl ClassDescriptor {
    /// Start an empty descriptor for `name`.
    pub fn new(name: &'static str) -> Self {
        ClassDescriptor {
            name,
            hash: TypeHash::from_name(name),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Find a field by name.
    pub fn find_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Find the first method with the given name, static or not.
    pub fn find_method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Find the first non-static method with the given name.
    ///
    /// Declaration order decides among same-name overloads; use
    /// [`find_method_with_signature`](Self::find_method_with_signature)
    /// to pick a specific one.
    pub fn find_instance_method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name && !m.is_static())
    }

    /// Find the first static method with the given name.
    pub fn find_static_method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name && m.is_static())
    }

    /// Find a method by exact rendered signature, e.g. `"Add(u8)"`.
    pub fn find_method_with_signature(&self, signature: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.signature == signature)
    }

    /// Find the first constructor taking `argc` arguments.
    pub fn find_constructor_by_arity(&self, argc: usize) -> Option<&ConstructorDescriptor> {
        self.constructors.iter().find(|c| c.arg_count() == argc)
    }

    /// Find a constructor by exact rendered signature, e.g.
    /// `"RGBColor(u8,u8,u8)"`.
    pub fn find_constructor_by_signature(&self, signature: &str) -> Option<&ConstructorDescriptor> {
        self.constructors.iter().find(|c| c.signature == signature)
    }
}
