//! Tagged runtime values and the marshaling traits built on them.
//!
//! [`Value`] is the single currency of every erased invocation: thunks
//! take `&[Value]` and produce `Option<Value>`. Scalars carry their
//! payload inline; objects carry a [`BoxedObject`] that owns the
//! instance and remembers its registered class.

use std::any::Any;
use std::fmt;

use crate::{CallError, TypeKind, TypeToken};

/// An owned instance of a registered class, erased behind `dyn Any`.
pub struct BoxedObject {
    token: TypeToken,
    inner: Box<dyn Any>,
}

impl BoxedObject {
    /// Box a concrete value under its registered class name.
    pub fn new<T: Any>(class_name: &'static str, value: T) -> Self {
        BoxedObject {
            token: TypeToken::object(class_name),
            inner: Box::new(value),
        }
    }

    /// The object's type token.
    pub fn token(&self) -> TypeToken {
        self.token
    }

    /// The registered class name.
    pub fn class_name(&self) -> &'static str {
        self.token.name
    }

    /// Borrow the erased payload.
    pub fn as_any(&self) -> &dyn Any {
        self.inner.as_ref()
    }

    /// Recover the concrete type, or get `self` back on mismatch.
    pub fn downcast<T: Any>(self) -> Result<Box<T>, BoxedObject> {
        let BoxedObject { token, inner } = self;
        inner.downcast::<T>().map_err(|inner| BoxedObject { token, inner })
    }

    /// Give up the erased payload, discarding the token.
    pub fn into_inner(self) -> Box<dyn Any> {
        self.inner
    }
}

impl fmt::Debug for BoxedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxedObject({})", self.token.name)
    }
}

/// A tagged value crossing the invocation boundary.
#[derive(Debug)]
pub enum Value {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Object(BoxedObject),
}

impl Value {
    /// The kind tag of this value.
    pub fn kind(&self) -> TypeKind {
        match self {
            Value::Bool(_) => TypeKind::Bool,
            Value::I8(_) => TypeKind::I8,
            Value::U8(_) => TypeKind::U8,
            Value::I16(_) => TypeKind::I16,
            Value::U16(_) => TypeKind::U16,
            Value::I32(_) => TypeKind::I32,
            Value::U32(_) => TypeKind::U32,
            Value::I64(_) => TypeKind::I64,
            Value::U64(_) => TypeKind::U64,
            Value::F32(_) => TypeKind::F32,
            Value::F64(_) => TypeKind::F64,
            Value::Object(_) => TypeKind::Object,
        }
    }

    /// Display name of the value's type: the kind name for scalars,
    /// the class name for objects.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Object(obj) => obj.class_name(),
            other => other.kind().name(),
        }
    }

    /// Clone a scalar value. Objects are single-owner and cannot be
    /// duplicated here, so they return `None`.
    pub fn clone_scalar(&self) -> Option<Value> {
        match self {
            Value::Bool(v) => Some(Value::Bool(*v)),
            Value::I8(v) => Some(Value::I8(*v)),
            Value::U8(v) => Some(Value::U8(*v)),
            Value::I16(v) => Some(Value::I16(*v)),
            Value::U16(v) => Some(Value::U16(*v)),
            Value::I32(v) => Some(Value::I32(*v)),
            Value::U32(v) => Some(Value::U32(*v)),
            Value::I64(v) => Some(Value::I64(*v)),
            Value::U64(v) => Some(Value::U64(*v)),
            Value::F32(v) => Some(Value::F32(*v)),
            Value::F64(v) => Some(Value::F64(*v)),
            Value::Object(_) => None,
        }
    }

    /// Widen any integer value to `i64`. Lossy for `U64` above
    /// `i64::MAX` (two's-complement reinterpretation), like a C cast.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(v as i64),
            Value::U8(v) => Some(v as i64),
            Value::I16(v) => Some(v as i64),
            Value::U16(v) => Some(v as i64),
            Value::I32(v) => Some(v as i64),
            Value::U32(v) => Some(v as i64),
            Value::I64(v) => Some(v),
            Value::U64(v) => Some(v as i64),
            _ => None,
        }
    }

    /// Widen any float value to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v as f64),
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Extract a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }
}

/// Types that can be read out of a [`Value`] argument.
pub trait FromValue: Sized {
    /// The token arguments of this type are declared with.
    fn token() -> TypeToken;

    /// Extract the typed payload, or report a kind mismatch.
    fn from_value(value: &Value) -> Result<Self, CallError>;
}

/// Types that can be wrapped into a [`Value`].
pub trait IntoValue {
    /// The token results of this type are declared with.
    fn token() -> TypeToken;

    fn into_value(self) -> Value;
}

/// Return positions: like [`IntoValue`] but admitting `()` for void.
pub trait IntoReturn {
    /// Declared return token, `None` for void.
    fn return_token() -> Option<TypeToken>;

    fn into_return(self) -> Option<Value>;
}

macro_rules! impl_scalar_value {
    ($($ty:ty => $variant:ident, $kind:ident;)+) => {$(
        impl FromValue for $ty {
            fn token() -> TypeToken {
                TypeToken::scalar(TypeKind::$kind)
            }

            fn from_value(value: &Value) -> Result<Self, CallError> {
                match value {
                    Value::$variant(v) => Ok(*v),
                    other => Err(CallError::TypeMismatch {
                        expected: TypeKind::$kind,
                        got: other.kind(),
                    }),
                }
            }
        }

        impl IntoValue for $ty {
            fn token() -> TypeToken {
                TypeToken::scalar(TypeKind::$kind)
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }

        impl IntoReturn for $ty {
            fn return_token() -> Option<TypeToken> {
                Some(<$ty as IntoValue>::token())
            }

            fn into_return(self) -> Option<Value> {
                Some(self.into_value())
            }
        }
    )+};
}

impl_scalar_value! {
    bool => Bool, Bool;
    i8 => I8, I8;
    u8 => U8, U8;
    i16 => I16, I16;
    u16 => U16, U16;
    i32 => I32, I32;
    u32 => U32, U32;
    i64 => I64, I64;
    u64 => U64, U64;
    f32 => F32, F32;
    f64 => F64, F64;
}

impl IntoReturn for () {
    fn return_token() -> Option<TypeToken> {
        None
    }

    fn into_return(self) -> Option<Value> {
        None
    }
}

/// Implement [`IntoValue`]/[`IntoReturn`] for a type that implements
/// [`Reflect`](crate::Reflect), so its values can be returned from
/// reflected methods as boxed objects.
///
/// Coherence forbids a blanket impl over all `Reflect` types alongside
/// the scalar impls, so object types opt in explicitly:
///
/// ```ignore
/// impl_reflect_value!(RGBColor);
/// ```
#[macro_export]
macro_rules! impl_reflect_value {
    ($ty:ty) => {
        impl $crate::IntoValue for $ty {
            fn token() -> $crate::TypeToken {
                $crate::TypeToken::object(<$ty as $crate::Reflect>::CLASS_NAME)
            }

            fn into_value(self) -> $crate::Value {
                $crate::Value::Object($crate::BoxedObject::new(
                    <$ty as $crate::Reflect>::CLASS_NAME,
                    self,
                ))
            }
        }

        impl $crate::IntoReturn for $ty {
            fn return_token() -> Option<$crate::TypeToken> {
                Some(<$ty as $crate::IntoValue>::token())
            }

            fn into_return(self) -> Option<$crate::Value> {
                Some($crate::IntoValue::into_value(self))
            }
        }
    };
}
