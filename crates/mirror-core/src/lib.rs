//! Core descriptor model for the mirror reflection bridge.
//!
//! This crate defines the vocabulary every other layer speaks:
//!
//! - [`TypeKind`]/[`TypeToken`]: closed tag set the marshaling layers
//!   dispatch on
//! - [`Value`]: tagged values crossing the invocation boundary
//! - [`ClassDescriptor`] and its members: the runtime record of a
//!   registered type
//! - [`thunk`]: builders that erase typed Rust closures into the
//!   canonical invoker shape
//! - [`Reflect`]: the trait a type implements to describe itself
//!
//! Registration and process-wide lookup live in `mirror-registry`; the
//! C ABI and Lua adapters consume this crate read-only.

pub mod descriptor;
pub mod error;
pub mod reflect;
pub mod thunk;
pub mod token;
pub mod type_hash;
pub mod value;

pub use descriptor::{
    ClassDescriptor, ConstructorDescriptor, ConstructorInvoker, FieldDescriptor, FieldGet,
    FieldSet, Invoker, MethodDescriptor, MethodTraits, render_signature,
};
pub use error::{CallError, RegistryError};
pub use reflect::Reflect;
pub use token::{TypeKind, TypeToken};
pub use type_hash::{TypeHash, hash_constants};
pub use value::{BoxedObject, FromValue, IntoReturn, IntoValue, Value};
