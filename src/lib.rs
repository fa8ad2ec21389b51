//! mirror - a runtime reflection and invocation bridge.
//!
//! Types describe themselves as [`ClassDescriptor`]s, register into a
//! process-wide [`ClassRegistry`], and become reachable from three
//! front ends that all speak the same erased-invoker shape:
//!
//! - native Rust, through the descriptors directly
//! - C, through the opaque-handle ABI in `mirror-capi`
//! - Lua, through [`lua::install`]
//!
//! ```
//! use mirror::prelude::*;
//!
//! struct Meter { value: i32 }
//!
//! impl Reflect for Meter {
//!     const CLASS_NAME: &'static str = "Meter";
//!
//!     fn describe() -> ClassDescriptor {
//!         ClassDescriptor::new(Self::CLASS_NAME)
//!             .with_constructor(thunk::constructor::<Meter, _, _>(|| Meter { value: 0 }))
//!             .with_method(thunk::method("Read", "", |m: &Meter| m.value))
//!     }
//! }
//!
//! let registry = ClassRegistry::builder().register::<Meter>().build();
//! let class = registry.find("Meter").unwrap();
//! let mut meter = class.find_constructor_by_arity(0).unwrap().invoke(&[]).unwrap();
//! let read = class.find_method("Read").unwrap();
//! let out = read.invoke(Some(meter.as_mut()), &[]).unwrap();
//! assert!(matches!(out, Some(Value::I32(0))));
//! ```

pub use mirror_core::{
    BoxedObject, CallError, ClassDescriptor, ConstructorDescriptor, FieldDescriptor, FromValue,
    IntoReturn, IntoValue, MethodDescriptor, MethodTraits, Reflect, RegistryError, TypeHash,
    TypeKind, TypeToken, Value, impl_reflect_value, render_signature, thunk,
};
pub use mirror_registry::{ClassRegistry, RegistryBuilder, global};

/// The C ABI surface, re-exported for hosts linking statically.
pub mod capi {
    pub use mirror_capi::*;
}

/// The Lua adapter.
pub mod lua {
    pub use mirror_lua::{InstanceOrigin, ScriptInstance, install, mlua, register};
}

pub mod prelude {
    pub use mirror_core::{
        CallError, ClassDescriptor, FromValue, IntoReturn, IntoValue, Reflect, TypeHash,
        TypeKind, TypeToken, Value, impl_reflect_value, thunk,
    };
    pub use mirror_registry::{ClassRegistry, global};
}
