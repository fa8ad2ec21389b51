//! Class registry for the mirror reflection bridge.
//!
//! [`ClassRegistry`] stores [`ClassDescriptor`]s built by `Reflect`
//! types; [`global`] holds the single process-wide instance that the
//! C ABI and scripting adapters read from.
//!
//! [`ClassDescriptor`]: mirror_core::ClassDescriptor

pub mod global;
pub mod registry;

pub use registry::{ClassRegistry, RegistryBuilder};
