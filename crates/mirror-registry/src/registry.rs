//! ClassRegistry - storage and lookup for registered class descriptors.
//!
//! # Storage Model
//!
//! Descriptors live in an append-only `Vec` (stable indices for
//! enumeration across the C ABI) with an `FxHashMap` name index for
//! O(1) lookup. Duplicate names keep the first registration; later
//! ones remain enumerable but are not reachable by name.
//!
//! # Thread Safety
//!
//! A `ClassRegistry` is populated single-threaded during startup and
//! then read-only. The process-wide instance in [`global`](crate::global)
//! hands out `&'static` references, so post-install lookups are safe
//! from any thread.

use rustc_hash::FxHashMap;

use mirror_core::{ClassDescriptor, Reflect};

/// Storage and lookup for registered class descriptors.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<ClassDescriptor>,
    by_name: FxHashMap<&'static str, usize>,
}

impl ClassRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a chained builder.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            registry: ClassRegistry::new(),
        }
    }

    /// Register a descriptor.
    ///
    /// First registration wins the name: a duplicate stays enumerable
    /// by index but never shadows the original in name lookups.
    pub fn register(&mut self, descriptor: ClassDescriptor) {
        let index = self.classes.len();
        self.by_name.entry(descriptor.name).or_insert(index);
        self.classes.push(descriptor);
    }

    /// Register a type through its [`Reflect`] implementation.
    pub fn register_type<T: Reflect>(&mut self) {
        self.register(T::describe());
    }

    /// Look up a class by registered name.
    pub fn find(&self, name: &str) -> Option<&ClassDescriptor> {
        self.by_name.get(name).map(|&index| &self.classes[index])
    }

    /// All registered descriptors, in registration order.
    pub fn classes(&self) -> &[ClassDescriptor] {
        &self.classes
    }

    /// Descriptor at a registration index.
    pub fn class_at(&self, index: usize) -> Option<&ClassDescriptor> {
        self.classes.get(index)
    }

    /// Number of registered descriptors (duplicates included).
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Chained registration, for building a registry in one expression.
///
/// ```
/// use mirror_registry::ClassRegistry;
/// # use mirror_core::{ClassDescriptor, Reflect};
/// # struct RGBColor;
/// # impl Reflect for RGBColor {
/// #     const CLASS_NAME: &'static str = "RGBColor";
/// #     fn describe() -> ClassDescriptor { ClassDescriptor::new(Self::CLASS_NAME) }
/// # }
///
/// let registry = ClassRegistry::builder().register::<RGBColor>().build();
/// assert!(registry.find("RGBColor").is_some());
/// ```
pub struct RegistryBuilder {
    registry: ClassRegistry,
}

impl RegistryBuilder {
    /// Register a type through its [`Reflect`] implementation.
    pub fn register<T: Reflect>(mut self) -> Self {
        self.registry.register_type::<T>();
        self
    }

    /// Register an already-built descriptor.
    pub fn register_descriptor(mut self, descriptor: ClassDescriptor) -> Self {
        self.registry.register(descriptor);
        self
    }

    pub fn build(self) -> ClassRegistry {
        self.registry
    }
}
