//! The process-wide registry instance.
//!
//! Registration is explicit and runs exactly once, before any lookup:
//! build a [`ClassRegistry`], then [`install`] it. Nothing registers
//! itself from static initializers, so the registered set is decided
//! by a single readable call site and is identical on every run.

use once_cell::sync::OnceCell;

use mirror_core::RegistryError;

use crate::ClassRegistry;

static GLOBAL: OnceCell<ClassRegistry> = OnceCell::new();

/// Install `registry` as the process-wide instance.
///
/// Fails with [`RegistryError::AlreadyInstalled`] if a registry was
/// installed before; the existing instance is left untouched.
pub fn install(registry: ClassRegistry) -> Result<&'static ClassRegistry, RegistryError> {
    let mut fresh = false;
    let installed = GLOBAL.get_or_init(|| {
        fresh = true;
        registry
    });
    if fresh {
        Ok(installed)
    } else {
        Err(RegistryError::AlreadyInstalled)
    }
}

/// Install the registry produced by `init`, or return the existing
/// instance. `init` runs at most once per process.
///
/// This is the idempotent variant for hosts where several entry points
/// may race to initialize (plugin loaders, test harnesses).
pub fn install_with(init: impl FnOnce() -> ClassRegistry) -> &'static ClassRegistry {
    GLOBAL.get_or_init(init)
}

/// The installed registry, if any.
pub fn get() -> Option<&'static ClassRegistry> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_core::ClassDescriptor;

    // Process-global state: exercise the full lifecycle in one test so
    // ordering between parallel test threads cannot matter.
    #[test]
    fn install_then_reinstall_then_get() {
        let installed = install_with(|| {
            let mut registry = ClassRegistry::new();
            registry.register(ClassDescriptor::new("First"));
            registry
        });
        assert!(installed.find("First").is_some());

        // A second install must fail and must not replace the instance.
        let mut other = ClassRegistry::new();
        other.register(ClassDescriptor::new("Second"));
        assert!(matches!(install(other), Err(RegistryError::AlreadyInstalled)));

        let current = get().unwrap();
        assert!(current.find("First").is_some());
        assert!(current.find("Second").is_none());

        // install_with after the fact returns the existing instance.
        let again = install_with(ClassRegistry::new);
        assert!(again.find("First").is_some());
    }
}
