//! Deterministic hash-based type identity.
//!
//! [`TypeHash`] is a 64-bit hash computed from a type's registered name.
//! Unlike sequential IDs, hashes are stable across processes and
//! registration orders, so C-side callers can cache them and scripting
//! hosts can compare type identity without string round-trips.
//!
//! # Examples
//!
//! ```
//! use mirror_core::TypeHash;
//!
//! let a = TypeHash::from_name("RGBColor");
//! let b = TypeHash::from_name("RGBColor");
//! assert_eq!(a, b);
//! assert_ne!(a, TypeHash::from_name("Vector3"));
//! ```

use std::fmt;

use xxhash_rust::xxh64::xxh64;

/// Domain-mixing constants for hash computation.
///
/// Keeps type hashes and signature hashes disjoint even when a method
/// signature happens to spell a registered type name.
pub mod hash_constants {
    /// Domain marker for type-name hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for member-signature hashes.
    pub const SIGNATURE: u64 = 0x7d3c8b4a92e15f6d;
}

/// A deterministic 64-bit hash identifying a registered type or member
/// signature.
///
/// The same input always produces the same hash, so identity survives
/// serialization across the C ABI.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a registered type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a hash from a rendered member signature such as
    /// `"Add(u8)"` or `"RGBColor(u8,u8,u8)"`.
    ///
    /// Signature hashes live in a separate domain from type hashes.
    #[inline]
    pub fn from_signature(signature: &str) -> Self {
        TypeHash(hash_constants::SIGNATURE ^ xxh64(signature.as_bytes(), 0))
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
