//! Type tags carried by every descriptor: [`TypeKind`] and [`TypeToken`].
//!
//! Marshaling layers dispatch on `TypeKind` alone. There is no name
//! parsing anywhere: the kind is assigned when a member is registered
//! and travels with the descriptor from then on.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::TypeHash;

/// The closed set of value categories the bridge can marshal.
///
/// Scalars map one-to-one onto Rust's fixed-width numeric types;
/// `Object` covers every registered class. The `u32` representation is
/// part of the C ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum TypeKind {
    Bool = 0,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Object,
}

impl TypeKind {
    /// Canonical name of this kind.
    pub const fn name(self) -> &'static str {
        match self {
            TypeKind::Bool => "bool",
            TypeKind::I8 => "i8",
            TypeKind::U8 => "u8",
            TypeKind::I16 => "i16",
            TypeKind::U16 => "u16",
            TypeKind::I32 => "i32",
            TypeKind::U32 => "u32",
            TypeKind::I64 => "i64",
            TypeKind::U64 => "u64",
            TypeKind::F32 => "f32",
            TypeKind::F64 => "f64",
            TypeKind::Object => "object",
        }
    }

    /// Size in bytes of the scalar payload, or 0 for `Object`.
    pub const fn size(self) -> usize {
        match self {
            TypeKind::Bool | TypeKind::I8 | TypeKind::U8 => 1,
            TypeKind::I16 | TypeKind::U16 => 2,
            TypeKind::I32 | TypeKind::U32 | TypeKind::F32 => 4,
            TypeKind::I64 | TypeKind::U64 | TypeKind::F64 => 8,
            TypeKind::Object => 0,
        }
    }

    /// Whether this kind is a fixed-width scalar.
    pub const fn is_scalar(self) -> bool {
        !matches!(self, TypeKind::Object)
    }

    /// Whether this kind is an integer (signed or unsigned).
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            TypeKind::I8
                | TypeKind::U8
                | TypeKind::I16
                | TypeKind::U16
                | TypeKind::I32
                | TypeKind::U32
                | TypeKind::I64
                | TypeKind::U64
        )
    }

    /// Whether this kind is a floating-point scalar.
    pub const fn is_float(self) -> bool {
        matches!(self, TypeKind::F32 | TypeKind::F64)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A resolved type tag: kind, display name and identity hash.
///
/// For scalars the name is the canonical kind name; for objects it is
/// the class's registered name. Tokens are what descriptors store for
/// fields, arguments and returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeToken {
    pub kind: TypeKind,
    pub name: &'static str,
    pub hash: TypeHash,
}

impl TypeToken {
    /// Token for a scalar kind.
    pub fn scalar(kind: TypeKind) -> Self {
        debug_assert!(kind.is_scalar());
        TypeToken {
            kind,
            name: kind.name(),
            hash: TypeHash::from_name(kind.name()),
        }
    }

    /// Token for a registered class.
    pub fn object(class_name: &'static str) -> Self {
        TypeToken {
            kind: TypeKind::Object,
            name: class_name,
            hash: TypeHash::from_name(class_name),
        }
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
