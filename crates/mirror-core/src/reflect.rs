//! The [`Reflect`] trait: a type's explicit self-description.

use std::any::Any;

use crate::ClassDescriptor;

/// A type that can describe itself for registration.
///
/// `describe` is called exactly once per registry, at registration
/// time, and must return the same descriptor every time. Nothing runs
/// before `main`: a registry is populated by explicitly registering
/// each `Reflect` type.
///
/// # Examples
///
/// ```
/// use mirror_core::{thunk, ClassDescriptor, Reflect, impl_reflect_value};
///
/// struct RGBColor {
///     r: u8,
///     g: u8,
///     b: u8,
/// }
///
/// impl Reflect for RGBColor {
///     const CLASS_NAME: &'static str = "RGBColor";
///
///     fn describe() -> ClassDescriptor {
///         ClassDescriptor::new(Self::CLASS_NAME)
///             .with_constructor(thunk::constructor::<RGBColor, _, _>(
///                 |r: u8, g: u8, b: u8| RGBColor { r, g, b },
///             ))
///             .with_field(thunk::field("r", "red channel", 0.0, 255.0,
///                 |c: &RGBColor| &c.r,
///                 |c: &mut RGBColor| &mut c.r))
///             .with_method(thunk::method("Add", "brighten every channel",
///                 |c: &RGBColor, amount: u8| RGBColor {
///                     r: c.r.saturating_add(amount),
///                     g: c.g.saturating_add(amount),
///                     b: c.b.saturating_add(amount),
///                 }))
///     }
/// }
///
/// impl_reflect_value!(RGBColor);
/// ```
pub trait Reflect: Any + Sized {
    /// The name the class is registered and looked up under.
    const CLASS_NAME: &'static str;

    /// Build the class's full descriptor.
    fn describe() -> ClassDescriptor;
}
