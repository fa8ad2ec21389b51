//! Thunk builders: turn typed Rust closures into the erased invokers
//! stored on descriptors.
//!
//! Each builder records argument and return tokens from the closure's
//! type at registration time, then wraps the closure so invocation
//! goes: arity check, receiver downcast, per-argument extraction,
//! typed call, return conversion. Receiver mutability (`&T` vs
//! `&mut T`) is resolved by marker-type trait dispatch, so both shapes
//! register through the same [`method`] builder.

use std::any::Any;
use std::sync::Arc;

use crate::{
    CallError, ConstructorDescriptor, FieldDescriptor, FromValue, IntoReturn, IntoValue,
    MethodDescriptor, MethodTraits, Reflect, TypeToken, Value,
};

/// Marker for methods taking `&T`.
#[doc(hidden)]
pub struct ByRef;

/// Marker for methods taking `&mut T`.
#[doc(hidden)]
pub struct ByMut;

fn check_arity(expected: usize, args: &[Value]) -> Result<(), CallError> {
    if args.len() != expected {
        return Err(CallError::ArityMismatch {
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn downcast_receiver<T: Any>(receiver: &mut dyn Any) -> Result<&mut T, CallError> {
    receiver
        .downcast_mut::<T>()
        .ok_or(CallError::ReceiverMismatch {
            expected: std::any::type_name::<T>(),
        })
}

/// A typed instance-method closure, over both receiver mutabilities
/// and arities 0 through 6. `Marker` disambiguates the overlapping
/// `Fn(&T, …)` and `Fn(&mut T, …)` shapes.
pub trait InstanceMethod<T, Marker>: Send + Sync + 'static {
    fn arg_tokens() -> Vec<TypeToken>;
    fn return_token() -> Option<TypeToken>;
    fn call(&self, receiver: &mut T, args: &[Value]) -> Result<Option<Value>, CallError>;
}

/// A typed static-method closure, arities 0 through 6.
pub trait StaticMethod<Marker>: Send + Sync + 'static {
    fn arg_tokens() -> Vec<TypeToken>;
    fn return_token() -> Option<TypeToken>;
    fn call(&self, args: &[Value]) -> Result<Option<Value>, CallError>;
}

/// A typed constructor closure, arities 0 through 6.
pub trait ConstructorFn<T, Marker>: Send + Sync + 'static {
    fn arg_tokens() -> Vec<TypeToken>;
    fn call(&self, args: &[Value]) -> Result<T, CallError>;
}

macro_rules! impl_callables {
    ($count:expr $(, $arg:ident : $idx:tt)*) => {
        impl<T, R, F $(, $arg)*> InstanceMethod<T, (ByRef, ($($arg,)*), R)> for F
        where
            T: Any,
            R: IntoReturn,
            F: Fn(&T $(, $arg)*) -> R + Send + Sync + 'static,
            $($arg: FromValue,)*
        {
            fn arg_tokens() -> Vec<TypeToken> {
                vec![$(<$arg as FromValue>::token(),)*]
            }

            fn return_token() -> Option<TypeToken> {
                R::return_token()
            }

            fn call(&self, receiver: &mut T, args: &[Value]) -> Result<Option<Value>, CallError> {
                check_arity($count, args)?;
                Ok(self(&*receiver $(, <$arg as FromValue>::from_value(&args[$idx])?)*).into_return())
            }
        }

        impl<T, R, F $(, $arg)*> InstanceMethod<T, (ByMut, ($($arg,)*), R)> for F
        where
            T: Any,
            R: IntoReturn,
            F: Fn(&mut T $(, $arg)*) -> R + Send + Sync + 'static,
            $($arg: FromValue,)*
        {
            fn arg_tokens() -> Vec<TypeToken> {
                vec![$(<$arg as FromValue>::token(),)*]
            }

            fn return_token() -> Option<TypeToken> {
                R::return_token()
            }

            fn call(&self, receiver: &mut T, args: &[Value]) -> Result<Option<Value>, CallError> {
                check_arity($count, args)?;
                Ok(self(receiver $(, <$arg as FromValue>::from_value(&args[$idx])?)*).into_return())
            }
        }

        impl<R, F $(, $arg)*> StaticMethod<(($($arg,)*), R)> for F
        where
            R: IntoReturn,
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            $($arg: FromValue,)*
        {
            fn arg_tokens() -> Vec<TypeToken> {
                vec![$(<$arg as FromValue>::token(),)*]
            }

            fn return_token() -> Option<TypeToken> {
                R::return_token()
            }

            fn call(&self, args: &[Value]) -> Result<Option<Value>, CallError> {
                check_arity($count, args)?;
                Ok(self($(<$arg as FromValue>::from_value(&args[$idx])?),*).into_return())
            }
        }

        impl<T, F $(, $arg)*> ConstructorFn<T, ($($arg,)*)> for F
        where
            T: Any,
            F: Fn($($arg),*) -> T + Send + Sync + 'static,
            $($arg: FromValue,)*
        {
            fn arg_tokens() -> Vec<TypeToken> {
                vec![$(<$arg as FromValue>::token(),)*]
            }

            fn call(&self, args: &[Value]) -> Result<T, CallError> {
                check_arity($count, args)?;
                Ok(self($(<$arg as FromValue>::from_value(&args[$idx])?),*))
            }
        }
    };
}

impl_callables!(0);
impl_callables!(1, A0: 0);
impl_callables!(2, A0: 0, A1: 1);
impl_callables!(3, A0: 0, A1: 1, A2: 2);
impl_callables!(4, A0: 0, A1: 1, A2: 2, A3: 3);
impl_callables!(5, A0: 0, A1: 1, A2: 2, A3: 3, A4: 4);
impl_callables!(6, A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5);

/// Build a field descriptor from two projection functions.
///
/// The projections must return references into the instance's own
/// storage; plain `fn` pointers (no captures) keep that property
/// visible at the registration site:
///
/// ```ignore
/// thunk::field("r", "red channel", 0.0, 255.0,
///     |c: &RGBColor| &c.r,
///     |c: &mut RGBColor| &mut c.r)
/// ```
pub fn field<T, V>(
    name: &'static str,
    description: &'static str,
    min_value: f64,
    max_value: f64,
    get: fn(&T) -> &V,
    set: fn(&mut T) -> &mut V,
) -> FieldDescriptor
where
    T: Any,
    V: FromValue + IntoValue + Copy + 'static,
{
    let token = <V as IntoValue>::token();
    let getter = Arc::new(move |instance: &dyn Any| {
        let instance = instance
            .downcast_ref::<T>()
            .ok_or(CallError::ReceiverMismatch {
                expected: std::any::type_name::<T>(),
            })?;
        Ok((*get(instance)).into_value())
    });
    let setter = Arc::new(move |instance: &mut dyn Any, value: Value| {
        let instance = downcast_receiver::<T>(instance)?;
        *set(instance) = V::from_value(&value)?;
        Ok(())
    });
    debug_assert_eq!(token.kind.size(), std::mem::size_of::<V>());
    FieldDescriptor::new(
        name,
        token,
        token.kind.size(),
        description,
        min_value,
        max_value,
        getter,
        setter,
    )
}

/// Build an instance-method descriptor from a typed closure.
///
/// Accepts both `Fn(&T, …) -> R` and `Fn(&mut T, …) -> R` shapes.
pub fn method<T, Marker, F>(name: &'static str, doc: &'static str, f: F) -> MethodDescriptor
where
    T: Any,
    F: InstanceMethod<T, Marker>,
{
    let invoker = Arc::new(
        move |receiver: Option<&mut dyn Any>, args: &[Value]| -> Result<Option<Value>, CallError> {
            let receiver = receiver.ok_or(CallError::MissingReceiver)?;
            f.call(downcast_receiver::<T>(receiver)?, args)
        },
    );
    MethodDescriptor::new(
        name,
        doc,
        F::return_token(),
        F::arg_tokens(),
        MethodTraits::empty(),
        invoker,
    )
}

/// Build a static-method descriptor from a typed closure.
pub fn static_method<Marker, F>(name: &'static str, doc: &'static str, f: F) -> MethodDescriptor
where
    F: StaticMethod<Marker>,
{
    let invoker = Arc::new(
        move |_receiver: Option<&mut dyn Any>, args: &[Value]| -> Result<Option<Value>, CallError> {
            f.call(args)
        },
    );
    MethodDescriptor::new(
        name,
        doc,
        F::return_token(),
        F::arg_tokens(),
        MethodTraits::STATIC,
        invoker,
    )
}

/// Build a constructor descriptor from a typed closure producing `T`.
pub fn constructor<T, Marker, F>(f: F) -> ConstructorDescriptor
where
    T: Reflect,
    F: ConstructorFn<T, Marker>,
{
    let invoker = Arc::new(move |args: &[Value]| -> Result<Box<dyn Any>, CallError> {
        Ok(Box::new(f.call(args)?) as Box<dyn Any>)
    });
    ConstructorDescriptor::new(T::CLASS_NAME, F::arg_tokens(), invoker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassDescriptor, TypeKind};

    struct Counter {
        count: i32,
    }

    impl Reflect for Counter {
        const CLASS_NAME: &'static str = "Counter";

        fn describe() -> ClassDescriptor {
            ClassDescriptor::new(Self::CLASS_NAME)
                .with_constructor(constructor::<Counter, _, _>(|start: i32| Counter {
                    count: start,
                }))
                .with_field(field(
                    "count",
                    "current tally",
                    0.0,
                    0.0,
                    |c: &Counter| &c.count,
                    |c: &mut Counter| &mut c.count,
                ))
                .with_method(method("Bump", "add to the tally", |c: &mut Counter, by: i32| {
                    c.count += by;
                }))
                .with_method(method("Get", "read the tally", |c: &Counter| c.count))
                .with_method(static_method("Max", "larger of two", |a: i32, b: i32| {
                    a.max(b)
                }))
        }
    }

    #[test]
    fn constructor_builds_boxed_instance() {
        let class = Counter::describe();
        let ctor = class.find_constructor_by_arity(1).unwrap();
        assert_eq!(ctor.signature, "Counter(i32)");

        let boxed = ctor.invoke(&[Value::I32(5)]).unwrap();
        let counter = boxed.downcast_ref::<Counter>().unwrap();
        assert_eq!(counter.count, 5);
    }

    #[test]
    fn constructor_arity_is_checked() {
        let class = Counter::describe();
        let ctor = class.find_constructor_by_arity(1).unwrap();
        assert!(matches!(
            ctor.invoke(&[]),
            Err(CallError::ArityMismatch { expected: 1, got: 0 })
        ));
    }

    #[test]
    fn field_get_and_set() {
        let class = Counter::describe();
        let f = class.find_field("count").unwrap();
        assert_eq!(f.token.kind, TypeKind::I32);
        assert_eq!(f.size, 4);

        let mut counter = Counter { count: 3 };
        let v = f.get(&counter).unwrap();
        assert_eq!(i32::from_value(&v).unwrap(), 3);

        f.set(&mut counter, Value::I32(9)).unwrap();
        assert_eq!(counter.count, 9);
    }

    #[test]
    fn field_round_trips_every_scalar_width() {
        struct Mixed {
            flag: bool,
            sbyte: i8,
            byte: u8,
            short: i16,
            ushort: u16,
            int: i32,
            uint: u32,
            long: i64,
            ulong: u64,
            float: f32,
            double: f64,
        }

        impl Reflect for Mixed {
            const CLASS_NAME: &'static str = "Mixed";

            fn describe() -> ClassDescriptor {
                ClassDescriptor::new(Self::CLASS_NAME)
                    .with_field(field("flag", "", 0.0, 0.0, |m: &Mixed| &m.flag, |m: &mut Mixed| &mut m.flag))
                    .with_field(field("sbyte", "", 0.0, 0.0, |m: &Mixed| &m.sbyte, |m: &mut Mixed| &mut m.sbyte))
                    .with_field(field("byte", "", 0.0, 0.0, |m: &Mixed| &m.byte, |m: &mut Mixed| &mut m.byte))
                    .with_field(field("short", "", 0.0, 0.0, |m: &Mixed| &m.short, |m: &mut Mixed| &mut m.short))
                    .with_field(field("ushort", "", 0.0, 0.0, |m: &Mixed| &m.ushort, |m: &mut Mixed| &mut m.ushort))
                    .with_field(field("int", "", 0.0, 0.0, |m: &Mixed| &m.int, |m: &mut Mixed| &mut m.int))
                    .with_field(field("uint", "", 0.0, 0.0, |m: &Mixed| &m.uint, |m: &mut Mixed| &mut m.uint))
                    .with_field(field("long", "", 0.0, 0.0, |m: &Mixed| &m.long, |m: &mut Mixed| &mut m.long))
                    .with_field(field("ulong", "", 0.0, 0.0, |m: &Mixed| &m.ulong, |m: &mut Mixed| &mut m.ulong))
                    .with_field(field("float", "", 0.0, 0.0, |m: &Mixed| &m.float, |m: &mut Mixed| &mut m.float))
                    .with_field(field("double", "", 0.0, 0.0, |m: &Mixed| &m.double, |m: &mut Mixed| &mut m.double))
            }
        }

        let class = Mixed::describe();
        let mut mixed = Mixed {
            flag: false,
            sbyte: 0,
            byte: 0,
            short: 0,
            ushort: 0,
            int: 0,
            uint: 0,
            long: 0,
            ulong: 0,
            float: 0.0,
            double: 0.0,
        };

        // Extremes of each width, bit-for-bit through set then get.
        let cases = [
            ("flag", Value::Bool(true), TypeKind::Bool, 1),
            ("sbyte", Value::I8(i8::MIN), TypeKind::I8, 1),
            ("byte", Value::U8(u8::MAX), TypeKind::U8, 1),
            ("short", Value::I16(i16::MIN), TypeKind::I16, 2),
            ("ushort", Value::U16(u16::MAX), TypeKind::U16, 2),
            ("int", Value::I32(i32::MIN), TypeKind::I32, 4),
            ("uint", Value::U32(u32::MAX), TypeKind::U32, 4),
            ("long", Value::I64(i64::MIN), TypeKind::I64, 8),
            ("ulong", Value::U64(u64::MAX), TypeKind::U64, 8),
            ("float", Value::F32(f32::MIN_POSITIVE), TypeKind::F32, 4),
            ("double", Value::F64(f64::MAX), TypeKind::F64, 8),
        ];
        for (name, value, kind, size) in cases {
            let f = class.find_field(name).unwrap();
            assert_eq!(f.token.kind, kind);
            assert_eq!(f.size, size);

            let expected = value.clone_scalar().unwrap();
            f.set(&mut mixed, value).unwrap();
            let got = f.get(&mixed).unwrap();
            assert_eq!(got.kind(), expected.kind());
            assert_eq!(got.as_i64(), expected.as_i64());
            assert_eq!(got.as_f64().map(f64::to_bits), expected.as_f64().map(f64::to_bits));
            assert_eq!(got.as_bool(), expected.as_bool());
        }
    }

    #[test]
    fn field_set_rejects_wrong_kind() {
        let class = Counter::describe();
        let f = class.find_field("count").unwrap();
        let mut counter = Counter { count: 0 };
        assert_eq!(
            f.set(&mut counter, Value::F64(1.0)),
            Err(CallError::TypeMismatch {
                expected: TypeKind::I32,
                got: TypeKind::F64,
            })
        );
    }

    #[test]
    fn mut_method_mutates_receiver() {
        let class = Counter::describe();
        let bump = class.find_instance_method("Bump").unwrap();
        assert_eq!(bump.signature, "Bump(i32)");
        assert_eq!(bump.return_type, None);

        let mut counter = Counter { count: 1 };
        let out = bump.invoke(Some(&mut counter), &[Value::I32(4)]).unwrap();
        assert!(out.is_none());
        assert_eq!(counter.count, 5);
    }

    #[test]
    fn ref_method_reads_receiver() {
        let class = Counter::describe();
        let get = class.find_instance_method("Get").unwrap();
        assert_eq!(get.return_type.map(|t| t.kind), Some(TypeKind::I32));

        let mut counter = Counter { count: 42 };
        let out = get.invoke(Some(&mut counter), &[]).unwrap().unwrap();
        assert_eq!(i32::from_value(&out).unwrap(), 42);
    }

    #[test]
    fn missing_receiver_is_rejected() {
        let class = Counter::describe();
        let get = class.find_instance_method("Get").unwrap();
        assert!(matches!(get.invoke(None, &[]), Err(CallError::MissingReceiver)));
    }

    #[test]
    fn wrong_receiver_type_is_rejected() {
        let class = Counter::describe();
        let get = class.find_instance_method("Get").unwrap();
        let mut not_a_counter = String::from("nope");
        assert!(matches!(
            get.invoke(Some(&mut not_a_counter), &[]),
            Err(CallError::ReceiverMismatch { .. })
        ));
    }

    #[test]
    fn static_method_ignores_receiver() {
        let class = Counter::describe();
        let max = class.find_static_method("Max").unwrap();
        assert!(max.is_static());
        assert_eq!(max.signature, "Max(i32,i32)");

        // No receiver needed.
        let out = max.invoke(None, &[Value::I32(2), Value::I32(7)]).unwrap().unwrap();
        assert_eq!(i32::from_value(&out).unwrap(), 7);

        // A receiver, if passed, is ignored rather than downcast.
        let mut counter = Counter { count: 0 };
        let out = max
            .invoke(Some(&mut counter), &[Value::I32(9), Value::I32(1)])
            .unwrap()
            .unwrap();
        assert_eq!(i32::from_value(&out).unwrap(), 9);
    }

    #[test]
    fn method_arity_mismatch() {
        let class = Counter::describe();
        let bump = class.find_instance_method("Bump").unwrap();
        let mut counter = Counter { count: 0 };
        assert!(matches!(
            bump.invoke(Some(&mut counter), &[Value::I32(1), Value::I32(2)]),
            Err(CallError::ArityMismatch { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn method_argument_kind_mismatch() {
        let class = Counter::describe();
        let bump = class.find_instance_method("Bump").unwrap();
        let mut counter = Counter { count: 0 };
        assert!(matches!(
            bump.invoke(Some(&mut counter), &[Value::U8(1)]),
            Err(CallError::TypeMismatch {
                expected: TypeKind::I32,
                got: TypeKind::U8,
            })
        ));
    }
}
