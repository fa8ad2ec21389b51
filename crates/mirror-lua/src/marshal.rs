//! Lua <-> tagged-value marshaling.
//!
//! Conversion dispatches on the declared [`TypeToken`] of each slot,
//! never on Lua-side guessing: an argument destined for a `u8`
//! parameter must be a Lua integer in range, or the call raises.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use mlua::{Error as LuaError, Result as LuaResult, Value as LuaValue};

use mirror_core::{CallError, MethodDescriptor, TypeKind, TypeToken, Value};

pub(crate) fn runtime_error(message: impl Into<String>) -> LuaError {
    LuaError::RuntimeError(message.into())
}

fn lua_type_name(value: &LuaValue) -> &'static str {
    value.type_name()
}

fn expect_integer(value: &LuaValue, expected: TypeKind) -> LuaResult<i64> {
    match value {
        LuaValue::Integer(v) => Ok(*v),
        other => Err(runtime_error(format!(
            "expected {} (integer), got {}",
            expected,
            lua_type_name(other)
        ))),
    }
}

fn expect_number(value: &LuaValue, expected: TypeKind) -> LuaResult<f64> {
    match value {
        LuaValue::Number(v) => Ok(*v),
        LuaValue::Integer(v) => Ok(*v as f64),
        other => Err(runtime_error(format!(
            "expected {} (number), got {}",
            expected,
            lua_type_name(other)
        ))),
    }
}

macro_rules! narrow_int {
    ($raw:expr, $ty:ty, $kind:expr, $variant:ident) => {{
        let raw = $raw;
        <$ty>::try_from(raw)
            .map(Value::$variant)
            .map_err(|_| runtime_error(format!("{} out of range for {}", raw, $kind)))
    }};
}

/// Narrow a Lua integer into the declared integer kind, range-checked.
fn narrow_integer(raw: i64, kind: TypeKind) -> LuaResult<Value> {
    match kind {
        TypeKind::I8 => narrow_int!(raw, i8, kind, I8),
        TypeKind::U8 => narrow_int!(raw, u8, kind, U8),
        TypeKind::I16 => narrow_int!(raw, i16, kind, I16),
        TypeKind::U16 => narrow_int!(raw, u16, kind, U16),
        TypeKind::I32 => narrow_int!(raw, i32, kind, I32),
        TypeKind::U32 => narrow_int!(raw, u32, kind, U32),
        TypeKind::I64 => Ok(Value::I64(raw)),
        TypeKind::U64 => narrow_int!(raw, u64, kind, U64),
        _ => Err(runtime_error(
            CallError::UnsupportedType(kind.to_string()).to_string(),
        )),
    }
}

/// Convert a Lua value into the tagged value a declared slot expects.
pub(crate) fn value_from_lua(value: &LuaValue, expected: &TypeToken) -> LuaResult<Value> {
    let kind = expected.kind;
    if kind.is_integer() {
        return narrow_integer(expect_integer(value, kind)?, kind);
    }
    if kind.is_float() {
        let raw = expect_number(value, kind)?;
        return Ok(match kind {
            TypeKind::F32 => Value::F32(raw as f32),
            _ => Value::F64(raw),
        });
    }
    match kind {
        TypeKind::Bool => match value {
            LuaValue::Boolean(v) => Ok(Value::Bool(*v)),
            other => Err(runtime_error(format!(
                "expected bool, got {}",
                lua_type_name(other)
            ))),
        },
        _ => Err(runtime_error(
            CallError::UnsupportedType(expected.name.to_string()).to_string(),
        )),
    }
}

/// Convert a scalar tagged value back to Lua. `None` for objects,
/// which the caller wraps as userdata instead.
pub(crate) fn scalar_to_lua(value: &Value) -> Option<LuaValue> {
    match *value {
        Value::Bool(v) => Some(LuaValue::Boolean(v)),
        Value::I8(v) => Some(LuaValue::Integer(v as i64)),
        Value::U8(v) => Some(LuaValue::Integer(v as i64)),
        Value::I16(v) => Some(LuaValue::Integer(v as i64)),
        Value::U16(v) => Some(LuaValue::Integer(v as i64)),
        Value::I32(v) => Some(LuaValue::Integer(v as i64)),
        Value::U32(v) => Some(LuaValue::Integer(v as i64)),
        Value::I64(v) => Some(LuaValue::Integer(v)),
        // Two's-complement reinterpretation above i64::MAX, like a C cast.
        Value::U64(v) => Some(LuaValue::Integer(v as i64)),
        Value::F32(v) => Some(LuaValue::Number(v as f64)),
        Value::F64(v) => Some(LuaValue::Number(v)),
        Value::Object(_) => None,
    }
}

/// Marshal a full argument list against declared tokens, arity first.
pub(crate) fn marshal_args(args: &[LuaValue], tokens: &[TypeToken]) -> LuaResult<Vec<Value>> {
    if args.len() != tokens.len() {
        return Err(runtime_error(
            CallError::ArityMismatch {
                expected: tokens.len(),
                got: args.len(),
            }
            .to_string(),
        ));
    }
    args.iter()
        .zip(tokens)
        .map(|(arg, token)| value_from_lua(arg, token))
        .collect()
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Invoke a method with panic containment: native panics surface as
/// Lua errors, never as unwinds through the interpreter.
pub(crate) fn invoke_checked(
    method: &MethodDescriptor,
    receiver: Option<&mut dyn Any>,
    args: &[Value],
) -> LuaResult<Option<Value>> {
    match catch_unwind(AssertUnwindSafe(|| method.invoke(receiver, args))) {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(runtime_error(err.to_string())),
        Err(payload) => Err(runtime_error(
            CallError::BoundaryFault(panic_message(payload)).to_string(),
        )),
    }
}
