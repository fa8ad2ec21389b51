//! Lua adapter for the mirror reflection bridge.
//!
//! [`install`] publishes a `mirror` table into a Lua state, backed by
//! a registry of class descriptors:
//!
//! ```lua
//! local c = mirror.new("RGBColor", 10, 20, 30)
//! c.r = 25                 -- field sugar via __newindex
//! local brighter = c:Add(15)
//! print(brighter.g)        -- 35
//! ```
//!
//! Every failure raises a Lua error: unknown names, arity and kind
//! mismatches, out-of-range integers, and native panics (contained at
//! the boundary and rethrown as script errors). No entry point in this
//! module returns nil to signal failure.

pub mod instance;
pub mod marshal;

use std::panic::{AssertUnwindSafe, catch_unwind};

use mlua::{Lua, Result as LuaResult, Table, Value as LuaValue, Variadic};

use mirror_core::{CallError, ClassDescriptor, ConstructorDescriptor, Value};
use mirror_registry::ClassRegistry;

pub use instance::{InstanceOrigin, ScriptInstance};

use marshal::{invoke_checked, marshal_args, panic_message, runtime_error, scalar_to_lua};

// Re-exported so embedders and tests drive the same interpreter build.
pub use mlua;

/// Build the `mirror` module table without publishing it.
pub fn register(lua: &Lua, registry: &'static ClassRegistry) -> LuaResult<Table> {
    let module = lua.create_table()?;

    module.set(
        "list_classes",
        lua.create_function(move |lua, ()| {
            let list = lua.create_table()?;
            for (i, class) in registry.classes().iter().enumerate() {
                list.set(i + 1, class.name)?;
            }
            Ok(list)
        })?,
    )?;

    module.set(
        "class_info",
        lua.create_function(move |lua, name: String| {
            let class = find_class(registry, &name)?;
            class_info_table(lua, class)
        })?,
    )?;

    module.set(
        "new",
        lua.create_function(
            move |lua, (name, args): (String, Variadic<LuaValue>)| {
                let class = find_class(registry, &name)?;
                let ctor = class.find_constructor_by_arity(args.len()).ok_or_else(|| {
                    runtime_error(format!(
                        "no constructor of {} taking {} argument(s)",
                        class.name,
                        args.len()
                    ))
                })?;
                construct(lua, registry, class, ctor, &args)
            },
        )?,
    )?;

    module.set(
        "new_sig",
        lua.create_function(
            move |lua, (name, signature, args): (String, String, Variadic<LuaValue>)| {
                let class = find_class(registry, &name)?;
                let ctor = class.find_constructor_by_signature(&signature).ok_or_else(|| {
                    runtime_error(format!(
                        "no constructor of {} with signature '{}'",
                        class.name, signature
                    ))
                })?;
                construct(lua, registry, class, ctor, &args)
            },
        )?,
    )?;

    module.set(
        "call_static",
        lua.create_function(
            move |lua, (name, method_name, args): (String, String, Variadic<LuaValue>)| {
                let class = find_class(registry, &name)?;
                let method = class.find_static_method(&method_name).ok_or_else(|| {
                    runtime_error(format!(
                        "'{}' is not a static method of {}",
                        method_name, class.name
                    ))
                })?;
                let values = marshal_args(&args, &method.arg_types)?;
                let result = invoke_checked(method, None, &values)?;
                result_to_lua(lua, registry, result)
            },
        )?,
    )?;

    module.set(
        "call_static_sig",
        lua.create_function(
            move |lua,
                  (name, method_name, signature, args): (
                String,
                String,
                String,
                Variadic<LuaValue>,
            )| {
                let class = find_class(registry, &name)?;
                let method = class
                    .find_method_with_signature(&signature)
                    .filter(|m| m.is_static() && m.name == method_name)
                    .ok_or_else(|| {
                        runtime_error(format!(
                            "no static method '{}' of {} with signature '{}'",
                            method_name, class.name, signature
                        ))
                    })?;
                let values = marshal_args(&args, &method.arg_types)?;
                let result = invoke_checked(method, None, &values)?;
                result_to_lua(lua, registry, result)
            },
        )?,
    )?;

    Ok(module)
}

/// Publish the module table as the global `mirror`.
pub fn install(lua: &Lua, registry: &'static ClassRegistry) -> LuaResult<()> {
    lua.globals().set("mirror", register(lua, registry)?)
}

fn find_class(registry: &'static ClassRegistry, name: &str) -> LuaResult<&'static ClassDescriptor> {
    registry.find(name).ok_or_else(|| {
        runtime_error(
            CallError::NotFound {
                kind: "class",
                name: name.to_string(),
            }
            .to_string(),
        )
    })
}

fn construct(
    lua: &Lua,
    registry: &'static ClassRegistry,
    class: &'static ClassDescriptor,
    ctor: &ConstructorDescriptor,
    args: &[LuaValue],
) -> LuaResult<LuaValue> {
    let values = marshal_args(args, &ctor.arg_types)?;
    let boxed = match catch_unwind(AssertUnwindSafe(|| ctor.invoke(&values))) {
        Ok(Ok(boxed)) => boxed,
        Ok(Err(err)) => return Err(runtime_error(err.to_string())),
        Err(payload) => {
            return Err(runtime_error(
                CallError::BoundaryFault(panic_message(payload)).to_string(),
            ));
        }
    };
    let userdata = lua.create_userdata(ScriptInstance::constructed(registry, class, boxed))?;
    Ok(LuaValue::UserData(userdata))
}

/// Convert an invocation result to Lua: nil for void, a scalar for
/// scalar returns, a fresh Lua-owned userdata for object returns.
pub(crate) fn result_to_lua(
    lua: &Lua,
    registry: &'static ClassRegistry,
    result: Option<Value>,
) -> LuaResult<LuaValue> {
    match result {
        None => Ok(LuaValue::Nil),
        Some(Value::Object(object)) => {
            let class = registry.find(object.class_name()).ok_or_else(|| {
                runtime_error(format!(
                    "method returned an unregistered class '{}'",
                    object.class_name()
                ))
            })?;
            let instance = ScriptInstance::from_return(registry, class, object.into_inner());
            Ok(LuaValue::UserData(lua.create_userdata(instance)?))
        }
        Some(scalar) => scalar_to_lua(&scalar).ok_or_else(|| {
            runtime_error(format!(
                "return of type '{}' has no Lua representation",
                scalar.type_name()
            ))
        }),
    }
}

fn class_info_table(lua: &Lua, class: &ClassDescriptor) -> LuaResult<Table> {
    let info = lua.create_table()?;
    info.set("name", class.name)?;
    info.set("hash", class.hash.to_string())?;

    let fields = lua.create_table()?;
    for (i, field) in class.fields.iter().enumerate() {
        let entry = lua.create_table()?;
        entry.set("name", field.name)?;
        entry.set("type", field.token.name)?;
        entry.set("size", field.size)?;
        entry.set("description", field.description)?;
        entry.set("min", field.min_value)?;
        entry.set("max", field.max_value)?;
        fields.set(i + 1, entry)?;
    }
    info.set("fields", fields)?;

    let methods = lua.create_table()?;
    for (i, method) in class.methods.iter().enumerate() {
        let entry = lua.create_table()?;
        entry.set("name", method.name)?;
        entry.set("signature", method.signature.as_str())?;
        entry.set("static", method.is_static())?;
        entry.set("argc", method.arg_count())?;
        entry.set("doc", method.doc)?;
        match method.return_type {
            Some(token) => entry.set("returns", token.name)?,
            None => entry.set("returns", LuaValue::Nil)?,
        }
        methods.set(i + 1, entry)?;
    }
    info.set("methods", methods)?;

    let constructors = lua.create_table()?;
    for (i, ctor) in class.constructors.iter().enumerate() {
        let entry = lua.create_table()?;
        entry.set("signature", ctor.signature.as_str())?;
        entry.set("argc", ctor.arg_count())?;
        constructors.set(i + 1, entry)?;
    }
    info.set("constructors", constructors)?;

    Ok(info)
}
