//! Instance userdata: a Lua-owned object of a registered class.
//!
//! Each userdata owns its instance outright. The Lua garbage collector
//! drops the userdata when it becomes unreachable, and the `Box` drop
//! glue releases the instance exactly once; no per-class finalizer
//! table is involved. Constructor-made and method-returned instances
//! carry an [`InstanceOrigin`] tag but are released identically.

use std::any::Any;

use mlua::{
    AnyUserData, Lua, MetaMethod, Result as LuaResult, UserData, UserDataMethods,
    Value as LuaValue, Variadic,
};

use mirror_core::{ClassDescriptor, MethodDescriptor};
use mirror_registry::ClassRegistry;

use crate::marshal::{invoke_checked, marshal_args, runtime_error, scalar_to_lua};

/// How an instance came to be owned by Lua.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceOrigin {
    /// Built by a constructor call from the script.
    Constructed,
    /// Returned by value from a reflected method.
    MethodReturn,
}

/// A Lua-owned instance of a registered class.
pub struct ScriptInstance {
    registry: &'static ClassRegistry,
    class: &'static ClassDescriptor,
    value: Box<dyn Any>,
    origin: InstanceOrigin,
}

impl ScriptInstance {
    pub(crate) fn constructed(
        registry: &'static ClassRegistry,
        class: &'static ClassDescriptor,
        value: Box<dyn Any>,
    ) -> Self {
        ScriptInstance {
            registry,
            class,
            value,
            origin: InstanceOrigin::Constructed,
        }
    }

    pub(crate) fn from_return(
        registry: &'static ClassRegistry,
        class: &'static ClassDescriptor,
        value: Box<dyn Any>,
    ) -> Self {
        ScriptInstance {
            registry,
            class,
            value,
            origin: InstanceOrigin::MethodReturn,
        }
    }

    pub fn class(&self) -> &'static ClassDescriptor {
        self.class
    }

    pub fn origin(&self) -> InstanceOrigin {
        self.origin
    }

    fn get_field(&self, name: &str) -> LuaResult<LuaValue> {
        let field = self.class.find_field(name).ok_or_else(|| {
            runtime_error(format!("'{}' is not a field of {}", name, self.class.name))
        })?;
        let value = field
            .get(self.value.as_ref())
            .map_err(|err| runtime_error(err.to_string()))?;
        scalar_to_lua(&value).ok_or_else(|| {
            runtime_error(format!("field '{}' has no Lua representation", name))
        })
    }

    fn set_field(&mut self, name: &str, value: &LuaValue) -> LuaResult<()> {
        let field = self.class.find_field(name).ok_or_else(|| {
            runtime_error(format!("'{}' is not a field of {}", name, self.class.name))
        })?;
        let value = crate::marshal::value_from_lua(value, &field.token)?;
        field
            .set(self.value.as_mut(), value)
            .map_err(|err| runtime_error(err.to_string()))
    }

    fn invoke_on(
        &mut self,
        lua: &Lua,
        method: &MethodDescriptor,
        args: &[LuaValue],
    ) -> LuaResult<LuaValue> {
        let values = marshal_args(args, &method.arg_types)?;
        let result = invoke_checked(method, Some(self.value.as_mut()), &values)?;
        crate::result_to_lua(lua, self.registry, result)
    }

    fn find_instance_method(&self, name: &str) -> LuaResult<&'static MethodDescriptor> {
        self.class.find_instance_method(name).ok_or_else(|| {
            runtime_error(format!(
                "'{}' is not an instance method of {}",
                name, self.class.name
            ))
        })
    }
}

impl UserData for ScriptInstance {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("get", |_, this, name: String| this.get_field(&name));

        methods.add_method_mut("set", |_, this, (name, value): (String, LuaValue)| {
            this.set_field(&name, &value)
        });

        methods.add_method_mut(
            "call",
            |lua, this, (name, args): (String, Variadic<LuaValue>)| {
                let method = this.find_instance_method(&name)?;
                this.invoke_on(lua, method, &args)
            },
        );

        methods.add_method_mut(
            "call_sig",
            |lua, this, (name, signature, args): (String, String, Variadic<LuaValue>)| {
                let class = this.class;
                let method = class
                    .find_method_with_signature(&signature)
                    .filter(|m| !m.is_static() && m.name == name)
                    .ok_or_else(|| {
                        runtime_error(format!(
                            "no instance method '{}' of {} with signature '{}'",
                            name, class.name, signature
                        ))
                    })?;
                this.invoke_on(lua, method, &args)
            },
        );

        methods.add_method("class_name", |_, this, ()| Ok(this.class.name));

        // `inst.field` reads; `inst:Method(...)` binds a trampoline.
        // Named methods above take precedence over this metamethod.
        methods.add_meta_method(MetaMethod::Index, |lua, this, key: String| {
            if this.class.find_field(&key).is_some() {
                return this.get_field(&key);
            }
            if this.class.find_instance_method(&key).is_some() {
                let trampoline = lua.create_function(
                    move |lua, (ud, args): (AnyUserData, Variadic<LuaValue>)| {
                        let mut this = ud.borrow_mut::<ScriptInstance>()?;
                        let method = this.find_instance_method(&key)?;
                        this.invoke_on(lua, method, &args)
                    },
                )?;
                return Ok(LuaValue::Function(trampoline));
            }
            Err(runtime_error(format!(
                "'{}' is not a field or method of {}",
                key, this.class.name
            )))
        });

        // `inst.field = v` writes.
        methods.add_meta_method_mut(
            MetaMethod::NewIndex,
            |_, this, (key, value): (String, LuaValue)| this.set_field(&key, &value),
        );
    }
}
