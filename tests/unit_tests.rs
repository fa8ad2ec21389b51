//! End-to-end tests for the reflection bridge: descriptors and thunks,
//! the process-wide registry, the C ABI, and the Lua adapter, all
//! against the same registered classes.

use std::ffi::{CStr, CString};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;

use mirror::capi;
use mirror::lua::mlua::Lua;
use mirror::prelude::*;

// =============================================================================
// Fixture classes
// =============================================================================

struct RGBColor {
    r: u8,
    g: u8,
    b: u8,
}

impl Reflect for RGBColor {
    const CLASS_NAME: &'static str = "RGBColor";

    fn describe() -> ClassDescriptor {
        ClassDescriptor::new(Self::CLASS_NAME)
            .with_constructor(thunk::constructor::<RGBColor, _, _>(|| RGBColor {
                r: 0,
                g: 0,
                b: 0,
            }))
            .with_constructor(thunk::constructor::<RGBColor, _, _>(
                |r: u8, g: u8, b: u8| RGBColor { r, g, b },
            ))
            .with_field(thunk::field(
                "r",
                "red channel",
                0.0,
                255.0,
                |c: &RGBColor| &c.r,
                |c: &mut RGBColor| &mut c.r,
            ))
            .with_field(thunk::field(
                "g",
                "green channel",
                0.0,
                255.0,
                |c: &RGBColor| &c.g,
                |c: &mut RGBColor| &mut c.g,
            ))
            .with_field(thunk::field(
                "b",
                "blue channel",
                0.0,
                255.0,
                |c: &RGBColor| &c.b,
                |c: &mut RGBColor| &mut c.b,
            ))
            .with_method(thunk::method(
                "Add",
                "brighten every channel, saturating",
                |c: &RGBColor, amount: u8| RGBColor {
                    r: c.r.saturating_add(amount),
                    g: c.g.saturating_add(amount),
                    b: c.b.saturating_add(amount),
                },
            ))
            .with_method(thunk::method(
                "Scale",
                "multiply every channel",
                |c: &mut RGBColor, factor: f32| {
                    c.r = (c.r as f32 * factor) as u8;
                    c.g = (c.g as f32 * factor) as u8;
                    c.b = (c.b as f32 * factor) as u8;
                },
            ))
            .with_method(thunk::static_method("Depth", "bits per channel", || 8u8))
    }
}

impl_reflect_value!(RGBColor);

struct Gauge {
    level: f64,
}

impl Reflect for Gauge {
    const CLASS_NAME: &'static str = "Gauge";

    fn describe() -> ClassDescriptor {
        // Two single-argument constructors with different kinds:
        // arity lookup is ambiguous by design, signatures are not.
        ClassDescriptor::new(Self::CLASS_NAME)
            .with_constructor(thunk::constructor::<Gauge, _, _>(|level: f64| Gauge { level }))
            .with_constructor(thunk::constructor::<Gauge, _, _>(|percent: i32| Gauge {
                level: percent as f64 / 100.0,
            }))
            .with_field(thunk::field(
                "level",
                "fill level",
                0.0,
                1.0,
                |g: &Gauge| &g.level,
                |g: &mut Gauge| &mut g.level,
            ))
            .with_method(thunk::method("Split", "halve the gauge", |g: &Gauge| Gauge {
                level: g.level / 2.0,
            }))
    }
}

impl_reflect_value!(Gauge);

// Only lua_gc_balances_construction touches this class; the counter
// must not be shared with classes other parallel tests construct.
struct Tracked;

static TRACKED_LIVE: AtomicUsize = AtomicUsize::new(0);

impl Drop for Tracked {
    fn drop(&mut self) {
        TRACKED_LIVE.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Tracked {
    fn new() -> Self {
        TRACKED_LIVE.fetch_add(1, Ordering::SeqCst);
        Tracked
    }
}

impl Reflect for Tracked {
    const CLASS_NAME: &'static str = "Tracked";

    fn describe() -> ClassDescriptor {
        ClassDescriptor::new(Self::CLASS_NAME)
            .with_constructor(thunk::constructor::<Tracked, _, _>(Tracked::new))
            .with_method(thunk::method("Spawn", "another one", |_t: &Tracked| Tracked::new()))
    }
}

impl_reflect_value!(Tracked);

fn fixture() -> &'static ClassRegistry {
    global::install_with(|| {
        ClassRegistry::builder()
            .register::<RGBColor>()
            .register::<Gauge>()
            .register::<Tracked>()
            .build()
    })
}

// =============================================================================
// Native layer
// =============================================================================

#[test]
fn native_rgb_scenario() {
    let registry = fixture();
    let class = registry.find("RGBColor").unwrap();

    let ctor = class.find_constructor_by_signature("RGBColor(u8,u8,u8)").unwrap();
    let mut color = ctor
        .invoke(&[Value::U8(10), Value::U8(20), Value::U8(30)])
        .unwrap();

    let add = class.find_instance_method("Add").unwrap();
    let brighter = add.invoke(Some(color.as_mut()), &[Value::U8(15)]).unwrap().unwrap();

    let Value::Object(object) = brighter else {
        panic!("Add should return an object");
    };
    assert_eq!(object.class_name(), "RGBColor");
    let brighter = object.downcast::<RGBColor>().ok().unwrap();
    assert_eq!((brighter.r, brighter.g, brighter.b), (25, 35, 45));

    // The receiver is unchanged.
    let original = color.downcast_ref::<RGBColor>().unwrap();
    assert_eq!((original.r, original.g, original.b), (10, 20, 30));
}

#[test]
fn native_mut_method_and_field_access() {
    let registry = fixture();
    let class = registry.find("RGBColor").unwrap();
    let ctor = class.find_constructor_by_arity(3).unwrap();
    let mut color = ctor
        .invoke(&[Value::U8(100), Value::U8(50), Value::U8(10)])
        .unwrap();

    let scale = class.find_instance_method("Scale").unwrap();
    assert!(scale.invoke(Some(color.as_mut()), &[Value::F32(0.5)]).unwrap().is_none());

    let r_field = class.find_field("r").unwrap();
    let r = r_field.get(color.as_ref()).unwrap();
    assert!(matches!(r, Value::U8(50)));

    r_field.set(color.as_mut(), Value::U8(7)).unwrap();
    assert_eq!(color.downcast_ref::<RGBColor>().unwrap().r, 7);
}

#[test]
fn native_overload_resolution_by_signature() {
    let registry = fixture();
    let class = registry.find("Gauge").unwrap();

    // Arity alone would always pick the first declaration.
    let by_arity = class.find_constructor_by_arity(1).unwrap();
    assert_eq!(by_arity.signature, "Gauge(f64)");

    let by_percent = class.find_constructor_by_signature("Gauge(i32)").unwrap();
    let gauge = by_percent.invoke(&[Value::I32(50)]).unwrap();
    assert_eq!(gauge.downcast_ref::<Gauge>().unwrap().level, 0.5);
}

#[test]
fn native_registry_queries() {
    let registry = fixture();
    assert_eq!(registry.len(), 3);
    assert_eq!(registry.classes()[0].name, "RGBColor");
    assert!(registry.find("NoSuchClass").is_none());

    let class = registry.find("RGBColor").unwrap();
    assert_eq!(class.hash, TypeHash::from_name("RGBColor"));
    assert_eq!(class.find_field("g").unwrap().token.kind, TypeKind::U8);
    assert!(class.find_static_method("Depth").is_some());
    assert!(class.find_instance_method("Depth").is_none());
}

// =============================================================================
// C ABI layer
// =============================================================================

#[test]
fn capi_rgb_scenario() {
    fixture();
    let name = CString::new("RGBColor").unwrap();
    let class = unsafe { capi::mirror_find_class(name.as_ptr()) };
    assert!(!class.is_null());

    let sig = CString::new("RGBColor(u8,u8,u8)").unwrap();
    let ctor = unsafe { capi::mirror_class_find_constructor_sig(class, sig.as_ptr()) };
    let u8_kind = u32::from(TypeKind::U8);
    let argv = [
        capi::mirror_value_new_int(u8_kind, 10) as *const capi::MirrorValue,
        capi::mirror_value_new_int(u8_kind, 20) as *const capi::MirrorValue,
        capi::mirror_value_new_int(u8_kind, 30) as *const capi::MirrorValue,
    ];
    let instance = unsafe { capi::mirror_constructor_invoke(ctor, argv.as_ptr(), 3) };
    for arg in argv {
        unsafe { capi::mirror_value_destroy(arg as *mut capi::MirrorValue) };
    }
    assert!(!instance.is_null());

    let add_sig = CString::new("Add(u8)").unwrap();
    let add = unsafe { capi::mirror_class_find_method_sig(class, add_sig.as_ptr()) };
    let amount = capi::mirror_value_new_int(u8_kind, 15);
    let argv = [amount as *const capi::MirrorValue];
    let result = unsafe { capi::mirror_method_invoke(add, instance, argv.as_ptr(), 1) };
    unsafe { capi::mirror_value_destroy(amount) };

    assert!(!result.is_null());
    unsafe {
        assert_eq!(capi::mirror_value_kind(result), u32::from(TypeKind::Object));
        assert_eq!(
            CStr::from_ptr(capi::mirror_value_type_name(result)).to_str(),
            Ok("RGBColor")
        );
        capi::mirror_value_destroy(result);
        capi::mirror_instance_destroy(instance);
    }
}

#[test]
fn capi_reports_errors_without_unwinding() {
    fixture();
    let name = CString::new("RGBColor").unwrap();
    let class = unsafe { capi::mirror_find_class(name.as_ptr()) };
    let add_name = CString::new("Add").unwrap();
    let add = unsafe { capi::mirror_class_find_method(class, add_name.as_ptr()) };

    // Instance method without a receiver.
    let result = unsafe { capi::mirror_method_invoke(add, ptr::null_mut(), ptr::null(), 0) };
    assert!(result.is_null());
    let message = unsafe { CStr::from_ptr(capi::mirror_last_error()) }.to_str().unwrap();
    assert!(message.contains("missing receiver"));
}

// =============================================================================
// Lua layer
// =============================================================================

#[test]
fn lua_rgb_scenario() -> Result<()> {
    let registry = fixture();
    let lua = Lua::new();
    mirror::lua::install(&lua, registry)?;

    lua.load(
        r#"
        local c = mirror.new("RGBColor", 10, 20, 30)
        local brighter = c:Add(15)
        assert(brighter.r == 25)
        assert(brighter.g == 35)
        assert(brighter.b == 45)
        assert(c.r == 10)

        c:Scale(0.5)
        assert(c.r == 5)

        assert(mirror.call_static("RGBColor", "Depth") == 8)
    "#,
    )
    .exec()?;
    Ok(())
}

#[test]
fn lua_constructor_disambiguation_and_info() -> Result<()> {
    let registry = fixture();
    let lua = Lua::new();
    mirror::lua::install(&lua, registry)?;

    lua.load(
        r#"
        local a = mirror.new_sig("Gauge", "Gauge(f64)", 0.75)
        assert(a.level == 0.75)

        local b = mirror.new_sig("Gauge", "Gauge(i32)", 75)
        assert(b.level == 0.75)

        local info = mirror.class_info("Gauge")
        assert(#info.constructors == 2)
        assert(info.constructors[2].signature == "Gauge(i32)")
        assert(info.constructors[2].argc == 1)
        assert(info.fields[1].name == "level")
        assert(info.fields[1].size == 8)
        assert(info.methods[1].argc == 0)
    "#,
    )
    .exec()?;
    Ok(())
}

#[test]
fn lua_gc_balances_construction() -> Result<()> {
    let registry = fixture();
    let lua = Lua::new();
    mirror::lua::install(&lua, registry)?;

    let before = TRACKED_LIVE.load(Ordering::SeqCst);
    lua.load(
        r#"
        local t = mirror.new("Tracked")
        local s = t:Spawn()
        t, s = nil, nil
    "#,
    )
    .exec()?;
    lua.gc_collect()?;
    lua.gc_collect()?;

    // Both the constructed and the method-returned instance are gone.
    assert_eq!(TRACKED_LIVE.load(Ordering::SeqCst), before);
    Ok(())
}
