//! C ABI for the mirror reflection bridge.
//!
//! Exposes the process-wide registry to C callers through opaque
//! handles. The API follows these principles:
//!
//! - ABI-stable (only C-compatible types cross the boundary)
//! - Opaque pointers for descriptors, instances and values
//! - Lookup misses return NULL; invocation failures return NULL and
//!   set a thread-local error readable via [`mirror_last_error`]
//! - Panics in native code never unwind across the boundary
//! - Manual memory management: constructed instances are released with
//!   [`mirror_instance_destroy`], returned values with
//!   [`mirror_value_destroy`]
//!
//! # String lifetimes
//!
//! Every `*const c_char` returned by a string getter points into a
//! single buffer owned by the calling thread, valid until that
//! thread's next string getter call. Copy it out if it must outlive
//! the next call. [`mirror_kind_name`] is the exception: it returns a
//! static string that never moves.

use std::any::Any;
use std::cell::RefCell;
use std::ffi::{CStr, CString, c_char};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr;

use mirror_core::{
    CallError, ClassDescriptor, ConstructorDescriptor, FieldDescriptor, MethodDescriptor,
    TypeKind, Value,
};
use mirror_registry::global;

/// Kind slot value meaning "no kind": void returns, out-of-range
/// argument indexes, null handles.
pub const MIRROR_KIND_NONE: u32 = u32::MAX;

// ============================================================================
// Opaque Types
// ============================================================================

/// Opaque handle to a class descriptor.
#[repr(C)]
pub struct MirrorClass {
    _private: [u8; 0],
}

/// Opaque handle to a field descriptor.
#[repr(C)]
pub struct MirrorField {
    _private: [u8; 0],
}

/// Opaque handle to a method descriptor.
#[repr(C)]
pub struct MirrorMethod {
    _private: [u8; 0],
}

/// Opaque handle to a constructor descriptor.
#[repr(C)]
pub struct MirrorConstructor {
    _private: [u8; 0],
}

/// Opaque handle to an owned instance of a registered class.
#[repr(C)]
pub struct MirrorInstance {
    _private: [u8; 0],
}

/// Opaque handle to an owned tagged value.
#[repr(C)]
pub struct MirrorValue {
    _private: [u8; 0],
}

// Internal representation of an instance (not exposed to C).
// Box<dyn Any> is a fat pointer, so the handle wraps it in a sized
// struct before crossing the boundary.
struct InstanceHandle {
    value: Box<dyn Any>,
}

// ============================================================================
// Thread-local state
// ============================================================================

thread_local! {
    static STRING_BUF: RefCell<CString> = RefCell::new(CString::default());
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Copy `s` into the calling thread's string buffer and return a
/// pointer into it.
fn export_str(s: &str) -> *const c_char {
    STRING_BUF.with(|buf| {
        let mut slot = buf.borrow_mut();
        *slot = CString::new(s).unwrap_or_default();
        slot.as_ptr()
    })
}

fn set_last_error(message: &str) {
    LAST_ERROR.with(|slot| {
        *slot.borrow_mut() = Some(CString::new(message).unwrap_or_default());
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Handle helpers
// ============================================================================

unsafe fn class_ref<'a>(class: *const MirrorClass) -> Option<&'a ClassDescriptor> {
    unsafe { (class as *const ClassDescriptor).as_ref() }
}

unsafe fn field_ref<'a>(field: *const MirrorField) -> Option<&'a FieldDescriptor> {
    unsafe { (field as *const FieldDescriptor).as_ref() }
}

unsafe fn method_ref<'a>(method: *const MirrorMethod) -> Option<&'a MethodDescriptor> {
    unsafe { (method as *const MethodDescriptor).as_ref() }
}

unsafe fn constructor_ref<'a>(
    constructor: *const MirrorConstructor,
) -> Option<&'a ConstructorDescriptor> {
    unsafe { (constructor as *const ConstructorDescriptor).as_ref() }
}

unsafe fn value_ref<'a>(value: *const MirrorValue) -> Option<&'a Value> {
    unsafe { (value as *const Value).as_ref() }
}

unsafe fn instance_mut<'a>(instance: *mut MirrorInstance) -> Option<&'a mut InstanceHandle> {
    unsafe { (instance as *mut InstanceHandle).as_mut() }
}

fn class_handle(class: &ClassDescriptor) -> *const MirrorClass {
    class as *const ClassDescriptor as *const MirrorClass
}

fn value_handle(value: Value) -> *mut MirrorValue {
    Box::into_raw(Box::new(value)) as *mut MirrorValue
}

fn kind_slot(kind: Option<TypeKind>) -> u32 {
    kind.map_or(MIRROR_KIND_NONE, u32::from)
}

/// Parse a borrowed C string; `None` on null or invalid UTF-8.
unsafe fn parse_name<'a>(name: *const c_char) -> Option<&'a str> {
    if name.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(name) }.to_str().ok()
}

// ============================================================================
// Registry
// ============================================================================

/// Number of registered classes. 0 when no registry is installed.
#[unsafe(no_mangle)]
pub extern "C" fn mirror_class_count() -> usize {
    global::get().map_or(0, |registry| registry.len())
}

/// Class at a registration index, or NULL when out of range.
#[unsafe(no_mangle)]
pub extern "C" fn mirror_class_at(index: usize) -> *const MirrorClass {
    global::get()
        .and_then(|registry| registry.class_at(index))
        .map_or(ptr::null(), class_handle)
}

/// Look up a class by registered name, or NULL on miss.
///
/// # Safety
/// `name` must be NULL or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_find_class(name: *const c_char) -> *const MirrorClass {
    let Some(name) = (unsafe { parse_name(name) }) else {
        return ptr::null();
    };
    global::get()
        .and_then(|registry| registry.find(name))
        .map_or(ptr::null(), class_handle)
}

// ============================================================================
// Class queries
// ============================================================================

/// Class name. See the module docs for string lifetime rules.
///
/// # Safety
/// `class` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_class_name(class: *const MirrorClass) -> *const c_char {
    match unsafe { class_ref(class) } {
        Some(class) => export_str(class.name),
        None => ptr::null(),
    }
}

/// Stable identity hash of the class name. 0 for NULL.
///
/// # Safety
/// `class` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_class_hash(class: *const MirrorClass) -> u64 {
    unsafe { class_ref(class) }.map_or(0, |class| class.hash.as_u64())
}

/// # Safety
/// `class` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_class_field_count(class: *const MirrorClass) -> usize {
    unsafe { class_ref(class) }.map_or(0, |class| class.fields.len())
}

/// # Safety
/// `class` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_class_field_at(
    class: *const MirrorClass,
    index: usize,
) -> *const MirrorField {
    unsafe { class_ref(class) }
        .and_then(|class| class.fields.get(index))
        .map_or(ptr::null(), |field| {
            field as *const FieldDescriptor as *const MirrorField
        })
}

/// # Safety
/// `class` must be NULL or a handle obtained from this API; `name`
/// must be NULL or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_class_find_field(
    class: *const MirrorClass,
    name: *const c_char,
) -> *const MirrorField {
    let (Some(class), Some(name)) = (unsafe { class_ref(class) }, unsafe { parse_name(name) })
    else {
        return ptr::null();
    };
    class.find_field(name).map_or(ptr::null(), |field| {
        field as *const FieldDescriptor as *const MirrorField
    })
}

/// # Safety
/// `class` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_class_method_count(class: *const MirrorClass) -> usize {
    unsafe { class_ref(class) }.map_or(0, |class| class.methods.len())
}

/// # Safety
/// `class` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_class_method_at(
    class: *const MirrorClass,
    index: usize,
) -> *const MirrorMethod {
    unsafe { class_ref(class) }
        .and_then(|class| class.methods.get(index))
        .map_or(ptr::null(), |method| {
            method as *const MethodDescriptor as *const MirrorMethod
        })
}

/// First method with the given name, static or not. Declaration order
/// decides among overloads; use [`mirror_class_find_method_sig`] to
/// pick a specific one.
///
/// # Safety
/// `class` must be NULL or a handle obtained from this API; `name`
/// must be NULL or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_class_find_method(
    class: *const MirrorClass,
    name: *const c_char,
) -> *const MirrorMethod {
    let (Some(class), Some(name)) = (unsafe { class_ref(class) }, unsafe { parse_name(name) })
    else {
        return ptr::null();
    };
    class.find_method(name).map_or(ptr::null(), |method| {
        method as *const MethodDescriptor as *const MirrorMethod
    })
}

/// Method with an exact rendered signature such as `"Add(u8)"`.
///
/// # Safety
/// `class` must be NULL or a handle obtained from this API;
/// `signature` must be NULL or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_class_find_method_sig(
    class: *const MirrorClass,
    signature: *const c_char,
) -> *const MirrorMethod {
    let (Some(class), Some(signature)) =
        (unsafe { class_ref(class) }, unsafe { parse_name(signature) })
    else {
        return ptr::null();
    };
    class
        .find_method_with_signature(signature)
        .map_or(ptr::null(), |method| {
            method as *const MethodDescriptor as *const MirrorMethod
        })
}

/// # Safety
/// `class` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_class_constructor_count(class: *const MirrorClass) -> usize {
    unsafe { class_ref(class) }.map_or(0, |class| class.constructors.len())
}

/// # Safety
/// `class` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_class_constructor_at(
    class: *const MirrorClass,
    index: usize,
) -> *const MirrorConstructor {
    unsafe { class_ref(class) }
        .and_then(|class| class.constructors.get(index))
        .map_or(ptr::null(), |ctor| {
            ctor as *const ConstructorDescriptor as *const MirrorConstructor
        })
}

/// First constructor taking `argc` arguments.
///
/// # Safety
/// `class` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_class_find_constructor(
    class: *const MirrorClass,
    argc: usize,
) -> *const MirrorConstructor {
    unsafe { class_ref(class) }
        .and_then(|class| class.find_constructor_by_arity(argc))
        .map_or(ptr::null(), |ctor| {
            ctor as *const ConstructorDescriptor as *const MirrorConstructor
        })
}

/// Constructor with an exact rendered signature such as
/// `"RGBColor(u8,u8,u8)"`.
///
/// # Safety
/// `class` must be NULL or a handle obtained from this API;
/// `signature` must be NULL or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_class_find_constructor_sig(
    class: *const MirrorClass,
    signature: *const c_char,
) -> *const MirrorConstructor {
    let (Some(class), Some(signature)) =
        (unsafe { class_ref(class) }, unsafe { parse_name(signature) })
    else {
        return ptr::null();
    };
    class
        .find_constructor_by_signature(signature)
        .map_or(ptr::null(), |ctor| {
            ctor as *const ConstructorDescriptor as *const MirrorConstructor
        })
}

// ============================================================================
// Field queries and access
// ============================================================================

/// # Safety
/// `field` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_field_name(field: *const MirrorField) -> *const c_char {
    match unsafe { field_ref(field) } {
        Some(field) => export_str(field.name),
        None => ptr::null(),
    }
}

/// # Safety
/// `field` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_field_description(field: *const MirrorField) -> *const c_char {
    match unsafe { field_ref(field) } {
        Some(field) => export_str(field.description),
        None => ptr::null(),
    }
}

/// Kind tag of the field, or [`MIRROR_KIND_NONE`] for NULL.
///
/// # Safety
/// `field` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_field_kind(field: *const MirrorField) -> u32 {
    kind_slot(unsafe { field_ref(field) }.map(|field| field.token.kind))
}

/// Display name of the field's type: kind name for scalars, class name
/// for objects.
///
/// # Safety
/// `field` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_field_type_name(field: *const MirrorField) -> *const c_char {
    match unsafe { field_ref(field) } {
        Some(field) => export_str(field.token.name),
        None => ptr::null(),
    }
}

/// # Safety
/// `field` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_field_size(field: *const MirrorField) -> usize {
    unsafe { field_ref(field) }.map_or(0, |field| field.size)
}

/// # Safety
/// `field` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_field_min(field: *const MirrorField) -> f64 {
    unsafe { field_ref(field) }.map_or(0.0, |field| field.min_value)
}

/// # Safety
/// `field` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_field_max(field: *const MirrorField) -> f64 {
    unsafe { field_ref(field) }.map_or(0.0, |field| field.max_value)
}

/// Read a field out of an instance. Returns an owned value handle, or
/// NULL with [`mirror_last_error`] set.
///
/// # Safety
/// `field` and `instance` must be NULL or handles obtained from this
/// API. The returned value must be freed with [`mirror_value_destroy`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_field_get(
    field: *const MirrorField,
    instance: *mut MirrorInstance,
) -> *mut MirrorValue {
    clear_last_error();
    let (Some(field), Some(handle)) =
        (unsafe { field_ref(field) }, unsafe { instance_mut(instance) })
    else {
        set_last_error("null field or instance handle");
        return ptr::null_mut();
    };
    match field.get(handle.value.as_ref()) {
        Ok(value) => value_handle(value),
        Err(err) => {
            set_last_error(&err.to_string());
            ptr::null_mut()
        }
    }
}

/// Store a value into an instance's field. The value handle is only
/// read, not consumed. Returns false with [`mirror_last_error`] set on
/// failure.
///
/// # Safety
/// All handles must be NULL or obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_field_set(
    field: *const MirrorField,
    instance: *mut MirrorInstance,
    value: *const MirrorValue,
) -> bool {
    clear_last_error();
    let (Some(field), Some(handle), Some(value)) = (
        unsafe { field_ref(field) },
        unsafe { instance_mut(instance) },
        unsafe { value_ref(value) },
    ) else {
        set_last_error("null field, instance or value handle");
        return false;
    };
    let Some(owned) = value.clone_scalar() else {
        set_last_error(&CallError::UnsupportedType(value.type_name().to_string()).to_string());
        return false;
    };
    match field.set(handle.value.as_mut(), owned) {
        Ok(()) => true,
        Err(err) => {
            set_last_error(&err.to_string());
            false
        }
    }
}

// ============================================================================
// Method queries and invocation
// ============================================================================

/// # Safety
/// `method` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_method_name(method: *const MirrorMethod) -> *const c_char {
    match unsafe { method_ref(method) } {
        Some(method) => export_str(method.name),
        None => ptr::null(),
    }
}

/// # Safety
/// `method` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_method_doc(method: *const MirrorMethod) -> *const c_char {
    match unsafe { method_ref(method) } {
        Some(method) => export_str(method.doc),
        None => ptr::null(),
    }
}

/// Rendered signature, e.g. `"Add(u8)"`.
///
/// # Safety
/// `method` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_method_signature(method: *const MirrorMethod) -> *const c_char {
    match unsafe { method_ref(method) } {
        Some(method) => export_str(&method.signature),
        None => ptr::null(),
    }
}

/// # Safety
/// `method` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_method_is_static(method: *const MirrorMethod) -> bool {
    unsafe { method_ref(method) }.is_some_and(|method| method.is_static())
}

/// # Safety
/// `method` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_method_arg_count(method: *const MirrorMethod) -> usize {
    unsafe { method_ref(method) }.map_or(0, |method| method.arg_count())
}

/// Kind tag of argument `index`, or [`MIRROR_KIND_NONE`] when out of
/// range.
///
/// # Safety
/// `method` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_method_arg_kind(method: *const MirrorMethod, index: usize) -> u32 {
    kind_slot(
        unsafe { method_ref(method) }
            .and_then(|method| method.arg_types.get(index))
            .map(|token| token.kind),
    )
}

/// Display name of argument `index`'s type, or NULL when out of range.
///
/// # Safety
/// `method` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_method_arg_type_name(
    method: *const MirrorMethod,
    index: usize,
) -> *const c_char {
    match unsafe { method_ref(method) }.and_then(|method| method.arg_types.get(index)) {
        Some(token) => export_str(token.name),
        None => ptr::null(),
    }
}

/// Kind tag of the return type, or [`MIRROR_KIND_NONE`] for void.
///
/// # Safety
/// `method` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_method_return_kind(method: *const MirrorMethod) -> u32 {
    kind_slot(
        unsafe { method_ref(method) }
            .and_then(|method| method.return_type)
            .map(|token| token.kind),
    )
}

/// Display name of the return type, or NULL for void.
///
/// # Safety
/// `method` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_method_return_type_name(
    method: *const MirrorMethod,
) -> *const c_char {
    match unsafe { method_ref(method) }.and_then(|method| method.return_type) {
        Some(token) => export_str(token.name),
        None => ptr::null(),
    }
}

/// Invoke a method.
///
/// `instance` is ignored for static methods and required otherwise.
/// Arguments are scalar value handles; their ownership stays with the
/// caller. Returns an owned value handle, NULL for void, or NULL with
/// [`mirror_last_error`] set on failure (check the error to tell the
/// two apart). Panics in the target are contained and reported as an
/// invocation fault.
///
/// # Safety
/// All handles must be NULL or obtained from this API; `argv` must
/// point to at least `argc` value handles when `argc > 0`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_method_invoke(
    method: *const MirrorMethod,
    instance: *mut MirrorInstance,
    argv: *const *const MirrorValue,
    argc: usize,
) -> *mut MirrorValue {
    clear_last_error();
    let Some(method) = (unsafe { method_ref(method) }) else {
        set_last_error("null method handle");
        return ptr::null_mut();
    };

    let mut args = Vec::with_capacity(argc);
    for i in 0..argc {
        let slot = if argv.is_null() {
            ptr::null()
        } else {
            unsafe { *argv.add(i) }
        };
        let Some(value) = (unsafe { value_ref(slot) }) else {
            set_last_error("null argument value handle");
            return ptr::null_mut();
        };
        let Some(owned) = value.clone_scalar() else {
            set_last_error(
                &CallError::UnsupportedType(value.type_name().to_string()).to_string(),
            );
            return ptr::null_mut();
        };
        args.push(owned);
    }

    let receiver: Option<&mut dyn Any> = if method.is_static() {
        None
    } else {
        match unsafe { instance_mut(instance) } {
            Some(handle) => Some(handle.value.as_mut()),
            None => {
                set_last_error(&CallError::MissingReceiver.to_string());
                return ptr::null_mut();
            }
        }
    };

    match catch_unwind(AssertUnwindSafe(|| method.invoke(receiver, &args))) {
        Ok(Ok(Some(value))) => value_handle(value),
        Ok(Ok(None)) => ptr::null_mut(),
        Ok(Err(err)) => {
            set_last_error(&err.to_string());
            ptr::null_mut()
        }
        Err(payload) => {
            set_last_error(&CallError::BoundaryFault(panic_message(payload)).to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Constructor queries and invocation
// ============================================================================

/// Rendered signature, e.g. `"RGBColor(u8,u8,u8)"`.
///
/// # Safety
/// `constructor` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_constructor_signature(
    constructor: *const MirrorConstructor,
) -> *const c_char {
    match unsafe { constructor_ref(constructor) } {
        Some(ctor) => export_str(&ctor.signature),
        None => ptr::null(),
    }
}

/// # Safety
/// `constructor` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_constructor_arg_count(
    constructor: *const MirrorConstructor,
) -> usize {
    unsafe { constructor_ref(constructor) }.map_or(0, |ctor| ctor.arg_count())
}

/// Kind tag of argument `index`, or [`MIRROR_KIND_NONE`] when out of
/// range.
///
/// # Safety
/// `constructor` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_constructor_arg_kind(
    constructor: *const MirrorConstructor,
    index: usize,
) -> u32 {
    kind_slot(
        unsafe { constructor_ref(constructor) }
            .and_then(|ctor| ctor.arg_types.get(index))
            .map(|token| token.kind),
    )
}

/// Construct a fresh instance. Returns an owned instance handle, or
/// NULL with [`mirror_last_error`] set. Panics in the constructor are
/// contained and reported as an invocation fault.
///
/// # Safety
/// All handles must be NULL or obtained from this API; `argv` must
/// point to at least `argc` value handles when `argc > 0`. The
/// returned instance must be freed with [`mirror_instance_destroy`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_constructor_invoke(
    constructor: *const MirrorConstructor,
    argv: *const *const MirrorValue,
    argc: usize,
) -> *mut MirrorInstance {
    clear_last_error();
    let Some(ctor) = (unsafe { constructor_ref(constructor) }) else {
        set_last_error("null constructor handle");
        return ptr::null_mut();
    };

    let mut args = Vec::with_capacity(argc);
    for i in 0..argc {
        let slot = if argv.is_null() {
            ptr::null()
        } else {
            unsafe { *argv.add(i) }
        };
        let Some(value) = (unsafe { value_ref(slot) }) else {
            set_last_error("null argument value handle");
            return ptr::null_mut();
        };
        let Some(owned) = value.clone_scalar() else {
            set_last_error(
                &CallError::UnsupportedType(value.type_name().to_string()).to_string(),
            );
            return ptr::null_mut();
        };
        args.push(owned);
    }

    match catch_unwind(AssertUnwindSafe(|| ctor.invoke(&args))) {
        Ok(Ok(value)) => Box::into_raw(Box::new(InstanceHandle { value })) as *mut MirrorInstance,
        Ok(Err(err)) => {
            set_last_error(&err.to_string());
            ptr::null_mut()
        }
        Err(payload) => {
            set_last_error(&CallError::BoundaryFault(panic_message(payload)).to_string());
            ptr::null_mut()
        }
    }
}

/// Destroy an instance created by [`mirror_constructor_invoke`].
/// NULL is a no-op.
///
/// # Safety
/// `instance` must be NULL or an owned handle from this API, not yet
/// destroyed; it must not be used after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_instance_destroy(instance: *mut MirrorInstance) {
    if instance.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(instance as *mut InstanceHandle) });
}

// ============================================================================
// Values
// ============================================================================

/// Create a boolean value handle.
#[unsafe(no_mangle)]
pub extern "C" fn mirror_value_new_bool(value: bool) -> *mut MirrorValue {
    value_handle(Value::Bool(value))
}

/// Create an integer value handle of the given kind. Out-of-range
/// input truncates like a C cast; non-integer kinds return NULL.
#[unsafe(no_mangle)]
pub extern "C" fn mirror_value_new_int(kind: u32, value: i64) -> *mut MirrorValue {
    let Ok(kind) = TypeKind::try_from(kind) else {
        return ptr::null_mut();
    };
    let value = match kind {
        TypeKind::I8 => Value::I8(value as i8),
        TypeKind::U8 => Value::U8(value as u8),
        TypeKind::I16 => Value::I16(value as i16),
        TypeKind::U16 => Value::U16(value as u16),
        TypeKind::I32 => Value::I32(value as i32),
        TypeKind::U32 => Value::U32(value as u32),
        TypeKind::I64 => Value::I64(value),
        TypeKind::U64 => Value::U64(value as u64),
        _ => return ptr::null_mut(),
    };
    value_handle(value)
}

/// Create an unsigned integer value handle of the given kind, exact
/// across the full u64 range. Out-of-range input truncates like a C
/// cast; non-unsigned kinds return NULL.
#[unsafe(no_mangle)]
pub extern "C" fn mirror_value_new_uint(kind: u32, value: u64) -> *mut MirrorValue {
    let Ok(kind) = TypeKind::try_from(kind) else {
        return ptr::null_mut();
    };
    let value = match kind {
        TypeKind::U8 => Value::U8(value as u8),
        TypeKind::U16 => Value::U16(value as u16),
        TypeKind::U32 => Value::U32(value as u32),
        TypeKind::U64 => Value::U64(value),
        _ => return ptr::null_mut(),
    };
    value_handle(value)
}

/// Create a float value handle of the given kind. Non-float kinds
/// return NULL.
#[unsafe(no_mangle)]
pub extern "C" fn mirror_value_new_float(kind: u32, value: f64) -> *mut MirrorValue {
    match TypeKind::try_from(kind) {
        Ok(TypeKind::F32) => value_handle(Value::F32(value as f32)),
        Ok(TypeKind::F64) => value_handle(Value::F64(value)),
        _ => ptr::null_mut(),
    }
}

/// Kind tag of a value, or [`MIRROR_KIND_NONE`] for NULL.
///
/// # Safety
/// `value` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_value_kind(value: *const MirrorValue) -> u32 {
    kind_slot(unsafe { value_ref(value) }.map(|value| value.kind()))
}

/// Display name of a value's type: kind name for scalars, class name
/// for objects.
///
/// # Safety
/// `value` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_value_type_name(value: *const MirrorValue) -> *const c_char {
    match unsafe { value_ref(value) } {
        Some(value) => export_str(value.type_name()),
        None => ptr::null(),
    }
}

/// Integer payload widened to i64; 0 for non-integer values.
///
/// # Safety
/// `value` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_value_as_int(value: *const MirrorValue) -> i64 {
    unsafe { value_ref(value) }.and_then(|value| value.as_i64()).unwrap_or(0)
}

/// Integer payload reinterpreted as u64 (two's complement for signed
/// values); 0 for non-integer values. Exact for `U64` payloads, which
/// [`mirror_value_as_int`] cannot represent above `i64::MAX`.
///
/// # Safety
/// `value` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_value_as_uint(value: *const MirrorValue) -> u64 {
    unsafe { value_ref(value) }
        .and_then(|value| value.as_i64())
        .map_or(0, |v| v as u64)
}

/// Float payload widened to f64; 0.0 for non-float values.
///
/// # Safety
/// `value` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_value_as_float(value: *const MirrorValue) -> f64 {
    unsafe { value_ref(value) }.and_then(|value| value.as_f64()).unwrap_or(0.0)
}

/// Boolean payload; false for non-boolean values.
///
/// # Safety
/// `value` must be NULL or a handle obtained from this API.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_value_as_bool(value: *const MirrorValue) -> bool {
    unsafe { value_ref(value) }.and_then(|value| value.as_bool()).unwrap_or(false)
}

/// Destroy an owned value handle (method returns, field reads, or
/// values created by the `mirror_value_new_*` family). NULL is a
/// no-op.
///
/// # Safety
/// `value` must be NULL or an owned handle from this API, not yet
/// destroyed; it must not be used after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mirror_value_destroy(value: *mut MirrorValue) {
    if value.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(value as *mut Value) });
}

// ============================================================================
// Misc
// ============================================================================

/// Static name of a kind tag, or NULL for an unknown tag. Unlike the
/// other string getters, the returned pointer never moves.
#[unsafe(no_mangle)]
pub extern "C" fn mirror_kind_name(kind: u32) -> *const c_char {
    let name: &'static CStr = match TypeKind::try_from(kind) {
        Ok(TypeKind::Bool) => c"bool",
        Ok(TypeKind::I8) => c"i8",
        Ok(TypeKind::U8) => c"u8",
        Ok(TypeKind::I16) => c"i16",
        Ok(TypeKind::U16) => c"u16",
        Ok(TypeKind::I32) => c"i32",
        Ok(TypeKind::U32) => c"u32",
        Ok(TypeKind::I64) => c"i64",
        Ok(TypeKind::U64) => c"u64",
        Ok(TypeKind::F32) => c"f32",
        Ok(TypeKind::F64) => c"f64",
        Ok(TypeKind::Object) => c"object",
        Err(_) => return ptr::null(),
    };
    name.as_ptr()
}

/// Message of the last failure on the calling thread, or NULL when the
/// last call succeeded. Valid until the next fallible call on this
/// thread.
#[unsafe(no_mangle)]
pub extern "C" fn mirror_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(ptr::null(), |message| message.as_ptr())
    })
}
