//! Purpose: C ABI bridge for separately compiled hosts and plugins (libplantstore).
//! Exports: C-callable store/plant/leaf functions plus string and list free helpers.
//! Role: Stable ABI surface; every fallible call returns a code from `ErrorKind::code`.
//! Invariants: Opaque store handle; plants are `uint64_t` ids with 0 as null.
//! Invariants: Every allocation handed to C has an explicit free function.
//! Invariants: Probes never fail; invalid input yields 0 / empty results.
//! Invariants: Keys and string elements cross the boundary as raw bytes, never re-encoded.
#![allow(non_camel_case_types)]

use crate::api::{
    BString, BoundedAllocator, Error, ErrorKind, FuncPtr, LeafFlags, PlantId, SEED_INVALID, SUCCESS_CODE,
    SeedType, Store, Value, Values, VoidPtr,
};
use std::ffi::{CStr, CString, c_void};
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

pub struct pst_store {
    store: Store,
}

#[unsafe(no_mangle)]
pub extern "C" fn pst_store_new() -> *mut pst_store {
    Box::into_raw(Box::new(pst_store {
        store: Store::new(),
    }))
}

/// Store whose accounted footprint may never exceed `limit` bytes.
#[unsafe(no_mangle)]
pub extern "C" fn pst_store_new_bounded(limit: u64) -> *mut pst_store {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    Box::into_raw(Box::new(pst_store {
        store: Store::with_allocator(Arc::new(BoundedAllocator::new(limit))),
    }))
}

/// Frees the store and every plant still inside it.
#[unsafe(no_mangle)]
pub extern "C" fn pst_store_free(store: *mut pst_store) {
    if store.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(store));
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn pst_store_bytes_in_use(store: *const pst_store) -> u64 {
    peek_store(store)
        .map(|store| store.allocator().in_use() as u64)
        .unwrap_or(0)
}

#[unsafe(no_mangle)]
pub extern "C" fn pst_plant_new(store: *mut pst_store, plant_type: i32, out_plant: *mut u64) -> i32 {
    let store = match borrow_store(store) {
        Ok(store) => store,
        Err(code) => return code,
    };
    if out_plant.is_null() {
        return fail(Error::new(ErrorKind::NoSuchPlant).with_message("out_plant is null"));
    }
    match store.plant_new(plant_type) {
        Ok(plant) => {
            unsafe {
                *out_plant = plant.raw();
            }
            SUCCESS_CODE
        }
        Err(err) => fail(err),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn pst_plant_free(store: *mut pst_store, plant: u64) -> i32 {
    let store = match borrow_store(store) {
        Ok(store) => store,
        Err(code) => return code,
    };
    status(store.plant_free(PlantId::from_raw(plant)))
}

/// Replaces the cell of `key` with `num_elems` elements read from `values`.
///
/// Element layout by seed: `int32_t` for INT and BOOLEAN, `double`, `int64_t`,
/// `uint32_t`, `uint64_t`, `const char *` for STRING (NULL reads as "", bytes
/// are kept verbatim),
/// `void *` for VOIDPTR and FUNCPTR, `uint64_t` plant ids for PLANTPTR.
#[unsafe(no_mangle)]
pub extern "C" fn pst_leaf_set(
    store: *mut pst_store,
    plant: u64,
    key: *const c_char,
    seed_type: i32,
    num_elems: usize,
    values: *const c_void,
) -> i32 {
    let store = match borrow_store(store) {
        Ok(store) => store,
        Err(code) => return code,
    };
    let plant = PlantId::from_raw(plant);
    if !store.is_live(plant) {
        return fail(Error::new(ErrorKind::NoSuchPlant).with_plant(plant.raw()));
    }
    let key = match parse_key(key) {
        Ok(key) => key,
        Err(code) => return code,
    };
    let Some(seed) = SeedType::from_code(seed_type) else {
        return fail(
            Error::new(ErrorKind::WrongSeedType)
                .with_message(format!("unknown seed type {seed_type}"))
                .with_key(key),
        );
    };
    let values = unsafe { read_values(seed, num_elems, values) };
    status(store.set_values(plant, key, values))
}

/// Copies element `idx` into `out_value`, laid out as for [`pst_leaf_set`].
///
/// A NULL `out_value` only checks that the element exists. STRING leaves are
/// read with [`pst_leaf_get_string`].
#[unsafe(no_mangle)]
pub extern "C" fn pst_leaf_get(
    store: *const pst_store,
    plant: u64,
    key: *const c_char,
    idx: usize,
    out_value: *mut c_void,
) -> i32 {
    let store = match peek_store(store) {
        Some(store) => store,
        None => return ErrorKind::NoSuchPlant.code(),
    };
    let plant = PlantId::from_raw(plant);
    if !store.is_live(plant) {
        return fail(Error::new(ErrorKind::NoSuchPlant).with_plant(plant.raw()));
    }
    let key = match parse_key(key) {
        Ok(key) => key,
        Err(code) => return code,
    };
    let value = match store.get_element_value(plant, key, idx) {
        Ok(value) => value,
        Err(err) => return fail(err),
    };
    if out_value.is_null() {
        return SUCCESS_CODE;
    }
    unsafe {
        match value {
            Value::Int(v) => *(out_value as *mut i32) = v,
            Value::Double(v) => *(out_value as *mut f64) = v,
            Value::Boolean(v) => *(out_value as *mut i32) = i32::from(v),
            Value::Int64(v) => *(out_value as *mut i64) = v,
            Value::UInt(v) => *(out_value as *mut u32) = v,
            Value::UInt64(v) => *(out_value as *mut u64) = v,
            Value::FuncPtr(v) => *(out_value as *mut *const c_void) = v.as_ptr(),
            Value::VoidPtr(v) => *(out_value as *mut *mut c_void) = v.as_ptr(),
            Value::PlantPtr(v) => *(out_value as *mut u64) = v.raw(),
            Value::Str(_) => {
                return fail(
                    Error::new(ErrorKind::WrongSeedType)
                        .with_message("string elements are read with pst_leaf_get_string")
                        .with_key(key),
                );
            }
        }
    }
    SUCCESS_CODE
}

/// Fresh NUL-terminated copy of string element `idx`, released with [`pst_string_free`].
///
/// A zero-element string leaf reads as "" at index 0.
#[unsafe(no_mangle)]
pub extern "C" fn pst_leaf_get_string(
    store: *const pst_store,
    plant: u64,
    key: *const c_char,
    idx: usize,
    out_str: *mut *mut c_char,
) -> i32 {
    let store = match peek_store(store) {
        Some(store) => store,
        None => return ErrorKind::NoSuchPlant.code(),
    };
    let plant = PlantId::from_raw(plant);
    if !store.is_live(plant) {
        return fail(Error::new(ErrorKind::NoSuchPlant).with_plant(plant.raw()));
    }
    let key = match parse_key(key) {
        Ok(key) => key,
        Err(code) => return code,
    };
    let text = if idx == 0 {
        store.get_string(plant, key)
    } else {
        store.get_element::<BString>(plant, key, idx)
    };
    match text {
        Ok(text) => {
            if !out_str.is_null() {
                unsafe {
                    *out_str = to_c_string(&text);
                }
            }
            SUCCESS_CODE
        }
        Err(err) => fail(err),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn pst_string_free(value: *mut c_char) {
    if value.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(value));
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn pst_plant_has_leaf(store: *const pst_store, plant: u64, key: *const c_char) -> i32 {
    probe(store, key, |store, key| {
        i32::from(store.plant_has_leaf(PlantId::from_raw(plant), key))
    })
    .unwrap_or(0)
}

#[unsafe(no_mangle)]
pub extern "C" fn pst_leaf_num_elements(store: *const pst_store, plant: u64, key: *const c_char) -> usize {
    probe(store, key, |store, key| {
        store.leaf_num_elements(PlantId::from_raw(plant), key)
    })
    .unwrap_or(0)
}

#[unsafe(no_mangle)]
pub extern "C" fn pst_leaf_element_size(
    store: *const pst_store,
    plant: u64,
    key: *const c_char,
    idx: usize,
) -> usize {
    probe(store, key, |store, key| {
        store.leaf_element_size(PlantId::from_raw(plant), key, idx)
    })
    .unwrap_or(0)
}

#[unsafe(no_mangle)]
pub extern "C" fn pst_leaf_seed_type(store: *const pst_store, plant: u64, key: *const c_char) -> i32 {
    probe(store, key, |store, key| {
        store
            .leaf_seed_type(PlantId::from_raw(plant), key)
            .map(SeedType::code)
            .unwrap_or(SEED_INVALID)
    })
    .unwrap_or(SEED_INVALID)
}

#[unsafe(no_mangle)]
pub extern "C" fn pst_leaf_get_flags(store: *const pst_store, plant: u64, key: *const c_char) -> u32 {
    probe(store, key, |store, key| {
        store.leaf_get_flags(PlantId::from_raw(plant), key).bits()
    })
    .unwrap_or(0)
}

#[unsafe(no_mangle)]
pub extern "C" fn pst_leaf_set_flags(
    store: *mut pst_store,
    plant: u64,
    key: *const c_char,
    flags: u32,
) -> i32 {
    let store = match borrow_store(store) {
        Ok(store) => store,
        Err(code) => return code,
    };
    let plant = PlantId::from_raw(plant);
    if !store.is_live(plant) {
        return fail(Error::new(ErrorKind::NoSuchPlant).with_plant(plant.raw()));
    }
    let key = match parse_key(key) {
        Ok(key) => key,
        Err(code) => return code,
    };
    status(store.leaf_set_flags(plant, key, LeafFlags::from_bits(flags)))
}

#[unsafe(no_mangle)]
pub extern "C" fn pst_leaf_delete(store: *mut pst_store, plant: u64, key: *const c_char) -> i32 {
    let store = match borrow_store(store) {
        Ok(store) => store,
        Err(code) => return code,
    };
    let plant = PlantId::from_raw(plant);
    if !store.is_live(plant) {
        return fail(Error::new(ErrorKind::NoSuchPlant).with_plant(plant.raw()));
    }
    let key = match parse_key(key) {
        Ok(key) => key,
        Err(code) => return code,
    };
    status(store.leaf_delete(plant, key))
}

/// NULL-terminated key list in creation order, released with [`pst_string_list_free`].
#[unsafe(no_mangle)]
pub extern "C" fn pst_plant_list_leaves(store: *const pst_store, plant: u64) -> *mut *mut c_char {
    let keys = peek_store(store)
        .map(|store| store.plant_list_leaves(PlantId::from_raw(plant)))
        .unwrap_or_default();
    let mut list: Vec<*mut c_char> = keys.iter().map(|key| to_c_string(key)).collect();
    list.push(ptr::null_mut());
    let mut list = list.into_boxed_slice();
    let raw = list.as_mut_ptr();
    std::mem::forget(list);
    raw
}

#[unsafe(no_mangle)]
pub extern "C" fn pst_string_list_free(list: *mut *mut c_char) {
    if list.is_null() {
        return;
    }
    unsafe {
        let mut len = 0;
        while !(*list.add(len)).is_null() {
            drop(CString::from_raw(*list.add(len)));
            len += 1;
        }
        let slice = std::slice::from_raw_parts_mut(list, len + 1);
        drop(Box::from_raw(slice as *mut [*mut c_char]));
    }
}

/// Static description of an error code; never freed.
#[unsafe(no_mangle)]
pub extern "C" fn pst_strerror(code: i32) -> *const c_char {
    let text: &'static CStr = match ErrorKind::from_code(code) {
        None if code == SUCCESS_CODE => c"Success",
        None => c"Unknown error",
        Some(ErrorKind::MemoryAllocation) => c"Memory allocation error",
        Some(ErrorKind::NoSuchLeaf) => c"Invalid property",
        Some(ErrorKind::NoSuchElement) => c"Invalid element",
        Some(ErrorKind::WrongSeedType) => c"Incorrect property type",
        Some(ErrorKind::Immutable) => c"Read only property",
        Some(ErrorKind::Undeletable) => c"Undeletable property",
        Some(ErrorKind::NoSuchPlant) => c"Invalid plant",
        Some(ErrorKind::WrongPlantType) => c"Incorrect plant type",
    };
    text.as_ptr()
}

fn borrow_store<'a>(store: *mut pst_store) -> Result<&'a mut Store, i32> {
    if store.is_null() {
        return Err(fail(
            Error::new(ErrorKind::NoSuchPlant).with_message("store is null"),
        ));
    }
    unsafe { Ok(&mut (*store).store) }
}

fn peek_store<'a>(store: *const pst_store) -> Option<&'a Store> {
    if store.is_null() {
        return None;
    }
    unsafe { Some(&(*store).store) }
}

fn probe<T>(store: *const pst_store, key: *const c_char, read: impl FnOnce(&Store, &[u8]) -> T) -> Option<T> {
    let store = peek_store(store)?;
    if key.is_null() {
        return None;
    }
    let key = unsafe { CStr::from_ptr(key) }.to_bytes();
    Some(read(store, key))
}

fn parse_key<'a>(key: *const c_char) -> Result<&'a [u8], i32> {
    if key.is_null() {
        return Err(fail(Error::new(ErrorKind::NoSuchLeaf).with_message("key is null")));
    }
    Ok(unsafe { CStr::from_ptr(key) }.to_bytes())
}

/// # Safety
/// `values` must be NULL or point at `num_elems` elements laid out for `seed`.
unsafe fn read_values(seed: SeedType, num_elems: usize, values: *const c_void) -> Values {
    if num_elems == 0 || values.is_null() {
        return Values::empty(seed);
    }
    unsafe {
        match seed {
            SeedType::Int => Values::Int(read_slice::<i32>(values, num_elems).to_vec()),
            SeedType::Double => Values::Double(read_slice::<f64>(values, num_elems).to_vec()),
            SeedType::Boolean => Values::Boolean(
                read_slice::<i32>(values, num_elems)
                    .iter()
                    .map(|v| *v != 0)
                    .collect(),
            ),
            SeedType::String => Values::Str(
                read_slice::<*const c_char>(values, num_elems)
                    .iter()
                    .map(|item| {
                        if item.is_null() {
                            BString::default()
                        } else {
                            BString::from(CStr::from_ptr(*item).to_bytes())
                        }
                    })
                    .collect(),
            ),
            SeedType::Int64 => Values::Int64(read_slice::<i64>(values, num_elems).to_vec()),
            SeedType::UInt => Values::UInt(read_slice::<u32>(values, num_elems).to_vec()),
            SeedType::UInt64 => Values::UInt64(read_slice::<u64>(values, num_elems).to_vec()),
            SeedType::FuncPtr => Values::FuncPtr(
                read_slice::<usize>(values, num_elems)
                    .iter()
                    .map(|addr| FuncPtr::from_addr(*addr))
                    .collect(),
            ),
            SeedType::VoidPtr => Values::VoidPtr(
                read_slice::<usize>(values, num_elems)
                    .iter()
                    .map(|addr| VoidPtr::from_addr(*addr))
                    .collect(),
            ),
            SeedType::PlantPtr => Values::PlantPtr(
                read_slice::<u64>(values, num_elems)
                    .iter()
                    .map(|raw| PlantId::from_raw(*raw))
                    .collect(),
            ),
        }
    }
}

unsafe fn read_slice<'a, T>(values: *const c_void, len: usize) -> &'a [T] {
    unsafe { std::slice::from_raw_parts(values as *const T, len) }
}

fn status(result: Result<(), Error>) -> i32 {
    match result {
        Ok(()) => SUCCESS_CODE,
        Err(err) => fail(err),
    }
}

fn fail(err: Error) -> i32 {
    tracing::debug!(code = err.code(), error = %err, "abi call failed");
    err.code()
}

/// Byte-exact copy. A string element holding an interior NUL is cut at the
/// first one; keys never hold one.
fn to_c_string(input: &[u8]) -> *mut c_char {
    let end = input.iter().position(|b| *b == 0).unwrap_or(input.len());
    CString::new(&input[..end])
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}
