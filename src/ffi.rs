//! C ABI over [`Table`] for hosts that link the crate as a static library.
//!
//! Keys and values are caller-owned pointers and are stored as is. In an
//! integer table the key pointer's address is the handle; in a string table
//! it must point to a NUL-terminated string that stays valid and unchanged
//! while it is in the table. Status codes are `0` or a negative errno.

use crate::error::Error;
use crate::iter::Cursor;
use crate::strategy::{KeyKind, KeyRef, TableKey};
use crate::table::{Table, TableBuilder};
use core::ffi::{c_char, c_int, c_uint, c_void};
use core::ptr;
use std::ffi::CStr;

/// Optional `void (*)(void *)` release callback.
pub type FreeFn = Option<unsafe extern "C" fn(*mut c_void)>;

type RawValue = *const c_void;

#[derive(Clone, Copy, Debug)]
struct IntHandle(*const c_void);

impl TableKey for IntHandle {
    const KIND: KeyKind = KeyKind::Integer;

    fn as_key(&self) -> KeyRef<'_> {
        KeyRef::Integer(self.0 as isize as i64)
    }
}

#[derive(Clone, Copy, Debug)]
struct CStrKey(*const c_char);

impl CStrKey {
    fn new(key: *const c_void) -> Result<Self, c_int> {
        if key.is_null() {
            return Err(-libc::EINVAL);
        }
        Ok(CStrKey(key.cast()))
    }
}

impl TableKey for CStrKey {
    const KIND: KeyKind = KeyKind::String;

    fn as_key(&self) -> KeyRef<'_> {
        // SAFETY: CStrKey is only built from non-null pointers the caller
        // guarantees to be live NUL-terminated strings.
        KeyRef::String(unsafe { CStr::from_ptr(self.0) }.to_bytes())
    }
}

enum Inner {
    Int(Table<IntHandle, RawValue>),
    Str(Table<CStrKey, RawValue>),
}

/// Opaque table handle.
pub struct HashTable {
    inner: Inner,
}

/// Caller-allocated iteration state; initialize with [`hashmap_iter_init`].
#[repr(C)]
#[derive(Debug)]
pub struct HashIter {
    pub table: *const HashTable,
    pub bucket: c_uint,
    /// `-1` before the first step.
    pub entry: c_int,
}

fn errno(e: Error) -> c_int {
    -match e {
        Error::OutOfMemory => libc::ENOMEM,
        Error::CapacityOverflow => libc::EOVERFLOW,
        Error::NotFound => libc::ENOENT,
        Error::AlreadyExists => libc::EEXIST,
    }
}

fn status(r: Result<(), Error>) -> c_int {
    match r {
        Ok(()) => 0,
        Err(e) => errno(e),
    }
}

fn with_destructors<K, F>(
    mut builder: TableBuilder<K, RawValue>,
    free_key: FreeFn,
    free_value: FreeFn,
    raw_key: F,
) -> TableBuilder<K, RawValue>
where
    K: TableKey + 'static,
    F: Fn(K) -> *mut c_void + 'static,
{
    if let Some(free) = free_key {
        // SAFETY: the caller registered `free` for exactly these keys.
        builder = builder.key_destructor(move |k: K| unsafe { free(raw_key(k)) });
    }
    if let Some(free) = free_value {
        // SAFETY: the caller registered `free` for exactly these values.
        builder = builder.value_destructor(move |v: RawValue| unsafe { free(v.cast_mut()) });
    }
    builder
}

fn into_handle(built: Result<Inner, Error>) -> *mut HashTable {
    match built {
        Ok(inner) => Box::into_raw(Box::new(HashTable { inner })),
        Err(e) => {
            log::warn!("table creation failed: {}", e);
            ptr::null_mut()
        }
    }
}

/// Create a table keyed by integer handles. Returns NULL if allocation
/// fails.
#[no_mangle]
pub extern "C" fn hashmap_create_int_table(free_key: FreeFn, free_value: FreeFn) -> *mut HashTable {
    let builder = with_destructors(Table::builder(), free_key, free_value, |k: IntHandle| {
        k.0.cast_mut()
    });
    into_handle(builder.try_build().map(Inner::Int))
}

/// Create a table keyed by NUL-terminated strings. Returns NULL if
/// allocation fails.
#[no_mangle]
pub extern "C" fn hashmap_create_string_table(
    free_key: FreeFn,
    free_value: FreeFn,
) -> *mut HashTable {
    let builder = with_destructors(Table::builder(), free_key, free_value, |k: CStrKey| {
        k.0.cast_mut().cast()
    });
    into_handle(builder.try_build().map(Inner::Str))
}

/// Add or replace `key`. A replaced pair goes through the destructors.
///
/// # Safety
/// `table` must come from a create function and not be destroyed yet. For a
/// string table `key` must be a valid C string that outlives its entry.
#[no_mangle]
pub unsafe extern "C" fn hashmap_add(
    table: *mut HashTable,
    key: *const c_void,
    value: *const c_void,
) -> c_int {
    // SAFETY: guaranteed by the caller.
    let Some(table) = (unsafe { table.as_mut() }) else {
        return -libc::EINVAL;
    };
    match &mut table.inner {
        Inner::Int(t) => status(t.add(IntHandle(key), value).map_err(|e| e.kind())),
        Inner::Str(t) => match CStrKey::new(key) {
            Ok(k) => status(t.add(k, value).map_err(|e| e.kind())),
            Err(code) => code,
        },
    }
}

/// Add `key` only if absent; `-EEXIST` otherwise, with no destructor run.
///
/// # Safety
/// Same as [`hashmap_add`].
#[no_mangle]
pub unsafe extern "C" fn hashmap_add_unique(
    table: *mut HashTable,
    key: *const c_void,
    value: *const c_void,
) -> c_int {
    // SAFETY: guaranteed by the caller.
    let Some(table) = (unsafe { table.as_mut() }) else {
        return -libc::EINVAL;
    };
    match &mut table.inner {
        Inner::Int(t) => status(t.add_unique(IntHandle(key), value).map_err(|e| e.kind())),
        Inner::Str(t) => match CStrKey::new(key) {
            Ok(k) => status(t.add_unique(k, value).map_err(|e| e.kind())),
            Err(code) => code,
        },
    }
}

/// Stored value for `key`, or NULL.
///
/// # Safety
/// `table` must be live; for a string table `key` must be a valid C string.
#[no_mangle]
pub unsafe extern "C" fn hashmap_find(table: *const HashTable, key: *const c_void) -> *mut c_void {
    // SAFETY: guaranteed by the caller.
    let Some(table) = (unsafe { table.as_ref() }) else {
        return ptr::null_mut();
    };
    let found = match &table.inner {
        Inner::Int(t) => t.find(&IntHandle(key)).copied(),
        Inner::Str(t) => CStrKey::new(key).ok().and_then(|k| t.find(&k).copied()),
    };
    found.map_or(ptr::null_mut(), |v| v.cast_mut())
}

/// Remove `key`, running its destructors; `-ENOENT` if absent.
///
/// # Safety
/// `table` must be live; for a string table `key` must be a valid C string.
#[no_mangle]
pub unsafe extern "C" fn hashmap_delete(table: *mut HashTable, key: *const c_void) -> c_int {
    // SAFETY: guaranteed by the caller.
    let Some(table) = (unsafe { table.as_mut() }) else {
        return -libc::EINVAL;
    };
    match &mut table.inner {
        Inner::Int(t) => status(t.delete(&IntHandle(key))),
        Inner::Str(t) => match CStrKey::new(key) {
            Ok(k) => status(t.delete(&k)),
            Err(code) => code,
        },
    }
}

/// Number of entries; 0 for NULL.
///
/// # Safety
/// `table` must be NULL or live.
#[no_mangle]
pub unsafe extern "C" fn hashmap_count(table: *const HashTable) -> c_uint {
    // SAFETY: guaranteed by the caller.
    let Some(table) = (unsafe { table.as_ref() }) else {
        return 0;
    };
    let count = match &table.inner {
        Inner::Int(t) => t.count(),
        Inner::Str(t) => t.count(),
    };
    c_uint::try_from(count).unwrap_or(c_uint::MAX)
}

/// Release every entry through the destructors, then the table. NULL is a
/// no-op.
///
/// # Safety
/// `table` must be NULL or live, and is dangling afterwards.
#[no_mangle]
pub unsafe extern "C" fn hashmap_destroy(table: *mut HashTable) {
    if table.is_null() {
        return;
    }
    // SAFETY: `table` came from Box::into_raw in a create function.
    drop(unsafe { Box::from_raw(table) });
}

/// Point `iter` before the first entry of `table`.
///
/// # Safety
/// `iter` must be NULL or writable.
#[no_mangle]
pub unsafe extern "C" fn hashmap_iter_init(table: *const HashTable, iter: *mut HashIter) {
    // SAFETY: guaranteed by the caller.
    if let Some(iter) = unsafe { iter.as_mut() } {
        let (bucket, _) = Cursor::new().parts();
        *iter = HashIter {
            table,
            bucket: bucket as c_uint,
            entry: -1,
        };
    }
}

/// Step `iter`; on success store the pair through the non-NULL out
/// pointers and return `true`. Returns `false` once exhausted.
///
/// # Safety
/// `iter` must have been initialized with a live table that is not
/// mutated during the walk; `key`/`value` must be NULL or writable.
#[no_mangle]
pub unsafe extern "C" fn hashmap_iter_next(
    iter: *mut HashIter,
    key: *mut *const c_void,
    value: *mut *const c_void,
) -> bool {
    // SAFETY: guaranteed by the caller.
    let Some(it) = (unsafe { iter.as_mut() }) else {
        return false;
    };
    // SAFETY: guaranteed by the caller.
    let Some(table) = (unsafe { it.table.as_ref() }) else {
        return false;
    };

    let mut cursor = Cursor::from_parts(it.bucket as usize, usize::try_from(it.entry).ok());
    let item = match &table.inner {
        Inner::Int(t) => cursor.next(t).map(|(k, v)| (k.0, *v)),
        Inner::Str(t) => cursor.next(t).map(|(k, v)| (k.0.cast::<c_void>(), *v)),
    };
    let (bucket, entry) = cursor.parts();
    it.bucket = c_uint::try_from(bucket).unwrap_or(c_uint::MAX);
    it.entry = entry.and_then(|e| c_int::try_from(e).ok()).unwrap_or(-1);

    let Some((k, v)) = item else {
        return false;
    };
    // SAFETY: out pointers are NULL or writable per the contract.
    unsafe {
        if let Some(out) = key.as_mut() {
            *out = k;
        }
        if let Some(out) = value.as_mut() {
            *out = v;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_negative_errno() {
        assert_eq!(errno(Error::OutOfMemory), -libc::ENOMEM);
        assert_eq!(errno(Error::CapacityOverflow), -libc::EOVERFLOW);
        assert_eq!(errno(Error::NotFound), -libc::ENOENT);
        assert_eq!(errno(Error::AlreadyExists), -libc::EEXIST);
        assert_eq!(status(Ok(())), 0);
    }

    #[test]
    fn integer_handle_uses_pointer_address() {
        let k = IntHandle(0x40usize as *const c_void);
        assert_eq!(k.as_key(), KeyRef::Integer(0x40));
    }

    #[test]
    fn null_string_key_is_rejected() {
        let t = hashmap_create_string_table(None, None);
        assert!(!t.is_null());
        unsafe {
            assert_eq!(hashmap_add(t, ptr::null(), ptr::null()), -libc::EINVAL);
            assert!(hashmap_find(t, ptr::null()).is_null());
            assert_eq!(hashmap_delete(t, ptr::null()), -libc::EINVAL);
            assert_eq!(hashmap_count(t), 0);
            hashmap_destroy(t);
        }
    }

    #[test]
    fn null_table_is_tolerated() {
        unsafe {
            assert_eq!(hashmap_add(ptr::null_mut(), ptr::null(), ptr::null()), -libc::EINVAL);
            assert_eq!(hashmap_count(ptr::null()), 0);
            assert!(hashmap_find(ptr::null(), ptr::null()).is_null());
            hashmap_destroy(ptr::null_mut());
        }
    }
}
