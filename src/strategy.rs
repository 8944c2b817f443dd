//! Hash/compare strategy per key kind.
//!
//! A key type declares its kind through [`TableKey`] and exposes itself as a
//! [`KeyRef`]; a [`Strategy`] combines the kind with the process seed and
//! hash variant and is bound to a table when the table is built.

use crate::hashers::{murmur3_32, wang_u32};
use crate::seed::{hash_state, HashState, HashVariant};
use core::cmp::Ordering;
use std::ffi::{CStr, CString};
use std::rc::Rc;

/// The two supported key kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Fixed-width integer handles.
    Integer,
    /// NUL-terminated byte strings.
    String,
}

/// A key as seen by the hash and compare functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyRef<'a> {
    Integer(i64),
    /// The bytes before the terminating NUL.
    String(&'a [u8]),
}

impl KeyRef<'_> {
    pub fn kind(&self) -> KeyKind {
        match self {
            KeyRef::Integer(_) => KeyKind::Integer,
            KeyRef::String(_) => KeyKind::String,
        }
    }
}

/// Types usable as table keys.
///
/// Implementations for string types stop at the first NUL byte, so `"a\0b"`
/// and `"a"` are the same key.
pub trait TableKey {
    const KIND: KeyKind;

    fn as_key(&self) -> KeyRef<'_>;
}

/// Bytes up to (not including) the first NUL.
#[inline]
pub fn until_nul(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

macro_rules! integer_keys {
    ($($t:ty),* $(,)?) => {
        $(
            impl TableKey for $t {
                const KIND: KeyKind = KeyKind::Integer;

                #[inline]
                fn as_key(&self) -> KeyRef<'_> {
                    // Handles compare as signed pointer-width values.
                    KeyRef::Integer(*self as i64)
                }
            }
        )*
    };
}

integer_keys!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl TableKey for str {
    const KIND: KeyKind = KeyKind::String;

    fn as_key(&self) -> KeyRef<'_> {
        KeyRef::String(until_nul(self.as_bytes()))
    }
}

impl TableKey for String {
    const KIND: KeyKind = KeyKind::String;

    fn as_key(&self) -> KeyRef<'_> {
        self.as_str().as_key()
    }
}

impl TableKey for [u8] {
    const KIND: KeyKind = KeyKind::String;

    fn as_key(&self) -> KeyRef<'_> {
        KeyRef::String(until_nul(self))
    }
}

impl TableKey for Vec<u8> {
    const KIND: KeyKind = KeyKind::String;

    fn as_key(&self) -> KeyRef<'_> {
        self.as_slice().as_key()
    }
}

impl TableKey for CStr {
    const KIND: KeyKind = KeyKind::String;

    fn as_key(&self) -> KeyRef<'_> {
        KeyRef::String(self.to_bytes())
    }
}

impl TableKey for CString {
    const KIND: KeyKind = KeyKind::String;

    fn as_key(&self) -> KeyRef<'_> {
        self.as_c_str().as_key()
    }
}

impl<T: TableKey + ?Sized> TableKey for &T {
    const KIND: KeyKind = T::KIND;

    fn as_key(&self) -> KeyRef<'_> {
        (**self).as_key()
    }
}

impl<T: TableKey + ?Sized> TableKey for Box<T> {
    const KIND: KeyKind = T::KIND;

    fn as_key(&self) -> KeyRef<'_> {
        (**self).as_key()
    }
}

impl<T: TableKey + ?Sized> TableKey for Rc<T> {
    const KIND: KeyKind = T::KIND;

    fn as_key(&self) -> KeyRef<'_> {
        (**self).as_key()
    }
}

/// Hash function and comparator for one key kind, fixed for a table's
/// lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Strategy {
    kind: KeyKind,
    seed: u32,
    variant: HashVariant,
}

impl Strategy {
    /// Strategy for `kind` under the process-wide hash state.
    pub fn for_kind(kind: KeyKind) -> Self {
        Self::with_state(kind, hash_state())
    }

    /// Strategy for `kind` under an explicit state.
    pub fn with_state(kind: KeyKind, state: &HashState) -> Self {
        Self {
            kind,
            seed: state.seed(),
            variant: state.variant(),
        }
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn variant(&self) -> HashVariant {
        self.variant
    }

    #[inline]
    pub fn hash(&self, key: KeyRef<'_>) -> u32 {
        debug_assert_eq!(key.kind(), self.kind);
        match (key, self.variant) {
            (KeyRef::Integer(v), HashVariant::Portable) => wang_u32(v as u32, self.seed),
            (KeyRef::Integer(v), HashVariant::Crc32(cpu)) => cpu.crc32_u32(v as u32, self.seed),
            (KeyRef::String(s), HashVariant::Portable) => murmur3_32(s, self.seed),
            (KeyRef::String(s), HashVariant::Crc32(cpu)) => cpu.crc32_bytes(s, self.seed),
        }
    }

    /// Three-way ordering: signed for integers, byte-wise for strings.
    #[inline]
    pub fn compare(&self, a: KeyRef<'_>, b: KeyRef<'_>) -> Ordering {
        match (a, b) {
            (KeyRef::Integer(a), KeyRef::Integer(b)) => a.cmp(&b),
            (KeyRef::String(a), KeyRef::String(b)) => a.cmp(b),
            (a, b) => (a.kind() as u8).cmp(&(b.kind() as u8)),
        }
    }

    #[inline]
    pub fn matches(&self, a: KeyRef<'_>, b: KeyRef<'_>) -> bool {
        self.compare(a, b) == Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashers::Sse42;

    fn portable(kind: KeyKind) -> Strategy {
        Strategy::with_state(kind, &HashState::new(0x27d4_eb2d, HashVariant::Portable))
    }

    #[test]
    fn key_kinds_follow_the_key_type() {
        assert_eq!(<u32 as TableKey>::KIND, KeyKind::Integer);
        assert_eq!(<&isize as TableKey>::KIND, KeyKind::Integer);
        assert_eq!(<String as TableKey>::KIND, KeyKind::String);
        assert_eq!(<&CStr as TableKey>::KIND, KeyKind::String);
        assert_eq!(<Rc<str> as TableKey>::KIND, KeyKind::String);
    }

    #[test]
    fn string_keys_stop_at_nul() {
        assert_eq!("a\0b".as_key(), KeyRef::String(b"a"));
        assert_eq!(b"xy\0z"[..].as_key(), KeyRef::String(b"xy"));
        let c = CString::new("hello").unwrap();
        assert_eq!(c.as_key(), "hello".as_key());
    }

    #[test]
    fn integer_compare_is_signed() {
        let s = portable(KeyKind::Integer);
        assert_eq!(s.compare((-1i64).as_key(), 1i64.as_key()), Ordering::Less);
        assert_eq!(s.compare(usize::MAX.as_key(), 0usize.as_key()), Ordering::Less);
        assert!(s.matches(7i32.as_key(), 7u64.as_key()));
    }

    #[test]
    fn string_compare_is_bytewise() {
        let s = portable(KeyKind::String);
        assert_eq!(s.compare("abc".as_key(), "abd".as_key()), Ordering::Less);
        assert_eq!(s.compare("ab".as_key(), "abc".as_key()), Ordering::Less);
        assert_eq!(s.compare("\u{e9}".as_key(), "z".as_key()), Ordering::Greater);
        assert!(s.matches("same".as_key(), String::from("same").as_key()));
    }

    #[test]
    fn portable_hashes_use_wang_and_murmur() {
        let ints = portable(KeyKind::Integer);
        assert_eq!(ints.hash(5u32.as_key()), wang_u32(5, 0x27d4_eb2d));
        let strs = portable(KeyKind::String);
        assert_eq!(strs.hash("alpha".as_key()), murmur3_32(b"alpha", 0x27d4_eb2d));
    }

    #[test]
    fn accelerated_hashes_are_self_consistent() {
        let Some(cpu) = Sse42::detect() else {
            return;
        };
        let state = HashState::new(0x1234_5677, HashVariant::Crc32(cpu));
        let strs = Strategy::with_state(KeyKind::String, &state);
        assert_eq!(strs.hash("alpha".as_key()), strs.hash(String::from("alpha").as_key()));
        let ints = Strategy::with_state(KeyKind::Integer, &state);
        assert_eq!(ints.hash(9i64.as_key()), cpu.crc32_u32(9, 0x1234_5677));
    }

    #[test]
    fn equal_keys_hash_equal_across_representations() {
        let s = Strategy::for_kind(KeyKind::String);
        let c = CString::new("beta").unwrap();
        assert_eq!(s.hash("beta".as_key()), s.hash(c.as_key()));
        assert_eq!(s.hash("beta\0tail".as_key()), s.hash("beta".as_key()));
    }
}
