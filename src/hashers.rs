//! Raw 32-bit hash functions: the portable pair (Thomas Wang integer mix,
//! MurmurHash3 x86_32) and the SSE4.2 CRC32C pair.
//!
//! All functions take the process seed explicitly; selecting between them
//! is `strategy`'s job.

/// Thomas Wang's shift/multiply integer mix over the low 32 bits of `key`,
/// with the seed as the odd multiplier.
#[inline]
pub fn wang_u32(key: u32, seed: u32) -> u32 {
    let mut key = (key ^ 61) ^ (key >> 16);
    key = key.wrapping_add(key << 3);
    key ^= key >> 4;
    key = key.wrapping_mul(seed);
    key ^= key >> 15;
    key
}

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

#[inline(always)]
fn murmur_scramble(k: u32) -> u32 {
    k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

#[inline(always)]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// MurmurHash3 x86_32 of `bytes`.
pub fn murmur3_32(bytes: &[u8], seed: u32) -> u32 {
    let mut h = seed;
    let mut blocks = bytes.chunks_exact(4);
    for b in &mut blocks {
        h ^= murmur_scramble(u32::from_le_bytes([b[0], b[1], b[2], b[3]]));
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = blocks.remainder();
    let mut k = 0u32;
    if tail.len() >= 3 {
        k ^= u32::from(tail[2]) << 16;
    }
    if tail.len() >= 2 {
        k ^= u32::from(tail[1]) << 8;
    }
    if let Some(&first) = tail.first() {
        k ^= u32::from(first);
        h ^= murmur_scramble(k);
    }

    // Length is mixed modulo 2^32, as the reference implementation does.
    h ^= bytes.len() as u32;
    fmix32(h)
}

/// Proof that the running CPU supports SSE4.2 (and so the CRC32
/// instructions). Only `detect` can mint one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Sse42 {
    _private: (),
}

impl Sse42 {
    /// Query the CPU. Returns `None` on non-x86_64 targets.
    pub fn detect() -> Option<Self> {
        #[cfg(target_arch = "x86_64")]
        {
            if std::arch::is_x86_feature_detected!("sse4.2") {
                return Some(Sse42 { _private: () });
            }
        }
        None
    }

    /// CRC32C fold of `bytes` in 8-, 4-, 2- then 1-byte steps, seeded with
    /// `seed`. The last step consumes the final byte, or the terminating
    /// NUL when no odd byte remains.
    #[inline]
    pub fn crc32_bytes(self, bytes: &[u8], seed: u32) -> u32 {
        #[cfg(target_arch = "x86_64")]
        {
            // SAFETY: `self` exists only if SSE4.2 was detected at runtime.
            unsafe { x86::crc32_bytes(bytes, seed) }
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            let _ = (bytes, seed);
            unreachable!("Sse42 cannot be constructed on this target")
        }
    }

    /// One 32-bit CRC32C step over `key`, seeded with `seed`.
    #[inline]
    pub fn crc32_u32(self, key: u32, seed: u32) -> u32 {
        #[cfg(target_arch = "x86_64")]
        {
            // SAFETY: `self` exists only if SSE4.2 was detected at runtime.
            unsafe { x86::crc32_u32(key, seed) }
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            let _ = (key, seed);
            unreachable!("Sse42 cannot be constructed on this target")
        }
    }
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use core::arch::x86_64::{_mm_crc32_u16, _mm_crc32_u32, _mm_crc32_u64, _mm_crc32_u8};

    /// # Safety
    /// The CPU must support SSE4.2.
    #[target_feature(enable = "sse4.2")]
    pub(super) unsafe fn crc32_bytes(bytes: &[u8], seed: u32) -> u32 {
        let mut hash = seed;

        let mut words = bytes.chunks_exact(8);
        for w in &mut words {
            let data = u64::from_le_bytes([w[0], w[1], w[2], w[3], w[4], w[5], w[6], w[7]]);
            hash = _mm_crc32_u64(u64::from(hash), data) as u32;
        }

        let mut rest = words.remainder();
        if rest.len() >= 4 {
            let data = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
            hash = _mm_crc32_u32(hash, data);
            rest = &rest[4..];
        }
        if rest.len() >= 2 {
            let data = u16::from_le_bytes([rest[0], rest[1]]);
            hash = _mm_crc32_u16(hash, data);
            rest = &rest[2..];
        }

        let last = rest.first().copied().unwrap_or(0);
        _mm_crc32_u8(hash, last)
    }

    /// # Safety
    /// The CPU must support SSE4.2.
    #[target_feature(enable = "sse4.2")]
    pub(super) unsafe fn crc32_u32(key: u32, seed: u32) -> u32 {
        _mm_crc32_u32(seed, key)
    }
}
