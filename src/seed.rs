//! Process-wide hash state: the randomized odd seed and the hash variant.
//!
//! Both are decided once, on the first call to [`initialize`] or
//! [`hash_state`], and are immutable afterwards. Randomizing the seed per
//! process keeps adversaries from precomputing keys that collide into one
//! bucket (Crosby & Wallach, USENIX Security 2003).

use crate::hashers::Sse42;
use rand::rngs::OsRng;
use rand::TryRngCore;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Seed used when no entropy source is available.
pub const DEFAULT_ODD_CONSTANT: u32 = 0x27d4_eb2d;

static HASH_STATE: OnceLock<HashState> = OnceLock::new();

/// Hash implementation selected for the whole process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashVariant {
    /// Thomas Wang integer mix and MurmurHash3 strings.
    Portable,
    /// SSE4.2 CRC32C for both key kinds.
    Crc32(Sse42),
}

impl HashVariant {
    /// Pick the fastest variant the CPU supports.
    pub fn detect() -> Self {
        match Sse42::detect() {
            Some(cpu) => HashVariant::Crc32(cpu),
            None => HashVariant::Portable,
        }
    }

    pub fn is_accelerated(self) -> bool {
        matches!(self, HashVariant::Crc32(_))
    }
}

/// The immutable outcome of process initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashState {
    seed: u32,
    variant: HashVariant,
}

impl HashState {
    /// Build a state directly. Tables always use the process-wide state;
    /// this exists for callers that drive [`crate::Strategy`] themselves.
    /// The seed is forced odd.
    pub fn new(seed: u32, variant: HashVariant) -> Self {
        Self {
            seed: seed | 1,
            variant,
        }
    }

    /// Odd, nonzero mixing constant.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn variant(&self) -> HashVariant {
        self.variant
    }
}

/// Options for eager initialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitConfig {
    /// Allow the CRC32 variant when the CPU supports it.
    pub allow_acceleration: bool,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            allow_acceleration: true,
        }
    }
}

/// Initialize the process-wide hash state with `config`.
///
/// Only the first initialization in a process takes effect; later calls
/// (and calls after a table already triggered lazy initialization) return
/// the existing state unchanged.
pub fn initialize(config: &InitConfig) -> &'static HashState {
    let mut fresh = false;
    let state = HASH_STATE.get_or_init(|| {
        fresh = true;
        build_state(config)
    });
    if !fresh {
        log::debug!("hash state already initialized; ignoring {:?}", config);
    }
    state
}

/// The process-wide hash state, initialized with defaults on first use.
pub fn hash_state() -> &'static HashState {
    HASH_STATE.get_or_init(|| build_state(&InitConfig::default()))
}

fn build_state(config: &InitConfig) -> HashState {
    let seed = draw_seed(&default_sources());
    let variant = if config.allow_acceleration {
        HashVariant::detect()
    } else {
        HashVariant::Portable
    };
    log::debug!("hash state initialized: variant={:?}", variant);
    HashState::new(seed, variant)
}

/// A supplier of at least four random bytes.
pub trait EntropySource {
    fn name(&self) -> &str;
    fn next_u32(&self) -> io::Result<u32>;
}

/// The kernel random call (`getrandom(2)` on Linux).
#[derive(Debug, Default)]
pub struct KernelRandom;

impl EntropySource for KernelRandom {
    fn name(&self) -> &str {
        "getrandom"
    }

    fn next_u32(&self) -> io::Result<u32> {
        OsRng.try_next_u32().map_err(io::Error::other)
    }
}

/// A random device read through the filesystem.
#[derive(Debug)]
pub struct RandomDevice {
    path: PathBuf,
}

impl RandomDevice {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl EntropySource for RandomDevice {
    fn name(&self) -> &str {
        self.path.to_str().unwrap_or("random device")
    }

    fn next_u32(&self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        File::open(&self.path)?.read_exact(&mut buf)?;
        Ok(u32::from_ne_bytes(buf))
    }
}

fn default_sources() -> [Box<dyn EntropySource>; 3] {
    [
        Box::new(KernelRandom),
        Box::new(RandomDevice::new("/dev/urandom")),
        Box::new(RandomDevice::new("/dev/random")),
    ]
}

/// Draw a seed from the first source that answers, falling back to
/// [`DEFAULT_ODD_CONSTANT`]. The result is always odd.
pub fn draw_seed<S>(sources: &[S]) -> u32
where
    S: std::ops::Deref,
    S::Target: EntropySource,
{
    for source in sources {
        match source.next_u32() {
            Ok(v) => {
                log::debug!("hash seed drawn from {}", source.name());
                return v | 1;
            }
            Err(e) => log::debug!("entropy source {} unavailable: {}", source.name(), e),
        }
    }
    log::warn!("no entropy source available; using the fixed hash seed");
    DEFAULT_ODD_CONSTANT | 1
}
