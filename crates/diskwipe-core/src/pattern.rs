//! Overwrite patterns
//!
//! A [`PatternSource`] owns the write buffer for one erase run. Static
//! patterns are laid down once when the source is built; random patterns
//! are regenerated by [`PatternSource::fill`] before every write.

use crate::error::{Error, Result};
use rand::rngs::{OsRng, SmallRng};
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Buffer size used for media of at least [`LARGE_MEDIA_THRESHOLD`] bytes (1 MiB)
pub const LARGE_BUFFER_SIZE: usize = 1024 * 1024;

/// Buffer size used for smaller media (one classic sector)
pub const SMALL_BUFFER_SIZE: usize = 512;

/// Media at or above this size get the large buffer
pub const LARGE_MEDIA_THRESHOLD: u64 = 1_000_000_000;

/// Pick the write buffer size for a target of `total_size` bytes
pub fn buffer_size_for(total_size: u64) -> usize {
    if total_size >= LARGE_MEDIA_THRESHOLD {
        LARGE_BUFFER_SIZE
    } else {
        SMALL_BUFFER_SIZE
    }
}

/// The pattern written over the target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EraseMode {
    /// 0x00 in every byte
    #[default]
    Zero,
    /// 0xFF in every byte
    One,
    /// 0xAA in every byte
    Alternate,
    /// Non-cryptographic pseudorandom data
    #[serde(alias = "random")]
    FastRandom,
    /// Data from the operating system CSPRNG
    #[serde(alias = "random-crypto")]
    SecureRandom,
}

impl EraseMode {
    /// Short human readable description
    pub fn description(&self) -> &'static str {
        match self {
            EraseMode::Zero => "Write all zeros",
            EraseMode::One => "Write all ones",
            EraseMode::Alternate => "Write alternating pattern of one and zero",
            EraseMode::FastRandom => "Write random data",
            EraseMode::SecureRandom => "Write cryptographically secure random data",
        }
    }

    /// Stable name used in settings files and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            EraseMode::Zero => "zero",
            EraseMode::One => "one",
            EraseMode::Alternate => "alternate",
            EraseMode::FastRandom => "fast-random",
            EraseMode::SecureRandom => "secure-random",
        }
    }

    /// The repeated byte for static patterns, `None` for random ones
    pub fn fill_byte(&self) -> Option<u8> {
        match self {
            EraseMode::Zero => Some(0x00),
            EraseMode::One => Some(0xFF),
            EraseMode::Alternate => Some(0xAA),
            EraseMode::FastRandom | EraseMode::SecureRandom => None,
        }
    }

    /// Whether the buffer must be regenerated before every write
    pub fn is_random(&self) -> bool {
        self.fill_byte().is_none()
    }

    /// The mode after this one, wrapping around
    pub fn next(&self) -> Self {
        match self {
            EraseMode::Zero => EraseMode::One,
            EraseMode::One => EraseMode::Alternate,
            EraseMode::Alternate => EraseMode::FastRandom,
            EraseMode::FastRandom => EraseMode::SecureRandom,
            EraseMode::SecureRandom => EraseMode::Zero,
        }
    }

    /// List all modes in declaration order
    pub fn all() -> &'static [EraseMode] {
        &[
            EraseMode::Zero,
            EraseMode::One,
            EraseMode::Alternate,
            EraseMode::FastRandom,
            EraseMode::SecureRandom,
        ]
    }
}

impl std::fmt::Display for EraseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for EraseMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "zero" | "zeros" => Ok(EraseMode::Zero),
            "one" | "ones" => Ok(EraseMode::One),
            "alternate" => Ok(EraseMode::Alternate),
            "fast-random" | "random" => Ok(EraseMode::FastRandom),
            "secure-random" | "random-crypto" | "randomcrypto" => Ok(EraseMode::SecureRandom),
            _ => Err(Error::UnknownMode(s.to_string())),
        }
    }
}

/// Generator state behind a pattern buffer
enum Generator {
    Static,
    Fast(SmallRng),
    Secure(OsRng),
}

/// Owner of the write buffer for one erase run
pub struct PatternSource {
    mode: EraseMode,
    buffer: Vec<u8>,
    generator: Generator,
}

impl PatternSource {
    /// Create a source for `mode` with a buffer of `size` bytes
    ///
    /// Static patterns are written into the buffer here and never touched again.
    pub fn new(mode: EraseMode, size: usize) -> Self {
        let (buffer, generator) = match mode.fill_byte() {
            Some(byte) => (vec![byte; size], Generator::Static),
            None if mode == EraseMode::SecureRandom => (vec![0u8; size], Generator::Secure(OsRng)),
            None => (vec![0u8; size], Generator::Fast(SmallRng::from_entropy())),
        };

        tracing::debug!("Pattern source ready: mode={}, buffer={} bytes", mode, size);

        Self {
            mode,
            buffer,
            generator,
        }
    }

    /// Create a source with the buffer size appropriate for `total_size`
    pub fn for_target(mode: EraseMode, total_size: u64) -> Self {
        Self::new(mode, buffer_size_for(total_size))
    }

    /// Refresh the buffer for the next write
    ///
    /// A no-op for static patterns.
    pub fn fill(&mut self) -> Result<()> {
        match &mut self.generator {
            Generator::Static => Ok(()),
            Generator::Fast(rng) => {
                rng.fill_bytes(&mut self.buffer);
                Ok(())
            }
            Generator::Secure(rng) => rng
                .try_fill_bytes(&mut self.buffer)
                .map_err(|e| Error::Entropy(e.to_string())),
        }
    }

    /// Current buffer content
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Buffer length in bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Mode this source was built for
    pub fn mode(&self) -> EraseMode {
        self.mode
    }
}

impl std::fmt::Debug for PatternSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternSource")
            .field("mode", &self.mode)
            .field("len", &self.buffer.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_size_threshold() {
        assert_eq!(buffer_size_for(0), 512);
        assert_eq!(buffer_size_for(2_500_000), 512);
        assert_eq!(buffer_size_for(999_999_999), 512);
        assert_eq!(buffer_size_for(1_000_000_000), 1024 * 1024);
        assert_eq!(buffer_size_for(u64::MAX), 1024 * 1024);
    }

    #[test]
    fn test_static_patterns_on_construction() {
        let zero = PatternSource::new(EraseMode::Zero, 512);
        assert!(zero.buffer().iter().all(|&b| b == 0x00));

        let one = PatternSource::new(EraseMode::One, 512);
        assert!(one.buffer().iter().all(|&b| b == 0xFF));

        let alternate = PatternSource::new(EraseMode::Alternate, 512);
        assert!(alternate.buffer().iter().all(|&b| b == 0xAA));
        assert_eq!(alternate.len(), 512);
    }

    #[test]
    fn test_static_fill_is_noop() {
        let mut source = PatternSource::new(EraseMode::Alternate, 64);
        source.fill().unwrap();
        source.fill().unwrap();
        assert!(source.buffer().iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_random_fill_changes_buffer() {
        for mode in [EraseMode::FastRandom, EraseMode::SecureRandom] {
            let mut source = PatternSource::new(mode, 4096);
            source.fill().unwrap();
            let first = source.buffer().to_vec();
            source.fill().unwrap();
            // Two 4 KiB draws colliding would mean a broken generator
            assert_ne!(first, source.buffer());
            assert!(first.iter().any(|&b| b != 0));
        }
    }

    #[test]
    fn test_for_target_uses_threshold() {
        let small = PatternSource::for_target(EraseMode::Zero, 10_000);
        assert_eq!(small.len(), 512);
        let large = PatternSource::for_target(EraseMode::Zero, 4_000_000_000);
        assert_eq!(large.len(), 1024 * 1024);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("zero".parse::<EraseMode>().unwrap(), EraseMode::Zero);
        assert_eq!("ONE".parse::<EraseMode>().unwrap(), EraseMode::One);
        assert_eq!("alternate".parse::<EraseMode>().unwrap(), EraseMode::Alternate);
        assert_eq!("random".parse::<EraseMode>().unwrap(), EraseMode::FastRandom);
        assert_eq!("fast_random".parse::<EraseMode>().unwrap(), EraseMode::FastRandom);
        assert_eq!("RandomCrypto".parse::<EraseMode>().unwrap(), EraseMode::SecureRandom);
        assert!("dod".parse::<EraseMode>().is_err());
    }

    #[test]
    fn test_mode_display_roundtrip() {
        for mode in EraseMode::all() {
            assert_eq!(mode.to_string().parse::<EraseMode>().unwrap(), *mode);
        }
    }

    #[test]
    fn test_mode_next_cycles() {
        let mut mode = EraseMode::Zero;
        for _ in 0..EraseMode::all().len() {
            mode = mode.next();
        }
        assert_eq!(mode, EraseMode::Zero);
        assert_eq!(EraseMode::SecureRandom.next(), EraseMode::Zero);
    }

    #[test]
    fn test_mode_descriptions() {
        assert_eq!(EraseMode::Zero.description(), "Write all zeros");
        assert_eq!(
            EraseMode::SecureRandom.description(),
            "Write cryptographically secure random data"
        );
        assert!(EraseMode::FastRandom.is_random());
        assert!(!EraseMode::One.is_random());
    }
}
