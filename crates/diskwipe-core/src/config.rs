//! Wipe policy
//!
//! Decides whether a device may be targeted at all. The policy is checked by
//! the caller before an erase run starts; the engine never consults it.

use crate::pattern::EraseMode;

/// Why the policy refused a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The media type could not be determined
    UnknownMedia,
    /// The device is a fixed disk and fixed disks are not allowed
    FixedDiskDisallowed,
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Denial::UnknownMedia => write!(f, "Media type is unknown."),
            Denial::FixedDiskDisallowed => write!(f, "Fixed disks are disallowed."),
        }
    }
}

/// Caller-facing erase policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    /// Allow non-removable media to be erased
    pub allow_fixed_disk: bool,

    /// Pattern used for new runs
    pub mode: EraseMode,
}

impl Policy {
    /// Create a policy with defaults (removable media only, zero fill)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether fixed disks may be erased
    pub fn allow_fixed_disk(mut self, allow: bool) -> Self {
        self.allow_fixed_disk = allow;
        self
    }

    /// Set the erase mode
    pub fn mode(mut self, mode: EraseMode) -> Self {
        self.mode = mode;
        self
    }

    /// Check a media description such as `Removable Media` or `Fixed hard disk media`
    ///
    /// Unknown media is always refused. Removable and floppy media are always
    /// accepted; everything else only when fixed disks are allowed.
    pub fn check(&self, media_class: &str) -> Result<(), Denial> {
        let media = media_class.to_lowercase();

        if media.is_empty() || media.contains("unknown") {
            return Err(Denial::UnknownMedia);
        }

        if self.allow_fixed_disk || media.contains("removable") || media.contains("floppy") {
            Ok(())
        } else {
            Err(Denial::FixedDiskDisallowed)
        }
    }

    /// Whether a device with this media description may be erased
    pub fn can_wipe(&self, media_class: &str) -> bool {
        self.check(media_class).is_ok()
    }
}
