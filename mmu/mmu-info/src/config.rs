use crate::ConfigError;
use core::fmt;
use core::str::FromStr;

/// Translation granule: the base page size of the translation scheme.
///
/// Tables occupy exactly one granule and hold 8-byte descriptors, so the
/// number of entries per full table is `bytes() / 8`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Granule {
    /// 4 KiB pages, 512 entries per table.
    Size4K,
    /// 16 KiB pages, 2048 entries per table.
    Size16K,
    /// 64 KiB pages, 8192 entries per table.
    Size64K,
}

impl Granule {
    /// Granule size in bytes (power of two).
    #[must_use]
    pub const fn bytes(self) -> u64 {
        1 << self.shift()
    }

    /// log2 of [`bytes`](Self::bytes), i.e. the number of page offset bits.
    #[must_use]
    pub const fn shift(self) -> u32 {
        match self {
            Self::Size4K => 12,
            Self::Size16K => 14,
            Self::Size64K => 16,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Size4K => "4K",
            Self::Size16K => "16K",
            Self::Size64K => "64K",
        }
    }
}

impl fmt::Display for Granule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "4K" | "4k" => Ok(Self::Size4K),
            "16K" | "16k" => Ok(Self::Size16K),
            "64K" | "64k" => Ok(Self::Size64K),
            _ => Err(ConfigError::UnsupportedGranule),
        }
    }
}

/// Width of the translated address space in bits (`64 - T0SZ`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AddressSpaceBits {
    Bits32,
    Bits36,
    Bits40,
    Bits48,
}

impl AddressSpaceBits {
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Bits32 => 32,
            Self::Bits36 => 36,
            Self::Bits40 => 40,
            Self::Bits48 => 48,
        }
    }

    /// Size of the address space in bytes.
    #[must_use]
    pub const fn size(self) -> u64 {
        1 << self.bits()
    }
}

impl TryFrom<u32> for AddressSpaceBits {
    type Error = ConfigError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            32 => Ok(Self::Bits32),
            36 => Ok(Self::Bits36),
            40 => Ok(Self::Bits40),
            48 => Ok(Self::Bits48),
            other => Err(ConfigError::UnsupportedWidth(other)),
        }
    }
}

impl FromStr for AddressSpaceBits {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = s
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::UnsupportedWidth(0))?;
        Self::try_from(bits)
    }
}

impl fmt::Display for AddressSpaceBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Exception level whose translation regime is programmed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExceptionLevel {
    El1,
    El2,
    El3,
}

impl ExceptionLevel {
    #[must_use]
    pub const fn number(self) -> u32 {
        match self {
            Self::El1 => 1,
            Self::El2 => 2,
            Self::El3 => 3,
        }
    }

    /// Register name suffix, e.g. `el2` for `tcr_el2`.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::El1 => "el1",
            Self::El2 => "el2",
            Self::El3 => "el3",
        }
    }
}

impl TryFrom<u32> for ExceptionLevel {
    type Error = ConfigError;

    fn try_from(el: u32) -> Result<Self, Self::Error> {
        match el {
            1 => Ok(Self::El1),
            2 => Ok(Self::El2),
            3 => Ok(Self::El3),
            other => Err(ConfigError::UnsupportedLevel(other)),
        }
    }
}

impl FromStr for ExceptionLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix("EL")
            .or_else(|| s.strip_prefix("el"))
            .unwrap_or(s);
        let el = s.parse::<u32>().map_err(|_| ConfigError::UnsupportedLevel(0))?;
        Self::try_from(el)
    }
}

impl fmt::Display for ExceptionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}
