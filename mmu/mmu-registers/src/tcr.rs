use bitfield_struct::bitfield;
use mmu_info::{AddressSpaceBits, ExceptionLevel, GeneratorConfig, Granule};

/// Cacheability encoding for table walks: Normal, Write-Back Read-Allocate Write-Allocate.
pub const WALK_CACHE_WB_RAWA: u8 = 0b01;

/// Shareability encoding for table walks: Inner Shareable.
pub const WALK_INNER_SHAREABLE: u8 = 0b11;

/// Architectural model of `TCR_EL1`.
///
/// Only the TTBR0 half is configured; the TTBR1 walk is disabled through
/// `EPD1`.
#[bitfield(u64)]
#[derive(Eq, PartialEq)]
pub struct TcrEl1 {
    /// Bits 0–5 — Size offset of the TTBR0 region (`64 - width`).
    #[bits(6)]
    pub t0sz: u8,
    #[bits(1)]
    __res6: u8,
    /// Bit 7 — Disable TTBR0 walks.
    pub epd0: bool,
    /// Bits 8–9 — Inner cacheability of TTBR0 walks.
    #[bits(2)]
    pub irgn0: u8,
    /// Bits 10–11 — Outer cacheability of TTBR0 walks.
    #[bits(2)]
    pub orgn0: u8,
    /// Bits 12–13 — Shareability of TTBR0 walks.
    #[bits(2)]
    pub sh0: u8,
    /// Bits 14–15 — TTBR0 granule (`TG0` encoding).
    #[bits(2)]
    pub tg0: u8,
    /// Bits 16–21 — Size offset of the TTBR1 region.
    #[bits(6)]
    pub t1sz: u8,
    /// Bit 22 — ASID select.
    pub a1: bool,
    /// Bit 23 — Disable TTBR1 walks.
    pub epd1: bool,
    #[bits(2)]
    pub irgn1: u8,
    #[bits(2)]
    pub orgn1: u8,
    #[bits(2)]
    pub sh1: u8,
    #[bits(2)]
    pub tg1: u8,
    /// Bits 32–34 — Intermediate physical address size.
    #[bits(3)]
    pub ips: u8,
    #[bits(1)]
    __res35: u8,
    /// Bit 36 — 16-bit ASIDs.
    pub asid_16: bool,
    pub tbi0: bool,
    pub tbi1: bool,
    /// Bits 39–63 — Not configured.
    #[bits(25)]
    __res39_63: u32,
}

/// Architectural model of `TCR_EL2` (with `HCR_EL2.E2H == 0`) and `TCR_EL3`,
/// which share a layout.
#[bitfield(u64)]
#[derive(Eq, PartialEq)]
pub struct TcrEl23 {
    /// Bits 0–5 — Size offset of the TTBR0 region (`64 - width`).
    #[bits(6)]
    pub t0sz: u8,
    #[bits(2)]
    __res6_7: u8,
    #[bits(2)]
    pub irgn0: u8,
    #[bits(2)]
    pub orgn0: u8,
    #[bits(2)]
    pub sh0: u8,
    #[bits(2)]
    pub tg0: u8,
    /// Bits 16–18 — Physical address size.
    #[bits(3)]
    pub ps: u8,
    #[bits(1)]
    __res19: u8,
    pub tbi: bool,
    pub ha: bool,
    pub hd: bool,
    /// Bit 23 — RES1.
    res1_23: bool,
    pub hpd: bool,
    #[bits(4)]
    pub hwu: u8,
    pub tbid: bool,
    pub tcma: bool,
    /// Bit 31 — RES1.
    res1_31: bool,
    #[bits(32)]
    __res32_63: u32,
}

/// `TG0` encoding of a granule. Note the non-monotonic order.
#[must_use]
pub const fn tg0(granule: Granule) -> u8 {
    match granule {
        Granule::Size4K => 0b00,
        Granule::Size64K => 0b01,
        Granule::Size16K => 0b10,
    }
}

/// `PS`/`IPS` encoding of an address space width.
#[must_use]
pub const fn physical_size(width: AddressSpaceBits) -> u8 {
    match width {
        AddressSpaceBits::Bits32 => 0b000,
        AddressSpaceBits::Bits36 => 0b001,
        AddressSpaceBits::Bits40 => 0b010,
        AddressSpaceBits::Bits48 => 0b101,
    }
}

/// `T0SZ` for an address space width.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn t0sz(width: AddressSpaceBits) -> u8 {
    (64 - width.bits()) as u8
}

impl TcrEl1 {
    #[must_use]
    pub const fn for_config(config: &GeneratorConfig) -> Self {
        Self::new()
            .with_t0sz(t0sz(config.address_space()))
            .with_irgn0(WALK_CACHE_WB_RAWA)
            .with_orgn0(WALK_CACHE_WB_RAWA)
            .with_sh0(WALK_INNER_SHAREABLE)
            .with_tg0(tg0(config.granule()))
            .with_epd1(true)
            .with_ips(physical_size(config.address_space()))
    }
}

impl TcrEl23 {
    #[must_use]
    pub const fn for_config(config: &GeneratorConfig) -> Self {
        Self::new()
            .with_t0sz(t0sz(config.address_space()))
            .with_irgn0(WALK_CACHE_WB_RAWA)
            .with_orgn0(WALK_CACHE_WB_RAWA)
            .with_sh0(WALK_INNER_SHAREABLE)
            .with_tg0(tg0(config.granule()))
            .with_ps(physical_size(config.address_space()))
            .with_res1_23(true)
            .with_res1_31(true)
    }
}

/// Raw `TCR_ELx` value for the configured exception level.
#[must_use]
pub const fn translation_control(config: &GeneratorConfig) -> u64 {
    match config.exception_level() {
        ExceptionLevel::El1 => TcrEl1::for_config(config).into_bits(),
        ExceptionLevel::El2 | ExceptionLevel::El3 => TcrEl23::for_config(config).into_bits(),
    }
}
