use bitfield_struct::bitfield;
use mmu_info::ExceptionLevel;

/// Model of `SCTLR_ELx` restricted to the bits this tool programs.
///
/// Named RES1 fields are private; [`Sctlr::enable_mmu`] sets the ones that
/// apply to the chosen exception level.
#[bitfield(u64)]
#[derive(Eq, PartialEq)]
pub struct Sctlr {
    /// Bit 0 — MMU enable for this translation regime.
    pub m_mmu: bool,
    /// Bit 1 — Alignment check.
    pub a_alignment_check: bool,
    /// Bit 2 — Data accesses cacheable as described by the tables.
    pub c_data_cache: bool,
    /// Bit 3 — Stack alignment check.
    pub sa_stack_alignment: bool,
    /// Bits 4–5 — RES1 at EL2/EL3 (`SA0`/`CP15BEN` at EL1).
    #[bits(2)]
    res1_4_5: u8,
    #[bits(5)]
    __res6_10: u8,
    /// Bit 11 — RES1.
    res1_11: bool,
    /// Bit 12 — Instruction accesses cacheable.
    pub i_instruction_cache: bool,
    #[bits(3)]
    __res13_15: u8,
    res1_16: bool,
    #[bits(1)]
    __res17: u8,
    res1_18: bool,
    #[bits(1)]
    __res19: u8,
    /// Bit 20 — RES1 at EL1 only.
    res1_20: bool,
    #[bits(1)]
    __res21: u8,
    #[bits(2)]
    res1_22_23: u8,
    #[bits(1)]
    __res24: u8,
    /// Bit 25 — Big-endian data accesses; kept clear.
    pub ee_big_endian: bool,
    #[bits(2)]
    __res26_27: u8,
    #[bits(2)]
    res1_28_29: u8,
    #[bits(34)]
    __res30_63: u64,
}

impl Sctlr {
    /// MMU, data cache and instruction cache on, little endian.
    #[must_use]
    pub const fn enable_mmu(el: ExceptionLevel) -> Self {
        let reg = Self::new()
            .with_m_mmu(true)
            .with_c_data_cache(true)
            .with_i_instruction_cache(true)
            .with_ee_big_endian(false)
            .with_res1_4_5(0b11)
            .with_res1_11(true)
            .with_res1_16(true)
            .with_res1_18(true)
            .with_res1_22_23(0b11)
            .with_res1_28_29(0b11);
        match el {
            ExceptionLevel::El1 => reg.with_res1_20(true),
            ExceptionLevel::El2 | ExceptionLevel::El3 => reg,
        }
    }
}
