//! # VMSAv8-64 Translation Table Descriptors
//!
//! Two 64-bit formats are modelled:
//!
//! - [`BlockPageDescriptor`]: a **leaf**. At level 1/2 (`bit1 = 0`) it is a
//!   block descriptor, at level 3 (`bit1 = 1`) a page descriptor.
//! - [`TableDescriptor`]: a **non-leaf** at level 0..2 (`bit1 = 1`) pointing
//!   to the next-level table.
//!
//! ```text
//! | 63‒59 | 58‒55 | 54 | 53  | 52   | 51‒48 | 47‒12  | 11 | 10 | 9‒8 | 7‒6 | 5  | 4‒2      | 1    | 0     |
//! |  ign  |  SW   | XN | PXN | Cont |  res0 | OA     | nG | AF | SH  | AP  | NS | AttrIndx | page | valid |
//! ```
//!
//! Output and next-table addresses are stored as bits 47:12 of a granule
//! aligned address; with 16K/64K granules the low bits are zero anyway.

use bitfield_struct::bitfield;

/// Mask selecting address bits 47:12.
pub const OUTPUT_ADDRESS_MASK: u64 = 0x0000_ffff_ffff_f000;

/// Shareability field encodings (`SH[1:0]`).
pub mod shareability {
    pub const NON_SHAREABLE: u8 = 0b00;
    pub const OUTER_SHAREABLE: u8 = 0b10;
    pub const INNER_SHAREABLE: u8 = 0b11;
}

/// Leaf descriptor: block (level 1/2) or page (level 3).
#[bitfield(u64)]
#[derive(PartialEq, Eq, Hash)]
pub struct BlockPageDescriptor {
    /// Valid (bit 0).
    pub valid: bool,
    /// Descriptor type (bit 1): `0` = block, `1` = page (level 3 only).
    pub page: bool,
    /// Index into `MAIR_ELx` (bits 2..4).
    #[bits(3)]
    pub attr_index: u8,
    /// Non-secure output address (bit 5). Always `0` here: Secure state.
    pub non_secure: bool,
    /// Data access permissions (bits 6..7); `00` = read/write at the current EL.
    #[bits(2)]
    pub access_permissions: u8,
    /// Shareability (bits 8..9), see [`shareability`].
    #[bits(2)]
    pub shareability: u8,
    /// Access flag (bit 10); set to avoid access flag faults.
    pub access_flag: bool,
    /// Not global (bit 11).
    pub not_global: bool,
    /// Output address bits 47:12.
    #[bits(36)]
    output_address_47_12: u64,
    /// Reserved for 52-bit output addresses (bits 48..51).
    #[bits(4)]
    __res48_51: u8,
    /// Contiguous hint (bit 52).
    pub contiguous: bool,
    /// Privileged execute-never (bit 53). Used as the EL1 execute-never control.
    pub privileged_execute_never: bool,
    /// Execute-never (bit 54). `UXN` at EL1, `XN` at EL2/EL3.
    pub execute_never: bool,
    /// Reserved for software use (bits 55..58).
    #[bits(4)]
    pub software: u8,
    /// Ignored by hardware (bits 59..63).
    #[bits(5)]
    __ignored_59_63: u8,
}

impl BlockPageDescriptor {
    /// Place a granule aligned output address into bits 47:12.
    #[inline]
    #[must_use]
    pub const fn with_output_address(mut self, address: u64) -> Self {
        self.set_output_address(address);
        self
    }

    #[inline]
    pub const fn set_output_address(&mut self, address: u64) {
        self.set_output_address_47_12((address & OUTPUT_ADDRESS_MASK) >> 12);
    }

    #[inline]
    #[must_use]
    pub const fn output_address(self) -> u64 {
        self.output_address_47_12() << 12
    }
}

/// Non-leaf descriptor pointing to a next-level table.
#[bitfield(u64)]
#[derive(PartialEq, Eq, Hash)]
pub struct TableDescriptor {
    /// Valid (bit 0).
    pub valid: bool,
    /// Descriptor type (bit 1): must be `1` for a table descriptor.
    pub table: bool,
    /// Ignored by hardware (bits 2..11).
    #[bits(10)]
    __ignored_2_11: u16,
    /// Next-level table address bits 47:12.
    #[bits(36)]
    next_table_47_12: u64,
    /// Reserved (bits 48..51).
    #[bits(4)]
    __res48_51: u8,
    /// Ignored by hardware (bits 52..58).
    #[bits(7)]
    __ignored_52_58: u8,
    /// Hierarchical PXN (bit 59).
    pub pxn_table: bool,
    /// Hierarchical XN / UXN (bit 60).
    pub xn_table: bool,
    /// Hierarchical access permissions (bits 61..62).
    #[bits(2)]
    pub ap_table: u8,
    /// Hierarchical NS (bit 63).
    pub ns_table: bool,
}

impl TableDescriptor {
    /// Valid table descriptor (`0b11`) pointing at the table at `next_table`.
    #[inline]
    #[must_use]
    pub const fn pointing_to(next_table: u64) -> Self {
        Self::new()
            .with_valid(true)
            .with_table(true)
            .with_next_table_47_12((next_table & OUTPUT_ADDRESS_MASK) >> 12)
    }

    #[inline]
    #[must_use]
    pub const fn next_table(self) -> u64 {
        self.next_table_47_12() << 12
    }
}
