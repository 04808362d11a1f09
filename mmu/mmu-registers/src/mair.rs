use bitfield_struct::bitfield;

/// Normal memory, Inner/Outer Write-Back Non-transient, Read-Allocate Write-Allocate.
pub const NORMAL_WB_RAWA: u8 = 0xFF;

/// Device-nGnRnE memory.
pub const DEVICE_NGNRNE: u8 = 0x00;

/// `AttrIndx` used by Normal descriptors.
pub const NORMAL_INDEX: u8 = 0;

/// `AttrIndx` used by Device descriptors.
pub const DEVICE_INDEX: u8 = 1;

/// Memory Attribute Indirection Register: eight 8-bit attribute slots.
#[bitfield(u64)]
#[derive(Eq, PartialEq)]
pub struct Mair {
    pub attr0: u8,
    pub attr1: u8,
    pub attr2: u8,
    pub attr3: u8,
    pub attr4: u8,
    pub attr5: u8,
    pub attr6: u8,
    pub attr7: u8,
}

impl Mair {
    /// The two attributes referenced by the descriptor templates.
    #[must_use]
    pub const fn identity_map() -> Self {
        Self::new()
            .with_attr0(NORMAL_WB_RAWA)
            .with_attr1(DEVICE_NGNRNE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_map_value() {
        assert_eq!(Mair::identity_map().into_bits(), 0xFF);
    }
}
