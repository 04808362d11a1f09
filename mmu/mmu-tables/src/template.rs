//! # Descriptor Templates
//!
//! Leaf descriptors differ only in their output address once the memory type
//! and the descriptor level are known. The [`TemplateBank`] holds the four
//! attribute patterns for one exception level:
//!
//! | Kind   | AttrIndx | SH    | Execute        |
//! |:-------|:---------|:------|:---------------|
//! | Device | 1 (nGnRnE) | non-shareable | never (`XN`, or `PXN` at EL1) |
//! | Normal | 0 (WB RAWA) | inner shareable | allowed |
//!
//! Every template is valid, has the access flag set, read/write access at the
//! current EL, `NS = 0` and no contiguous hint.

use crate::region::MemoryKind;
use mmu_info::ExceptionLevel;
use mmu_registers::descriptor::shareability;
use mmu_registers::{BlockPageDescriptor, mair};

/// Whether a leaf sits above level 3 (block) or at level 3 (page).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DescriptorLeaf {
    Block,
    Page,
}

impl DescriptorLeaf {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Block => "BLOCK",
            Self::Page => "PAGE",
        }
    }
}

/// A leaf descriptor with its output address bits clear.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DescriptorTemplate {
    kind: MemoryKind,
    leaf: DescriptorLeaf,
    bits: BlockPageDescriptor,
}

impl DescriptorTemplate {
    #[must_use]
    pub const fn kind(&self) -> MemoryKind {
        self.kind
    }

    #[must_use]
    pub const fn leaf(&self) -> DescriptorLeaf {
        self.leaf
    }

    /// The raw attribute bits.
    #[must_use]
    pub const fn bits(&self) -> u64 {
        self.bits.into_bits()
    }

    /// Combine the template with a granule aligned output address.
    #[must_use]
    pub const fn descriptor(&self, output_address: u64) -> u64 {
        self.bits.with_output_address(output_address).into_bits()
    }
}

/// The four leaf templates for one exception level.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TemplateBank {
    device_block: DescriptorTemplate,
    device_page: DescriptorTemplate,
    normal_block: DescriptorTemplate,
    normal_page: DescriptorTemplate,
}

impl TemplateBank {
    #[must_use]
    pub const fn new(el: ExceptionLevel) -> Self {
        Self {
            device_block: template(MemoryKind::Device, DescriptorLeaf::Block, el),
            device_page: template(MemoryKind::Device, DescriptorLeaf::Page, el),
            normal_block: template(MemoryKind::Normal, DescriptorLeaf::Block, el),
            normal_page: template(MemoryKind::Normal, DescriptorLeaf::Page, el),
        }
    }

    #[must_use]
    pub const fn get(&self, kind: MemoryKind, leaf: DescriptorLeaf) -> DescriptorTemplate {
        match (kind, leaf) {
            (MemoryKind::Device, DescriptorLeaf::Block) => self.device_block,
            (MemoryKind::Device, DescriptorLeaf::Page) => self.device_page,
            (MemoryKind::Normal, DescriptorLeaf::Block) => self.normal_block,
            (MemoryKind::Normal, DescriptorLeaf::Page) => self.normal_page,
        }
    }

    /// All templates in a fixed order: Device block, Device page, Normal block, Normal page.
    #[must_use]
    pub const fn all(&self) -> [DescriptorTemplate; 4] {
        [
            self.device_block,
            self.device_page,
            self.normal_block,
            self.normal_page,
        ]
    }
}

const fn template(kind: MemoryKind, leaf: DescriptorLeaf, el: ExceptionLevel) -> DescriptorTemplate {
    let base = BlockPageDescriptor::new()
        .with_valid(true)
        .with_page(matches!(leaf, DescriptorLeaf::Page))
        .with_access_flag(true);

    let bits = match kind {
        MemoryKind::Device => {
            let device = base
                .with_attr_index(mair::DEVICE_INDEX)
                .with_shareability(shareability::NON_SHAREABLE);
            match el {
                ExceptionLevel::El1 => device.with_privileged_execute_never(true),
                ExceptionLevel::El2 | ExceptionLevel::El3 => device.with_execute_never(true),
            }
        }
        MemoryKind::Normal => base
            .with_attr_index(mair::NORMAL_INDEX)
            .with_shareability(shareability::INNER_SHAREABLE),
    };

    DescriptorTemplate { kind, leaf, bits }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn el2_templates() {
        let bank = TemplateBank::new(ExceptionLevel::El2);
        assert_eq!(
            bank.get(MemoryKind::Device, DescriptorLeaf::Block).bits(),
            0x0040_0000_0000_0405
        );
        assert_eq!(
            bank.get(MemoryKind::Device, DescriptorLeaf::Page).bits(),
            0x0040_0000_0000_0407
        );
        assert_eq!(bank.get(MemoryKind::Normal, DescriptorLeaf::Block).bits(), 0x701);
        assert_eq!(bank.get(MemoryKind::Normal, DescriptorLeaf::Page).bits(), 0x703);
    }

    #[test]
    fn el1_device_uses_pxn() {
        let bank = TemplateBank::new(ExceptionLevel::El1);
        assert_eq!(
            bank.get(MemoryKind::Device, DescriptorLeaf::Block).bits(),
            0x0020_0000_0000_0405
        );
        assert_eq!(bank.get(MemoryKind::Normal, DescriptorLeaf::Page).bits(), 0x703);
    }

    #[test]
    fn el3_matches_el2() {
        assert_eq!(
            TemplateBank::new(ExceptionLevel::El3),
            TemplateBank::new(ExceptionLevel::El2)
        );
    }

    #[test]
    fn descriptor_adds_output_address() {
        let t = TemplateBank::new(ExceptionLevel::El2).get(MemoryKind::Normal, DescriptorLeaf::Block);
        assert_eq!(t.descriptor(0x8000_0000), 0x8000_0701);
        assert_eq!(t.kind(), MemoryKind::Normal);
        assert_eq!(t.leaf(), DescriptorLeaf::Block);
    }
}
