//! Vendor/family ranges whose L2 is shared per core pair and exclusive of L3.
//!
//! CPUID on these parts reports the L2 size of one core-pair module, and the
//! L2 contents are not duplicated in L3, so both levels add capacity.

use std::ops::Range;

use crate::types::Vendor;

#[derive(Debug, Clone)]
pub struct ExclusivityErratum {
    pub vendor: Vendor,
    /// Extended (display) family, end exclusive.
    pub families: Range<u32>,
    pub note: &'static str,
}

pub const L2_EXCLUSIVE_ERRATA: &[ExclusivityErratum] = &[ExclusivityErratum {
    vendor: Vendor::Amd,
    families: 0x15..0x17,
    note: "AMD families 15h/16h: module-shared L2, exclusive of L3",
}];

pub fn find(vendor: Vendor, extended_family: u32) -> Option<&'static ExclusivityErratum> {
    L2_EXCLUSIVE_ERRATA
        .iter()
        .find(|e| e.vendor == vendor && e.families.contains(&extended_family))
}

/// True when `(vendor, extended_family)` falls in a known erratum range.
pub fn l2_exclusive(vendor: Vendor, extended_family: u32) -> bool {
    find(vendor, extended_family).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amd_bulldozer_and_jaguar_match() {
        assert!(l2_exclusive(Vendor::Amd, 0x15));
        assert!(l2_exclusive(Vendor::Amd, 0x16));
    }

    #[test]
    fn range_bounds_are_half_open() {
        assert!(!l2_exclusive(Vendor::Amd, 0x14));
        assert!(!l2_exclusive(Vendor::Amd, 0x17));
    }

    #[test]
    fn matching_entry_carries_its_note() {
        let e = find(Vendor::Amd, 0x15).unwrap();
        assert!(e.note.contains("15h"));
        assert!(find(Vendor::Amd, 0x19).is_none());
    }

    #[test]
    fn other_vendors_never_match() {
        assert!(!l2_exclusive(Vendor::Intel, 0x15));
        assert!(!l2_exclusive(Vendor::Other, 0x16));
    }
}
