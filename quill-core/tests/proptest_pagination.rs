//! Property tests for page metadata and page windows

use proptest::prelude::*;
use quill_core::{PageMetadata, PageRequest};

proptest! {
    /// last_page is the smallest number of pages covering every record
    #[test]
    fn last_page_covers_total(total in 1u64..1_000_000, page in 1u32..1_000, size in 1u32..=100) {
        let meta = PageMetadata::compute(total, page, size);

        prop_assert_eq!(meta.first_page, 1);
        prop_assert_eq!(meta.current_page, page);
        prop_assert_eq!(meta.total_records, total);
        prop_assert!(meta.last_page * size as u64 >= total);
        prop_assert!((meta.last_page - 1) * (size as u64) < total);
    }

    /// Consecutive pages tile the row range without gaps or overlap
    #[test]
    fn windows_are_contiguous(page in 1u32..10_000, size in 1u32..=100) {
        let this = PageRequest::new(page, size).unwrap();
        let next = PageRequest::new(page + 1, size).unwrap();

        prop_assert_eq!(this.offset() + this.limit(), next.offset());
    }

    #[test]
    fn zero_total_is_always_empty(page in 1u32..1_000, size in 1u32..=100) {
        prop_assert_eq!(PageMetadata::compute(0, page, size), PageMetadata::default());
    }
}
