use crate::models::BorrowSummaryEntry;

/// Aggregates shown above the borrow summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BorrowStats {
    /// Sum of borrowed quantities across all titles.
    pub total_borrowed: u64,
    pub unique_titles: usize
}

impl BorrowStats {
    pub fn from_entries(entries: &[BorrowSummaryEntry]) -> Self {
        BorrowStats {
            total_borrowed: entries
                .iter()
                .map(|entry| u64::from(entry.total_quantity))
                .sum(),
            unique_titles: entries.len()
        }
    }
}
