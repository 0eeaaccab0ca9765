use std::ops::RangeInclusive;

/// The page numbers to show around `current`.
///
/// At most `window` pages, kept inside `1..=total` and as centered on `current` as the edges
/// allow. `current` is clamped into range first. Returns an empty range when there are no
/// pages or the window is zero.
pub fn page_window(current: u32, total: u32, window: u32) -> RangeInclusive<u32> {
    if total == 0 || window == 0 {
        return RangeInclusive::new(1, 0);
    }
    let window = window.min(total);
    let current = current.max(1).min(total);

    let start = current.saturating_sub(window / 2).max(1);
    let start = start.min(total - window + 1);
    start..=start + window - 1
}
