pub mod lcs;

/// One page of a cursor based iteration over `items`. The returned cursor is the offset of the
/// next page, or `0` once the iteration is complete.
pub fn scan_page<T>(items: &[T], cursor: usize, count: usize) -> (usize, &[T]) {
    let start = cursor.min(items.len());
    let end = start.saturating_add(count).min(items.len());
    let next = if end >= items.len() { 0 } else { end };

    (next, &items[start..end])
}

/// Resolves an inclusive `start..=end` range with negative offsets counted from the end, the way
/// string and list ranges are addressed. Returns `None` when the range is empty.
pub fn clamp_range(start: i64, end: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let end = if end < 0 { len + end } else { end.min(len - 1) };

    if start > end || start >= len {
        None
    } else {
        Some((start as usize, end as usize))
    }
}
