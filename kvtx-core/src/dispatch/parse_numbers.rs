use std::str::{self, FromStr};

fn parse_ascii<T: FromStr>(payload: &[u8]) -> Option<T> {
    str::from_utf8(payload).ok()?.parse().ok()
}

/// Parses a signed 64-bit integer argument such as an `INCRBY` delta or an `LRANGE` index.
pub(super) fn parse_signed(payload: &[u8]) -> Option<i64> {
    parse_ascii(payload)
}

/// Parses a non-negative element count such as the optional `LPOP` count.
pub(super) fn parse_count(payload: &[u8]) -> Option<usize> {
    parse_ascii(payload)
}

/// Resolves inclusive `start..=end` list indexes, negative ones counting from the tail.
///
/// Returns `None` when the clamped range selects nothing.
pub(super) fn resolve_inclusive_range(start: i64, end: i64, len: usize) -> Option<(usize, usize)> {
    let len = i64::try_from(len).ok()?;
    let from_tail = |index: i64| if index < 0 { len.saturating_add(index) } else { index };

    let start = from_tail(start).max(0);
    let end = from_tail(end).min(len - 1);
    if start > end {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(end).ok()?))
}
