//! Predicate-driven binary search over index ranges.
//!
//! Used by the directory scan to find the resume point in a sorted listing.

/// Return the rightmost index in the closed range `[lo, hi]` for which `le`
/// holds, or `None` if it holds nowhere (including when `hi < lo`).
///
/// `le` must be monotonic over the range: true up to some threshold, false
/// afterwards. For a non-monotonic predicate the result is some index where
/// `le` holds, but not necessarily the rightmost one.
pub fn rightmost_by<F>(lo: usize, hi: usize, mut le: F) -> Option<usize>
where
    F: FnMut(usize) -> bool,
{
    if hi < lo {
        return None;
    }
    // Inclusive bounds throughout: `hi` may be usize::MAX.
    let (mut l, mut r) = (lo, hi);
    let mut found = None;
    loop {
        let m = l + (r - l) / 2;
        if le(m) {
            found = Some(m);
            if m == r {
                break;
            }
            l = m + 1;
        } else {
            if m == l {
                break;
            }
            r = m - 1;
        }
    }
    found
}

/// Index of the rightmost element of sorted `items` that is `<= target`.
///
/// Returns `None` for an empty slice or when every element exceeds `target`.
pub fn rightmost_le<T, Q>(items: &[T], target: &Q) -> Option<usize>
where
    T: PartialOrd<Q>,
    Q: ?Sized,
{
    if items.is_empty() {
        return None;
    }
    rightmost_by(0, items.len() - 1, |i| items[i] <= *target)
}
