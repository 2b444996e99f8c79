//! Utilities for `str` and `[u8]`

use memchr::memchr_iter;

/// Splits a byte slice by a delimiter using [`memchr::memchr_iter`], excluding empty substrings.
#[inline]
pub(crate) fn memchr_split_nonempty(delimiter: u8, value: &[u8]) -> MemchrSplitNonEmpty<'_> {
    MemchrSplitNonEmpty {
        value,
        iter: memchr_iter(delimiter, value),
        last: 0,
    }
}

/// Iterates over the trimmed, non-empty items of a comma-separated header value,
/// e.g. `Vary`, `Allow` or `If-None-Match`.
#[inline]
pub(crate) fn split_list(value: &str) -> impl Iterator<Item = &str> {
    memchr_split_nonempty(b',', value.as_bytes())
        .filter_map(|item| std::str::from_utf8(item).ok())
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

/// An iterator over the substrings of a byte slice separated by a delimiter,
/// excluding empty substrings.
pub(crate) struct MemchrSplitNonEmpty<'a> {
    value: &'a [u8],
    iter: memchr::Memchr<'a>,
    last: usize,
}

impl<'a> Iterator for MemchrSplitNonEmpty<'a> {
    type Item = &'a [u8];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for pos in self.iter.by_ref() {
            let start = self.last;
            self.last = pos + 1;

            if pos > start {
                return Some(&self.value[start..pos]);
            }
        }

        let start = self.last;
        if start < self.value.len() {
            self.last = self.value.len();
            return Some(&self.value[start..]);
        }

        None
    }
}
