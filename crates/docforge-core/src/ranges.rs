//! Page-range expressions
//!
//! Turns a human-authored selection such as `"1-3, 5, 7-9"` into the
//! zero-based page indices it names, relative to a known page count.
//!
//! Parsing is permissive: tokens that are malformed, reversed, or fall
//! outside `1..=max_page` contribute nothing and are not reported. An
//! empty result is the only failure signal, and deciding what to do with
//! it belongs to the caller.

use std::collections::BTreeSet;

/// Parse a page-range expression into sorted, distinct, zero-based indices.
///
/// Grammar: comma-separated tokens, each either `N` or `A-B` (1-based,
/// inclusive). Whitespace around tokens and around the dash is ignored.
///
/// ```
/// use docforge_core::parse_page_ranges;
///
/// assert_eq!(parse_page_ranges("1-3, 5", 10), vec![0, 1, 2, 4]);
/// assert_eq!(parse_page_ranges("3,1,2,1", 5), vec![0, 1, 2]);
/// assert_eq!(parse_page_ranges("1-100", 3), vec![0, 1, 2]);
/// ```
pub fn parse_page_ranges(expression: &str, max_page: u32) -> Vec<u32> {
    let mut indices = BTreeSet::new();

    if max_page == 0 {
        return Vec::new();
    }

    for token in expression.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        if let Some((start, end)) = token.split_once('-') {
            let (Some(start), Some(end)) = (parse_page_number(start), parse_page_number(end))
            else {
                continue;
            };
            if start > end {
                continue;
            }

            // Clamp before iterating so "1-4000000000" stays cheap
            let first = start.max(1);
            let last = end.min(u64::from(max_page));
            for page in first..=last {
                indices.insert((page - 1) as u32);
            }
        } else if let Some(page) = parse_page_number(token) {
            if (1..=u64::from(max_page)).contains(&page) {
                indices.insert((page - 1) as u32);
            }
        }
    }

    indices.into_iter().collect()
}

/// A page number is one or more ASCII digits, nothing else.
fn parse_page_number(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Saturate absurdly long digit runs; they are clipped to max_page anyway
    Some(raw.parse().unwrap_or(u64::MAX))
}
