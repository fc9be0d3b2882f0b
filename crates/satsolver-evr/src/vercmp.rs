//! Segment-wise version string comparison

use std::cmp::Ordering;

/// Compare two version (or release) strings the way rpm does.
///
/// Both strings are split into alternating runs of digits and letters;
/// any other character only separates runs. Numeric runs compare as
/// integers, alphabetic runs compare bytewise, and a numeric run is newer
/// than an alphabetic one. When one string runs out of segments first, the
/// one with segments left is newer, so `1.0 < 1.0a < 1.1`. A `~` sorts
/// before everything (pre-releases), a `^` sorts after the end of a string
/// but before any further segment (post-release snapshots).
pub fn vercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0usize, 0usize);

    loop {
        i = skip_separators(a, i);
        j = skip_separators(b, j);

        let ca = a.get(i).copied();
        let cb = b.get(j).copied();

        if ca == Some(b'~') || cb == Some(b'~') {
            if ca != Some(b'~') {
                return Ordering::Greater;
            }
            if cb != Some(b'~') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if ca == Some(b'^') || cb == Some(b'^') {
            if ca.is_none() {
                return Ordering::Less;
            }
            if cb.is_none() {
                return Ordering::Greater;
            }
            if ca != Some(b'^') {
                return Ordering::Greater;
            }
            if cb != Some(b'^') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if i >= a.len() || j >= b.len() {
            break;
        }

        let numeric = a[i].is_ascii_digit();
        let seg_a = take_run(a, &mut i, numeric);
        let seg_b = take_run(b, &mut j, numeric);

        // Different run types: digits are newer than letters
        if seg_b.is_empty() {
            return if numeric { Ordering::Greater } else { Ordering::Less };
        }

        let ord = if numeric {
            compare_numeric(seg_a, seg_b)
        } else {
            seg_a.cmp(seg_b)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    match (i >= a.len(), j >= b.len()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

fn skip_separators(s: &[u8], mut pos: usize) -> usize {
    while pos < s.len() && !s[pos].is_ascii_alphanumeric() && s[pos] != b'~' && s[pos] != b'^' {
        pos += 1;
    }
    pos
}

fn take_run<'s>(s: &'s [u8], pos: &mut usize, numeric: bool) -> &'s [u8] {
    let start = *pos;
    while *pos < s.len() {
        let c = s[*pos];
        let in_run = if numeric { c.is_ascii_digit() } else { c.is_ascii_alphabetic() };
        if !in_run {
            break;
        }
        *pos += 1;
    }
    &s[start..*pos]
}

/// Integer comparison of two digit runs of arbitrary length
fn compare_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let a = trim_leading_zeros(a);
    let b = trim_leading_zeros(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn trim_leading_zeros(s: &[u8]) -> &[u8] {
    let first = s.iter().position(|&c| c != b'0').unwrap_or(s.len());
    &s[first..]
}
