//! Revision-id parsing and collation (`<generation>-<suffix>`).

use std::cmp::Ordering;

/// Split a revision id into its generation and suffix.
pub fn parse(rev_id: &str) -> Option<(u64, &str)> {
    let (gen, suffix) = rev_id.split_once('-')?;
    if gen.is_empty() || suffix.is_empty() || !gen.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let gen: u64 = gen.parse().ok()?;
    if gen == 0 {
        return None;
    }
    Some((gen, suffix))
}

pub fn generation(rev_id: &str) -> Option<u64> {
    parse(rev_id).map(|(gen, _)| gen)
}

/// Total order over revision ids: generation numerically, then suffix bytewise.
/// Ids that do not parse sort after every id that does, among themselves bytewise.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Some((ga, sa)), Some((gb, sb))) => ga.cmp(&gb).then_with(|| sa.as_bytes().cmp(sb.as_bytes())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.as_bytes().cmp(b.as_bytes()),
    }
}
