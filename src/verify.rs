/// Character-level comparison of expected text against what actually
/// landed in a sink.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Difference {
    pub position: usize,
    pub expected: Option<char>,
    pub actual: Option<char>,
}

/// Index of the first position where the texts diverge, counting chars.
/// `None` when they match exactly, including length.
pub fn first_divergence(expected: &str, actual: &str) -> Option<usize> {
    let mut expected_chars = expected.chars();
    let mut actual_chars = actual.chars();
    let mut idx = 0usize;
    loop {
        match (expected_chars.next(), actual_chars.next()) {
            (None, None) => return None,
            (Some(e), Some(a)) if e == a => idx += 1,
            _ => return Some(idx),
        }
    }
}

pub fn matches(expected: &str, actual: &str) -> bool {
    first_divergence(expected, actual).is_none()
}

/// Mismatching positions, capped at `limit` entries. A `None` side means
/// one text ended before the other.
pub fn differences(expected: &str, actual: &str, limit: usize) -> Vec<Difference> {
    let mut out = Vec::new();
    let mut expected_chars = expected.chars();
    let mut actual_chars = actual.chars();
    let mut idx = 0usize;

    loop {
        if out.len() >= limit {
            break;
        }
        match (expected_chars.next(), actual_chars.next()) {
            (None, None) => break,
            (e, a) => {
                if e != a {
                    out.push(Difference {
                        position: idx,
                        expected: e,
                        actual: a,
                    });
                }
                idx += 1;
            }
        }
    }

    out
}
