use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A dotted positive-integer sequence, `v<n>(.<n>)*`. Partial order: `v5.7 < v5.7.1
/// < v5.8 < v6`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Version(Vec<u32>);

impl Version {
    pub fn new(components: Vec<u32>) -> Option<Version> {
        if components.is_empty() || components.iter().any(|c| *c == 0) {
            return None;
        }
        Some(Version(components))
    }

    /// Parses the canonical `v1.2.3` rendering.
    pub fn parse(s: &str) -> Option<Version> {
        let rest = s.strip_prefix('v')?;
        let mut components = Vec::new();
        for part in rest.split('.') {
            if part.is_empty() {
                return None;
            }
            components.push(part.parse::<u32>().ok()?);
        }
        Version::new(components)
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    pub fn canonical(&self) -> String {
        let mut s = String::from("v");
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                s.push('.');
            }
            s.push_str(&c.to_string());
        }
        s
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Dictionary order over the component sequence: a prefix sorts before any of its
/// extensions (`v5.7 < v5.7.1`), and components are compared numerically, not
/// lexicographically (`v5.9 < v5.10`).
impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Computes the unique next version at the given level. `level == 0` increments the
/// last component in place. `level` in `1..len(v)` increments the component at that
/// (1-indexed-from-left) position and truncates everything after it. `level >=
/// len(v)` introduces a new, deeper level by appending a trailing `1` (this is the one
/// position that can't be reached by in-place increment, since position `len(v)` is
/// already aliased to `level == 0`).
pub fn next_version(v: &Version, level: usize) -> Version {
    let components = v.components();
    let len = components.len();
    if level == 0 {
        let mut out = components.to_vec();
        let last = out.len() - 1;
        out[last] += 1;
        Version(out)
    } else if level < len {
        let mut out = components[..level].to_vec();
        let last = out.len() - 1;
        out[last] += 1;
        Version(out)
    } else {
        let mut out = components.to_vec();
        out.push(1);
        Version(out)
    }
}

/// True iff `next` differs from `current` at exactly one position, that position is
/// the last of `next`, and either `next` is a truncation-and-increment of `current`
/// (`next[last] == current[last] + 1`) or `next` extends `current` by one trailing
/// `1`.
pub fn is_valid_next_version(current: &Version, next: &Version) -> bool {
    let cur = current.components();
    let nxt = next.components();
    if nxt.is_empty() {
        return false;
    }
    if nxt.len() == cur.len() + 1 {
        return cur == &nxt[..cur.len()] && nxt[cur.len()] == 1;
    }
    if nxt.len() > cur.len() {
        return false;
    }
    let last = nxt.len() - 1;
    cur[..last] == nxt[..last] && nxt[last] == cur[last] + 1
}
