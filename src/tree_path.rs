//! Module path strings from hierarchical clustering results.
//!
//! A path like `"1:2:3"` addresses one node of the clustering hierarchy by
//! the rank it holds at each level. A `;` in place of a `:` marks the level
//! it introduces as statistically insignificant. The special string `"root"`
//! (or an empty string) is the level-0 path.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::errors::AlluvialError;

/// Parsed module path: per-level ranks plus per-level significance flags.
///
/// Equality and hashing consider the ranks only, so `"1;2"` and `"1:2"` are
/// the same path; significance is carried alongside for
/// [`TreePath::is_significant`].
#[derive(Debug, Clone)]
pub struct TreePath {
    ranks: Vec<u32>,
    significant: Vec<bool>,
}

impl TreePath {
    /// The level-0 path, ancestor of every other path.
    pub fn root() -> Self {
        Self {
            ranks: Vec::new(),
            significant: Vec::new(),
        }
    }

    /// Builds a fully significant path from pre-split ranks.
    pub fn from_ranks(ranks: &[u32]) -> Self {
        Self {
            ranks: ranks.to_vec(),
            significant: vec![true; ranks.len()],
        }
    }

    /// Number of levels; 0 for root.
    pub fn level(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_root(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Rank at the deepest level, 0 for root.
    pub fn rank(&self) -> u32 {
        self.ranks.last().copied().unwrap_or(0)
    }

    /// The prefix of length `level`; root when `level` is 0.
    pub fn ancestor_at_level(&self, level: usize) -> TreePath {
        let level = level.min(self.ranks.len());
        Self {
            ranks: self.ranks[..level].to_vec(),
            significant: self.significant[..level].to_vec(),
        }
    }

    /// Prefix test on ranks. Root is an ancestor of everything, including
    /// itself.
    pub fn is_ancestor(&self, other: &TreePath) -> bool {
        self.level() <= other.level() && self.ranks[..] == other.ranks[..self.level()]
    }

    /// Whether the given 1-based level is significant. Level 0 and levels
    /// past the end of the path are reported significant.
    pub fn is_significant(&self, level: usize) -> bool {
        if level == 0 || level > self.significant.len() {
            return true;
        }
        self.significant[level - 1]
    }

    /// First 0-based level at which the two paths' ranks diverge. Returns the
    /// shorter length when one path is a prefix of the other.
    pub fn difference_index(&self, other: &TreePath) -> usize {
        self.ranks
            .iter()
            .zip(&other.ranks)
            .take_while(|(a, b)| a == b)
            .count()
    }
}

impl FromStr for TreePath {
    type Err = AlluvialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "root" {
            return Ok(TreePath::root());
        }

        let mut ranks = Vec::new();
        let mut significant = Vec::new();
        // The separator preceding a rank flags that rank's level; the first
        // level is always significant.
        let mut next_significant = true;
        let mut token = String::new();

        let mut push_token = |token: &mut String, sig: bool| -> Result<(), AlluvialError> {
            let rank: u32 = token
                .parse()
                .map_err(|_| AlluvialError::InvalidPath(s.to_string()))?;
            ranks.push(rank);
            significant.push(sig);
            token.clear();
            Ok(())
        };

        for ch in trimmed.chars() {
            match ch {
                ':' | ';' => {
                    if token.is_empty() {
                        return Err(AlluvialError::InvalidPath(s.to_string()));
                    }
                    push_token(&mut token, next_significant)?;
                    next_significant = ch == ':';
                }
                _ => token.push(ch),
            }
        }
        if token.is_empty() {
            return Err(AlluvialError::InvalidPath(s.to_string()));
        }
        push_token(&mut token, next_significant)?;

        Ok(Self { ranks, significant })
    }
}

impl fmt::Display for TreePath {
    /// Canonical colon-joined form; `"root"` at level 0.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ranks.is_empty() {
            return write!(f, "root");
        }
        let mut first = true;
        for rank in &self.ranks {
            if !first {
                write!(f, ":")?;
            }
            write!(f, "{}", rank)?;
            first = false;
        }
        Ok(())
    }
}

impl PartialEq for TreePath {
    fn eq(&self, other: &Self) -> bool {
        self.ranks == other.ranks
    }
}

impl Eq for TreePath {}

impl Hash for TreePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ranks.hash(state);
    }
}
