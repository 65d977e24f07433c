/*!
 * Sequence alignment similarity.
 *
 * Ratcliff/Obershelp pattern matching: find the longest common block,
 * recurse on the pieces left and right of it, and score the total number
 * of matched characters against the combined length of both strings.
 * Scores range from 0.0 (nothing in common) to 1.0 (identical).
 */

use std::collections::HashMap;

/// A run of identical characters: `a[a_start..a_start + len] == b[b_start..b_start + len]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingBlock {
    pub a_start: usize,
    pub b_start: usize,
    pub len: usize,
}

/// Compares two strings character by character
#[derive(Debug, Clone)]
pub struct SequenceMatcher {
    a: Vec<char>,
    b: Vec<char>,
}

impl SequenceMatcher {
    /// Create a matcher for the pair (a, b)
    pub fn new(a: &str, b: &str) -> Self {
        Self {
            a: a.chars().collect(),
            b: b.chars().collect(),
        }
    }

    /// Total compared length in characters
    fn total_len(&self) -> usize {
        self.a.len() + self.b.len()
    }

    /// Non-overlapping matching blocks in increasing order of position
    pub fn matching_blocks(&self) -> Vec<MatchingBlock> {
        let mut blocks = Vec::new();
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let block = self.longest_match(alo, ahi, blo, bhi);
            if block.len == 0 {
                continue;
            }

            if alo < block.a_start && blo < block.b_start {
                pending.push((alo, block.a_start, blo, block.b_start));
            }
            let a_end = block.a_start + block.len;
            let b_end = block.b_start + block.len;
            if a_end < ahi && b_end < bhi {
                pending.push((a_end, ahi, b_end, bhi));
            }
            blocks.push(block);
        }

        blocks.sort_by_key(|block| (block.a_start, block.b_start));
        blocks
    }

    /// Number of matched characters across all blocks
    pub fn matches(&self) -> usize {
        self.matching_blocks().iter().map(|block| block.len).sum()
    }

    /// Similarity score in [0, 1]
    pub fn ratio(&self) -> f64 {
        ratio_from(self.matches(), self.total_len())
    }

    /// Upper bound on `ratio()` from shared character counts, ignoring order
    pub fn quick_ratio(&self) -> f64 {
        let mut available: HashMap<char, usize> = HashMap::new();
        for c in &self.b {
            *available.entry(*c).or_insert(0) += 1;
        }

        let mut matches = 0;
        for c in &self.a {
            if let Some(count) = available.get_mut(c) {
                if *count > 0 {
                    *count -= 1;
                    matches += 1;
                }
            }
        }

        ratio_from(matches, self.total_len())
    }

    /// Upper bound on `ratio()` from lengths alone
    pub fn real_quick_ratio(&self) -> f64 {
        ratio_from(self.a.len().min(self.b.len()), self.total_len())
    }

    /// Longest common block within `a[alo..ahi]` and `b[blo..bhi]`
    ///
    /// Ties go to the block starting earliest in `a`, then earliest in `b`.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> MatchingBlock {
        let width = bhi - blo;
        let mut prev = vec![0usize; width + 1];
        let mut curr = vec![0usize; width + 1];
        let mut best = MatchingBlock {
            a_start: alo,
            b_start: blo,
            len: 0,
        };

        for i in alo..ahi {
            for j in blo..bhi {
                let col = j - blo + 1;
                if self.a[i] == self.b[j] {
                    let run = prev[col - 1] + 1;
                    curr[col] = run;
                    if run > best.len {
                        best = MatchingBlock {
                            a_start: i + 1 - run,
                            b_start: j + 1 - run,
                            len: run,
                        };
                    }
                } else {
                    curr[col] = 0;
                }
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        best
    }
}

fn ratio_from(matches: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    2.0 * matches as f64 / total as f64
}

/// Similarity of two strings in [0, 1]
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    SequenceMatcher::new(a, b).ratio()
}
