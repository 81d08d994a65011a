//! Title similarity scoring for fuzzy game matching.

use std::collections::HashSet;

/// Minimum score a candidate needs to count as a match.
pub const MATCH_THRESHOLD: f64 = 0.7;

/// Score for a normalized title that contains, or is contained by, the query.
pub const CONTAINMENT_SCORE: f64 = 0.9;

/// Lower-cases, drops non-alphanumeric characters and collapses whitespace.
pub fn normalize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else if c.is_whitespace() {
                ' '
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn word_set(normalized: &str) -> HashSet<&str> {
    normalized.split_whitespace().collect()
}

/// Jaccard similarity over whitespace-separated words of two normalized titles.
#[expect(
    clippy::cast_precision_loss,
    reason = "word counts of game titles are tiny"
)]
pub fn jaccard(a: &str, b: &str) -> f64 {
    let left = word_set(a);
    let right = word_set(b);
    if left.is_empty() && right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();
    intersection as f64 / union as f64
}

/// Scores how well `candidate` matches `query`, in `[0, 1]`.
///
/// Exact normalized match scores 1.0, containment in either direction 0.9,
/// anything else falls back to word-set Jaccard.
pub fn title_similarity(query: &str, candidate: &str) -> f64 {
    let q = normalize_title(query);
    let c = normalize_title(candidate);
    if q.is_empty() || c.is_empty() {
        return 0.0;
    }
    if q == c {
        return 1.0;
    }
    if c.contains(&q) || q.contains(&c) {
        return CONTAINMENT_SCORE;
    }
    jaccard(&q, &c)
}

/// Whether a score clears the match threshold.
pub fn is_match(score: f64) -> bool {
    score >= MATCH_THRESHOLD
}

/// Picks the highest-scoring candidate at or above the threshold.
///
/// Ties keep the earliest candidate.
pub fn best_match<'a, T, F>(query: &str, candidates: &'a [T], title: F) -> Option<(&'a T, f64)>
where
    F: Fn(&T) -> &str,
{
    let mut best: Option<(&T, f64)> = None;
    for candidate in candidates {
        let score = title_similarity(query, title(candidate));
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best.filter(|(_, score)| is_match(*score))
}
