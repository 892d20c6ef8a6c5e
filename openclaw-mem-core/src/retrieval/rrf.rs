//! Reciprocal Rank Fusion over one or more ranked id lists (spec §4.5).

use crate::storage_trait::ScoredId;
use std::collections::HashMap;

/// Damping constant, re-exported here for call sites that only need RRF.
pub use crate::constants::RRF_K;

/// Fuse any number of already-ranked lists into one ranking via Reciprocal
/// Rank Fusion: `score(id) = sum over lanes of 1 / (RRF_K + rank)`, rank
/// 1-based. Ties break by higher score first, then lower id.
#[must_use]
pub fn fuse(lanes: &[Vec<ScoredId>]) -> Vec<ScoredId> {
    let mut scores: HashMap<i64, f64> = HashMap::new();

    for lane in lanes {
        for (idx, hit) in lane.iter().enumerate() {
            let rank = (idx + 1) as f64;
            *scores.entry(hit.id).or_insert(0.0) += 1.0 / (RRF_K + rank);
        }
    }

    let mut fused: Vec<ScoredId> = scores
        .into_iter()
        .map(|(id, score)| ScoredId { id, score })
        .collect();

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(ids: &[i64]) -> Vec<ScoredId> {
        ids.iter()
            .enumerate()
            .map(|(i, &id)| ScoredId {
                id,
                score: 1.0 / (i + 1) as f64,
            })
            .collect()
    }

    #[test]
    fn fusion_is_deterministic_for_identical_inputs() {
        let lanes = vec![lane(&[3, 1, 2]), lane(&[2, 3, 1])];
        let a = fuse(&lanes);
        let b = fuse(&lanes);
        assert_eq!(a, b);
    }

    #[test]
    fn item_ranked_first_in_every_lane_wins() {
        let lanes = vec![lane(&[5, 6, 7]), lane(&[5, 8, 9])];
        let fused = fuse(&lanes);
        assert_eq!(fused[0].id, 5);
    }

    #[test]
    fn ties_break_by_lower_id() {
        // Two ids appearing at rank 1 in disjoint single-lane calls tie
        // exactly; lower id must sort first.
        let lanes = vec![vec![ScoredId { id: 9, score: 1.0 }], vec![ScoredId { id: 4, score: 1.0 }]];
        let fused = fuse(&lanes);
        assert_eq!(fused[0].id, 4);
        assert_eq!(fused[1].id, 9);
    }

    #[test]
    fn empty_lanes_fuse_to_empty() {
        let fused = fuse(&[]);
        assert!(fused.is_empty());
    }
}
