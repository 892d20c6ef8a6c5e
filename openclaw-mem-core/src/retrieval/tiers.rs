//! The tiered fallback recall plan (spec §4.5): `must_remember` first,
//! then `nice_to_have`, then `unknown`, then `ignore` as a last resort,
//! stopping as soon as `limit` distinct ids have been selected.

use serde::{Deserialize, Serialize};

use crate::clamp::{self, ClampConfig};
use crate::constants::{MAX_RECALL_LIMIT, MAX_TIER_MULTIPLIER};
use crate::embeddings_client::EmbeddingProvider;
use crate::error::Result;
use crate::observation::{ImportanceLabel, TrustTier};
use crate::retrieval::rrf;
use crate::retrieval::scope::{self, ResolvedScope};
use crate::storage_trait::{Filter, LedgerStore, ScoredId};

/// The default tier sequence, in priority order.
pub const DEFAULT_TIER_SEQUENCE: &[ImportanceLabel] = &[
    ImportanceLabel::MustRemember,
    ImportanceLabel::NiceToHave,
    ImportanceLabel::Unknown,
    ImportanceLabel::Ignore,
];

/// Inputs to a recall request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallRequest {
    pub query_text: String,
    pub limit: usize,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub importance_labels: Option<Vec<ImportanceLabel>>,
    #[serde(default)]
    pub trust_tiers: Option<Vec<TrustTier>>,
    /// Per-tier candidate-generation multiplier applied to `limit`.
    #[serde(default = "default_multiplier")]
    pub multiplier: usize,
    /// Embedding model to query against, when a vector channel is used.
    pub embedding_model: String,
}

fn default_multiplier() -> usize {
    crate::constants::DEFAULT_TIER_MULTIPLIER
}

/// Per-tier bookkeeping for the recall receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierReport {
    pub tier: ImportanceLabel,
    pub candidates: usize,
    pub selected: usize,
}

/// Full result of running the tiered plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallOutcome {
    pub resolved_scope: ResolvedScope,
    pub selected_ids: Vec<i64>,
    pub fts_top: Vec<ScoredId>,
    pub vec_top: Vec<ScoredId>,
    pub fused_top: Vec<i64>,
    pub tiers: Vec<TierReport>,
    pub rejection_reasons: Vec<String>,
    pub vector_skipped: bool,
}

/// Run the tiered recall plan against a store and (optional) embedding
/// provider. `embedder: None` or an embedding failure both fail open to
/// FTS-only results, recording the reason.
pub async fn recall<S, E>(
    store: &S,
    embedder: Option<&E>,
    request: &RecallRequest,
) -> Result<RecallOutcome>
where
    S: LedgerStore + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let limit = request.limit.clamp(1, MAX_RECALL_LIMIT);
    let multiplier = request.multiplier.clamp(1, MAX_TIER_MULTIPLIER);
    let k = limit * multiplier;

    let resolved_scope = scope::resolve(request.scope.as_deref(), &request.query_text);

    let mut rejection_reasons = Vec::new();
    let mut vector_skipped = false;

    let query_vector = match embedder {
        Some(provider) => {
            let clamped = clamp::clamp(&request.query_text, &ClampConfig::default());
            match provider.embed_batch(&[clamped.text]).await {
                Ok(mut vectors) => vectors.pop(),
                Err(err) => {
                    vector_skipped = true;
                    rejection_reasons.push(format!("vector_channel_skipped: {err}"));
                    None
                }
            }
        }
        None => {
            vector_skipped = true;
            None
        }
    };

    let sequence: Vec<ImportanceLabel> = match &request.importance_labels {
        Some(allowed) => DEFAULT_TIER_SEQUENCE
            .iter()
            .copied()
            .filter(|tier| allowed.contains(tier))
            .collect(),
        None => DEFAULT_TIER_SEQUENCE.to_vec(),
    };

    let mut selected_ids: Vec<i64> = Vec::new();
    let mut tiers = Vec::new();
    let mut fts_top = Vec::new();
    let mut vec_top = Vec::new();
    let mut fused_top = Vec::new();
    let mut budget_full = false;
    // The tier immediately following the one that filled the budget is
    // still searched so its `TierReport` can show `selected=0` ("reached,
    // nothing left to take"); every tier after that is truly skipped
    // (spec §8 scenario 3: `unknown: selected=0`, `ignore: not_reached`).
    let mut capped_tier_reported = false;

    for tier in sequence {
        if budget_full && capped_tier_reported {
            rejection_reasons.push(format!("budget_cap: tier {tier:?} not_reached"));
            continue;
        }
        if budget_full {
            capped_tier_reported = true;
        }

        let filter = Filter {
            scope: Some(resolved_scope.scope.clone()),
            importance_labels: Some(vec![tier]),
            trust_tiers: request.trust_tiers.clone(),
            include_archived: false,
        };

        let fts_hits = store.search_fts(&request.query_text, k, &filter).await?;
        let vec_hits = match &query_vector {
            Some(vector) => {
                store
                    .search_vector(vector, k, &request.embedding_model, &filter)
                    .await?
            }
            None => Vec::new(),
        };

        let lanes: Vec<Vec<ScoredId>> = if vec_hits.is_empty() {
            vec![fts_hits.clone()]
        } else {
            vec![fts_hits.clone(), vec_hits.clone()]
        };
        let fused = rrf::fuse(&lanes);

        if fts_top.is_empty() {
            fts_top = fts_hits;
        }
        if vec_top.is_empty() {
            vec_top = vec_hits;
        }
        if fused_top.is_empty() {
            fused_top = fused.iter().map(|hit| hit.id).collect();
        }

        let candidates = fused.len();
        let mut selected_this_tier = 0;

        for hit in fused {
            if selected_ids.len() >= limit {
                budget_full = true;
                break;
            }
            if selected_ids.contains(&hit.id) {
                continue;
            }
            selected_ids.push(hit.id);
            selected_this_tier += 1;
        }

        tiers.push(TierReport {
            tier,
            candidates,
            selected: selected_this_tier,
        });

        if selected_ids.len() >= limit {
            budget_full = true;
        }
    }

    Ok(RecallOutcome {
        resolved_scope,
        selected_ids,
        fts_top,
        vec_top,
        fused_top,
        tiers,
        rejection_reasons,
        vector_skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;

    struct FakeStore {
        fts: Vec<ScoredId>,
    }

    #[async_trait]
    impl LedgerStore for FakeStore {
        async fn insert_observation(
            &self,
            _row: crate::storage_trait::NewObservation,
        ) -> Result<i64> {
            unimplemented!()
        }
        async fn upsert_embedding(&self, _obs_id: i64, _model: &str, _vector: &[f32]) -> Result<()> {
            unimplemented!()
        }
        async fn search_fts(
            &self,
            _query: &str,
            k: usize,
            _filter: &Filter,
        ) -> Result<Vec<ScoredId>> {
            Ok(self.fts.iter().take(k).copied().collect())
        }
        async fn search_vector(
            &self,
            _query_vec: &[f32],
            _k: usize,
            _model: &str,
            _filter: &Filter,
        ) -> Result<Vec<ScoredId>> {
            Ok(Vec::new())
        }
        async fn get_by_ids(
            &self,
            _ids: &[i64],
        ) -> Result<Vec<Option<crate::observation::Observation>>> {
            unimplemented!()
        }
        async fn timeline(
            &self,
            _ids: &[i64],
            _window: chrono::Duration,
        ) -> Result<Vec<Vec<crate::observation::Observation>>> {
            unimplemented!()
        }
        async fn list_scalars(
            &self,
            _filter: &Filter,
            _limit: usize,
        ) -> Result<Vec<crate::observation::Observation>> {
            unimplemented!()
        }
        async fn archive(&self, _id: i64) -> Result<()> {
            unimplemented!()
        }
        async fn is_archived(&self, _id: i64) -> Result<bool> {
            unimplemented!()
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(Error::ProviderUnavailable("down".to_string()))
        }
        fn model_name(&self) -> &str {
            "fake"
        }
    }

    #[tokio::test]
    async fn fails_open_to_fts_only_when_embedding_unavailable() {
        let store = FakeStore {
            fts: vec![ScoredId { id: 1, score: 1.0 }],
        };
        let request = RecallRequest {
            query_text: "hello".to_string(),
            limit: 5,
            scope: None,
            importance_labels: None,
            trust_tiers: None,
            multiplier: 2,
            embedding_model: "m".to_string(),
        };
        let outcome = recall(&store, Some(&FailingEmbedder), &request)
            .await
            .unwrap();
        assert!(outcome.vector_skipped);
        assert!(!outcome.rejection_reasons.is_empty());
        assert!(outcome.selected_ids.contains(&1));
    }

    #[tokio::test]
    async fn stops_once_limit_reached_and_records_budget_cap() {
        let store = FakeStore {
            fts: (1..=10).map(|id| ScoredId { id, score: 1.0 }).collect(),
        };
        let request = RecallRequest {
            query_text: "hello".to_string(),
            limit: 3,
            scope: None,
            importance_labels: None,
            trust_tiers: None,
            multiplier: 2,
            embedding_model: "m".to_string(),
        };
        let outcome = recall::<FakeStore, FailingEmbedder>(&store, None, &request)
            .await
            .unwrap();
        assert_eq!(outcome.selected_ids.len(), 3);
        assert!(outcome
            .rejection_reasons
            .iter()
            .any(|r| r.starts_with("budget_cap")));
    }

    struct TieredFakeStore {
        by_tier: Vec<(ImportanceLabel, Vec<ScoredId>)>,
    }

    #[async_trait]
    impl LedgerStore for TieredFakeStore {
        async fn insert_observation(
            &self,
            _row: crate::storage_trait::NewObservation,
        ) -> Result<i64> {
            unimplemented!()
        }
        async fn upsert_embedding(&self, _obs_id: i64, _model: &str, _vector: &[f32]) -> Result<()> {
            unimplemented!()
        }
        async fn search_fts(
            &self,
            _query: &str,
            k: usize,
            filter: &Filter,
        ) -> Result<Vec<ScoredId>> {
            let tier = filter
                .importance_labels
                .as_ref()
                .and_then(|labels| labels.first())
                .copied()
                .unwrap_or(ImportanceLabel::Unknown);
            Ok(self
                .by_tier
                .iter()
                .find(|(t, _)| *t == tier)
                .map(|(_, hits)| hits.clone())
                .unwrap_or_default()
                .into_iter()
                .take(k)
                .collect())
        }
        async fn search_vector(
            &self,
            _query_vec: &[f32],
            _k: usize,
            _model: &str,
            _filter: &Filter,
        ) -> Result<Vec<ScoredId>> {
            Ok(Vec::new())
        }
        async fn get_by_ids(
            &self,
            _ids: &[i64],
        ) -> Result<Vec<Option<crate::observation::Observation>>> {
            unimplemented!()
        }
        async fn timeline(
            &self,
            _ids: &[i64],
            _window: chrono::Duration,
        ) -> Result<Vec<Vec<crate::observation::Observation>>> {
            unimplemented!()
        }
        async fn list_scalars(
            &self,
            _filter: &Filter,
            _limit: usize,
        ) -> Result<Vec<crate::observation::Observation>> {
            unimplemented!()
        }
        async fn archive(&self, _id: i64) -> Result<()> {
            unimplemented!()
        }
        async fn is_archived(&self, _id: i64) -> Result<bool> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn tier_breakdown_marks_reached_empty_tier_and_unreached_tier_separately() {
        // Spec §8 scenario 3: 1 must, 2 nice, 2 unknown, 0 ignore; limit=3.
        let by_tier = vec![
            (ImportanceLabel::MustRemember, vec![ScoredId { id: 1, score: 1.0 }]),
            (
                ImportanceLabel::NiceToHave,
                vec![ScoredId { id: 2, score: 1.0 }, ScoredId { id: 3, score: 1.0 }],
            ),
            (
                ImportanceLabel::Unknown,
                vec![ScoredId { id: 4, score: 1.0 }, ScoredId { id: 5, score: 1.0 }],
            ),
        ];
        let store = TieredFakeStore { by_tier };

        let request = RecallRequest {
            query_text: "hello".to_string(),
            limit: 3,
            scope: None,
            importance_labels: None,
            trust_tiers: None,
            multiplier: 2,
            embedding_model: "m".to_string(),
        };
        let outcome = recall::<TieredFakeStore, FailingEmbedder>(&store, None, &request)
            .await
            .unwrap();

        assert_eq!(outcome.selected_ids, vec![1, 2, 3]);

        let must = outcome
            .tiers
            .iter()
            .find(|t| t.tier == ImportanceLabel::MustRemember)
            .unwrap();
        assert_eq!(must.selected, 1);

        let nice = outcome
            .tiers
            .iter()
            .find(|t| t.tier == ImportanceLabel::NiceToHave)
            .unwrap();
        assert_eq!(nice.selected, 2);

        let unknown = outcome
            .tiers
            .iter()
            .find(|t| t.tier == ImportanceLabel::Unknown)
            .unwrap();
        assert_eq!(unknown.selected, 0);
        assert_eq!(unknown.candidates, 2);

        assert!(
            !outcome.tiers.iter().any(|t| t.tier == ImportanceLabel::Ignore),
            "ignore tier should not have been reached"
        );
        assert!(outcome
            .rejection_reasons
            .iter()
            .any(|r| r.contains("Ignore") && r.contains("not_reached")));
    }
}
