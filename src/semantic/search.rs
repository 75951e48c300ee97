//! Cosine-similarity search over report embeddings.
//!
//! One `search` call embeds the query, resolves every corpus report to a
//! vector through the cache (embedding misses in bounded batches), ranks by
//! cosine similarity against a threshold and wraps the result in a
//! human-readable summary.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::cache::EmbeddingCache;
use super::embeddings::{EmbeddingError, EmbeddingProvider};
use super::EMBED_BATCH_SIZE;
use crate::report::Report;

/// Summary shown when the query is blank. Not an error.
pub const EMPTY_QUERY_SUMMARY: &str = "Enter a search query to find matching reports.";

/// Ranked outcome of one search call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    /// Report ids ordered by score descending; corpus order on ties.
    pub matching_ids: Vec<String>,

    /// Per-id similarity, rounded to three decimals for display.
    pub scores: BTreeMap<String, f32>,

    pub summary: String,
    pub total_reports: usize,
    pub match_count: usize,
}

impl SearchOutcome {
    fn empty(summary: String, total_reports: usize) -> Self {
        Self {
            matching_ids: Vec::new(),
            scores: BTreeMap::new(),
            summary,
            total_reports,
            match_count: 0,
        }
    }
}

pub struct SearchEngine {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Arc<EmbeddingCache>,
    threshold: f32,
}

impl SearchEngine {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        cache: Arc<EmbeddingCache>,
        threshold: f32,
    ) -> Self {
        Self {
            provider,
            cache,
            threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Rank `corpus` against `query`.
    ///
    /// A blank query short-circuits to an empty outcome without touching
    /// the provider. A failed *query* embedding aborts the whole search;
    /// failed *corpus* embeddings only exclude the affected reports.
    pub fn search(&self, query: &str, corpus: &[Report]) -> Result<SearchOutcome, EmbeddingError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchOutcome::empty(
                EMPTY_QUERY_SUMMARY.to_string(),
                corpus.len(),
            ));
        }

        let query_vector = self.provider.embed(query)?;
        let vectors = self.corpus_vectors(corpus);

        let mut ranked: Vec<(usize, f32)> = corpus
            .iter()
            .enumerate()
            .filter_map(|(idx, _)| {
                let vector = vectors[idx].as_ref()?;
                let score = cosine_similarity(&query_vector, vector);
                (score >= self.threshold).then_some((idx, score))
            })
            .collect();

        // Stable sort: corpus order is preserved for equal scores.
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let matching_ids: Vec<String> = ranked
            .iter()
            .map(|&(idx, _)| corpus[idx].id.clone())
            .collect();
        let scores: BTreeMap<String, f32> = ranked
            .iter()
            .map(|&(idx, score)| (corpus[idx].id.clone(), round3(score)))
            .collect();

        let top_score = ranked.first().map(|&(_, score)| score);
        let summary = summarize(query, top_score, matching_ids.len());

        Ok(SearchOutcome {
            match_count: matching_ids.len(),
            total_reports: corpus.len(),
            matching_ids,
            scores,
            summary,
        })
    }

    /// Resolve each corpus report to a vector through the cache, embedding
    /// uncached texts in batches of `EMBED_BATCH_SIZE` concurrent provider
    /// calls. Failed items come back as `None` and are excluded from
    /// ranking (best-effort indexing).
    fn corpus_vectors(&self, corpus: &[Report]) -> Vec<Option<Vec<f32>>> {
        let texts: Vec<String> = corpus.iter().map(|r| r.searchable_text()).collect();
        let mut vectors: Vec<Option<Vec<f32>>> = vec![None; corpus.len()];

        let mut pending = Vec::new();
        for (idx, report) in corpus.iter().enumerate() {
            match self.cache.lookup(&report.id, &texts[idx]) {
                Some(vector) => vectors[idx] = Some(vector),
                None => pending.push(idx),
            }
        }

        for chunk in pending.chunks(EMBED_BATCH_SIZE) {
            let results: Vec<(usize, Result<Vec<f32>, EmbeddingError>)> =
                std::thread::scope(|scope| {
                    let handles: Vec<_> = chunk
                        .iter()
                        .map(|&idx| {
                            let id = &corpus[idx].id;
                            let text = &texts[idx];
                            scope.spawn(move || {
                                (
                                    idx,
                                    self.cache
                                        .get_or_compute(id, text, |t| self.provider.embed(t)),
                                )
                            })
                        })
                        .collect();

                    handles
                        .into_iter()
                        .map(|handle| handle.join().expect("embedding worker panicked"))
                        .collect()
                });

            for (idx, result) in results {
                match result {
                    Ok(vector) => vectors[idx] = Some(vector),
                    Err(err) => log::warn!(
                        "embedding report '{}' failed, excluding it from results: {err}",
                        corpus[idx].id
                    ),
                }
            }
        }

        vectors
    }
}

/// Cosine similarity with a zero-norm guard: if either vector has zero
/// norm the score is defined as 0 rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn round3(score: f32) -> f32 {
    (score * 1000.0).round() / 1000.0
}

/// Confidence wording tiered by the top score. Presentation policy, but the
/// host UI matches on these strings, so the tiers and wording are fixed.
fn summarize(query: &str, top_score: Option<f32>, count: usize) -> String {
    if count == 0 {
        return format!("No reports found matching '{query}'.");
    }

    let tier = match top_score.unwrap_or(0.0) {
        s if s > 0.6 => "highly relevant",
        s if s > 0.45 => "relevant",
        _ => "possibly related",
    };
    let plural = if count == 1 { "" } else { "s" };

    format!("Found {count} {tier} report{plural} for '{query}'.")
}
