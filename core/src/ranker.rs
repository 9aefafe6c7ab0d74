//! TF-IDF scoring over an expanded term set with exact-title boosting.
//!
//! Score for a document is `sum(tf * field_weight * idf)` over the expanded
//! terms it contains. Documents whose normalized title equals the normalized
//! query then receive an additive boost of `max_base_score + margin`, computed
//! per query, which places every exact-title match strictly above every
//! non-exact match while keeping scores monotone with rank.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::index::InvertedIndex;
use crate::tokenizer::normalize;
use crate::{DocId, Term};

pub const DEFAULT_EXACT_TITLE_MARGIN: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub doc_id: String,
    pub score: f32,
    /// 1-based position in the final ordering.
    pub rank: u32,
}

pub fn rank(expanded_terms: &BTreeSet<Term>, index: &InvertedIndex, original_query: &str) -> Vec<ScoredResult> {
    rank_with_margin(expanded_terms, index, original_query, DEFAULT_EXACT_TITLE_MARGIN)
}

pub fn rank_with_margin(
    expanded_terms: &BTreeSet<Term>,
    index: &InvertedIndex,
    original_query: &str,
    margin: f32,
) -> Vec<ScoredResult> {
    if expanded_terms.is_empty() {
        return Vec::new();
    }

    let mut scores: HashMap<DocId, f32> = HashMap::new();
    for term in expanded_terms {
        let (Some(plist), Some(idf)) = (index.postings(term), index.idf(term)) else { continue };
        for p in plist {
            *scores.entry(p.doc_id).or_insert(0.0) += p.weighted_tf() * idf;
        }
    }
    if scores.is_empty() {
        return Vec::new();
    }

    let query_terms = normalize(original_query);
    if !query_terms.is_empty() {
        let max_base = scores.values().copied().fold(0.0f32, f32::max);
        let boost = max_base + margin.max(f32::EPSILON);
        for (doc_id, score) in scores.iter_mut() {
            let exact = index.entry(*doc_id).is_some_and(|e| e.title_terms == query_terms);
            if exact {
                *score += boost;
            }
        }
    }

    let mut scored: Vec<(&str, f32)> = scores
        .into_iter()
        .filter(|(_, s)| *s > 0.0)
        .filter_map(|(doc_id, s)| index.entry(doc_id).map(|e| (e.doc.id.as_str(), s)))
        .collect();
    scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
        Ordering::Equal => a.0.cmp(b.0),
        ord => ord,
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (doc_id, score))| ScoredResult { doc_id: doc_id.to_string(), score, rank: i as u32 + 1 })
        .collect()
}
