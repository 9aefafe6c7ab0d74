use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::Document;
use crate::tokenizer::normalize;
use crate::{DocId, Term};

/// Per-field multipliers applied to term occurrences at build time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldWeights {
    pub title: f32,
    pub body: f32,
}

impl Default for FieldWeights {
    fn default() -> Self { Self { title: 3.0, body: 1.0 } }
}

/// One (term, document) occurrence.
///
/// `field_weight` is the occurrence-weighted mean of the field weights the
/// term was seen in, so `term_frequency * field_weight` equals the weighted
/// occurrence count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_frequency: u32,
    pub field_weight: f32,
}

impl Posting {
    pub fn weighted_tf(&self) -> f32 { self.term_frequency as f32 * self.field_weight }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocEntry {
    pub doc: Arc<Document>,
    /// Normalized title, kept for exact-title matching at query time.
    pub title_terms: Vec<Term>,
}

/// Read-only term index. Built once by [`InvertedIndex::build`]; there is no
/// mutating API afterwards, so shared references can be read concurrently.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: HashMap<Term, Vec<Posting>>, // sorted by doc_id
    idf: HashMap<Term, f32>,
    docs: Vec<DocEntry>, // position == DocId
    external_ids: HashMap<String, DocId>,
    weights: FieldWeights,
}

impl InvertedIndex {
    pub fn build(documents: Vec<Document>) -> Self {
        Self::build_with_weights(documents, FieldWeights::default())
    }

    /// Normalize each text field of every document independently, accumulate
    /// postings, then compute `idf = ln(N / df)` for every term with a posting.
    pub fn build_with_weights(documents: Vec<Document>, weights: FieldWeights) -> Self {
        let mut postings: HashMap<Term, Vec<Posting>> = HashMap::new();
        let mut docs: Vec<DocEntry> = Vec::with_capacity(documents.len());
        let mut external_ids: HashMap<String, DocId> = HashMap::with_capacity(documents.len());

        for doc in documents {
            if external_ids.contains_key(&doc.id) {
                tracing::warn!(id = %doc.id, "duplicate document id ignored");
                continue;
            }
            let doc_id = docs.len() as DocId;

            // term -> (title occurrences, body occurrences)
            let mut counts: HashMap<Term, (u32, u32)> = HashMap::new();
            let title_terms = normalize(&doc.title);
            for t in &title_terms {
                counts.entry(t.clone()).or_default().0 += 1;
            }
            for field in doc.body_fields() {
                for t in normalize(field) {
                    counts.entry(t).or_default().1 += 1;
                }
            }

            for (term, (title_tf, body_tf)) in counts {
                let tf = title_tf + body_tf;
                let weighted = title_tf as f32 * weights.title + body_tf as f32 * weights.body;
                postings.entry(term).or_default().push(Posting {
                    doc_id,
                    term_frequency: tf,
                    field_weight: weighted / tf as f32,
                });
            }

            external_ids.insert(doc.id.clone(), doc_id);
            docs.push(DocEntry { doc: Arc::new(doc), title_terms });
        }

        let n = docs.len().max(1) as f32;
        let idf = postings
            .iter()
            .map(|(term, plist)| (term.clone(), (n / plist.len() as f32).ln()))
            .collect();

        tracing::info!(num_docs = docs.len(), num_terms = postings.len(), "index built");
        Self { postings, idf, docs, external_ids, weights }
    }

    pub fn num_docs(&self) -> u32 { self.docs.len() as u32 }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn weights(&self) -> FieldWeights { self.weights }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    pub fn idf(&self, term: &str) -> Option<f32> { self.idf.get(term).copied() }

    pub fn entry(&self, doc_id: DocId) -> Option<&DocEntry> { self.docs.get(doc_id as usize) }

    pub fn document(&self, external_id: &str) -> Option<&Arc<Document>> {
        let id = self.external_ids.get(external_id)?;
        self.docs.get(*id as usize).map(|e| &e.doc)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Arc<Document>> + '_ {
        self.docs.iter().map(|e| &e.doc)
    }
}
