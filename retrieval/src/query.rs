use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::index::{idf, Corpus};
use crate::tokenizer::tokenize;
use crate::vector::{self, SparseVector};

/// One ranked hit: document id plus cosine score in (0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub id: String,
    pub score: f32,
}

/// Build a query vector using the corpus document-frequency table. Queries
/// and documents must share the same weighting convention for cosine
/// similarity to be meaningful, so the idf formula and the corpus N are
/// reused here; terms the corpus has never seen have df = 0, which the
/// smoothed formula handles without special cases.
pub fn vectorize(query: &str, corpus: &Corpus) -> (SparseVector, f32) {
    let mut tf: HashMap<String, u32> = HashMap::new();
    for term in tokenize(query) {
        *tf.entry(term).or_insert(0) += 1;
    }
    let mut weights = SparseVector::with_capacity(tf.len());
    for (term, count) in tf {
        let weight = count as f32 * idf(corpus.doc_frequency(&term), corpus.len());
        weights.insert(term, weight);
    }
    let norm = vector::norm(&weights);
    (weights, norm)
}

/// Score every document against the query vector and return at most `k`
/// hits, best first. Documents scoring exactly zero (no term overlap, or a
/// zero norm on either side) are excluded. Equal scores keep build order:
/// the sort is stable and documents are scored in corpus order.
pub fn rank(query: &SparseVector, query_norm: f32, corpus: &Corpus, k: usize) -> Vec<ScoredDoc> {
    if k == 0 {
        return Vec::new();
    }
    let mut scored: Vec<ScoredDoc> = Vec::new();
    for doc in corpus.docs() {
        let score = vector::cosine(query, query_norm, &doc.weights, doc.norm);
        if score > 0.0 {
            scored.push(ScoredDoc {
                id: doc.id.clone(),
                score,
            });
        }
    }
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}

impl Corpus {
    /// Rank documents against a query string: vectorize with this corpus's
    /// statistics, then score and order. `k = 0` yields an empty result
    /// (`k` is unsigned, so a negative k is unrepresentable).
    pub fn retrieve(&self, query: &str, k: usize) -> Vec<ScoredDoc> {
        let (weights, norm) = vectorize(query, self);
        rank(&weights, norm, self, k)
    }
}
