use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::EngineError;
use crate::tokenizer::tokenize;
use crate::vector::{self, SparseVector};

/// One document handed to [`Corpus::build`]: stable id, display name, raw text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocInput {
    pub id: String,
    pub name: String,
    pub text: String,
}

/// An indexed document. Immutable once built.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub text: String,
    /// tf-idf weight per term; only terms occurring in the text are present.
    pub weights: SparseVector,
    /// Euclidean norm of `weights`. Zero exactly when the text has no tokens.
    pub norm: f32,
}

/// A fully built, immutable corpus: documents in build order plus the shared
/// document-frequency table. Adding or removing a document means rebuilding.
#[derive(Debug, Default)]
pub struct Corpus {
    docs: Vec<Document>,
    df: HashMap<String, u32>,
}

/// Smoothed inverse document frequency: `ln((N+1)/(df+1)) + 1`.
/// Strictly positive for any `0 <= df <= N`, including df = 0 (unseen terms)
/// and df = N (terms present in every document).
pub(crate) fn idf(df: u32, num_docs: usize) -> f32 {
    ((num_docs as f32 + 1.0) / (df as f32 + 1.0)).ln() + 1.0
}

impl Corpus {
    /// Build a corpus from the full document set in one pass: per-document
    /// term frequencies, the shared document-frequency table, then tf-idf
    /// weights and norms.
    ///
    /// Duplicate ids are rejected with [`EngineError::DuplicateDocId`].
    /// An empty input is valid and produces an empty corpus.
    pub fn build(inputs: Vec<DocInput>) -> Result<Self, EngineError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(inputs.len());
        for input in &inputs {
            if !seen.insert(input.id.as_str()) {
                return Err(EngineError::DuplicateDocId(input.id.clone()));
            }
        }

        let num_docs = inputs.len();
        let mut tf_per_doc: Vec<HashMap<String, u32>> = Vec::with_capacity(num_docs);
        let mut df: HashMap<String, u32> = HashMap::new();
        for input in &inputs {
            let mut tf: HashMap<String, u32> = HashMap::new();
            for term in tokenize(&input.text) {
                *tf.entry(term).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *df.entry(term.clone()).or_insert(0) += 1;
            }
            tf_per_doc.push(tf);
        }

        let mut docs = Vec::with_capacity(num_docs);
        for (input, tf) in inputs.into_iter().zip(tf_per_doc) {
            let mut weights = SparseVector::with_capacity(tf.len());
            for (term, count) in tf {
                let weight = count as f32 * idf(df[&term], num_docs);
                weights.insert(term, weight);
            }
            let norm = vector::norm(&weights);
            docs.push(Document {
                id: input.id,
                name: input.name,
                text: input.text,
                weights,
                norm,
            });
        }

        tracing::debug!(num_docs, num_terms = df.len(), "corpus built");
        Ok(Self { docs, df })
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Documents in build order.
    pub fn docs(&self) -> &[Document] {
        &self.docs
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.docs.iter().find(|d| d.id == id)
    }

    /// Number of documents containing `term` at least once.
    pub fn doc_frequency(&self, term: &str) -> u32 {
        self.df.get(term).copied().unwrap_or(0)
    }

    /// Number of distinct terms across the corpus.
    pub fn num_terms(&self) -> usize {
        self.df.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn doc(id: &str, text: &str) -> DocInput {
        DocInput {
            id: id.to_string(),
            name: format!("{id}.md"),
            text: text.to_string(),
        }
    }

    #[test]
    fn empty_corpus_builds() {
        let corpus = Corpus::build(Vec::new()).unwrap();
        assert!(corpus.is_empty());
        assert_eq!(corpus.num_terms(), 0);
    }

    #[test]
    fn df_counts_documents_not_occurrences() {
        let corpus = Corpus::build(vec![doc("a", "cat cat cat"), doc("b", "cat dog")]).unwrap();
        assert_eq!(corpus.doc_frequency("cat"), 2);
        assert_eq!(corpus.doc_frequency("dog"), 1);
        assert_eq!(corpus.doc_frequency("fish"), 0);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Corpus::build(vec![doc("a", "x"), doc("a", "y")]).unwrap_err();
        match err {
            EngineError::DuplicateDocId(id) => assert_eq!(id, "a"),
        }
    }

    #[test]
    fn norm_zero_iff_no_tokens() {
        let corpus = Corpus::build(vec![doc("a", "!!! ..."), doc("b", "word")]).unwrap();
        assert_eq!(corpus.docs()[0].norm, 0.0);
        assert!(corpus.docs()[1].norm > 0.0);
    }

    #[test]
    fn weights_are_positive_only_for_present_terms() {
        let corpus = Corpus::build(vec![doc("a", "cat dog"), doc("b", "cat")]).unwrap();
        let a = &corpus.docs()[0];
        assert!(a.weights["cat"] > 0.0);
        assert!(a.weights["dog"] > 0.0);
        assert!(!a.weights.contains_key("fish"));
        let b = &corpus.docs()[1];
        assert!(!b.weights.contains_key("dog"));
    }

    #[test]
    fn idf_positive_across_df_range() {
        // df = 0, df = N, and in between all yield a strictly positive idf
        for n in [0usize, 1, 2, 10] {
            for df in 0..=(n as u32) {
                assert!(idf(df, n) > 0.0, "idf({df}, {n}) must be positive");
            }
        }
    }
}
