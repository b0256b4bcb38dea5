use thiserror::Error;

/// Validation failures surfaced by corpus construction.
///
/// Everything else the engine can be asked to do (empty corpus, empty
/// query, unseen terms, zero norms) has a defined result and is not an
/// error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("duplicate document id: {0}")]
    DuplicateDocId(String),
}
