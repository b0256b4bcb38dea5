pub mod error;
pub mod index;
pub mod query;
pub mod tokenizer;
pub mod vector;

pub use error::EngineError;
pub use index::{Corpus, DocInput, Document};
pub use query::{rank, vectorize, ScoredDoc};
pub use vector::SparseVector;
