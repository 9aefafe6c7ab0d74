//! Product catalog retrieval: normalization, synonym expansion, a TF-IDF
//! inverted index and the ranking facade the serving layer calls.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod index;
pub mod persist;
pub mod ranker;
pub mod synonyms;
pub mod tokenizer;

pub use catalog::{default_fallback_path, load_catalog, load_with_fallback, Document};
pub use engine::{EngineConfig, RetrievalEngine};
pub use error::CatalogLoadError;
pub use index::{FieldWeights, InvertedIndex, Posting};
pub use ranker::ScoredResult;
pub use synonyms::SynonymTable;

/// A normalized index term.
pub type Term = String;
/// Internal dense document id (position in the index).
pub type DocId = u32;
