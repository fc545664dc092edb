//! Back-off n-gram language model storage and query engine.
//!
//! Ingests ARPA-format language models into one of several trie
//! storage layouts, then answers Katz back-off log-probability queries
//! against the loaded model. See [`model::LanguageModel`] for the main
//! entry point.

pub mod arpa;
pub mod config;
pub mod error;
pub mod model;
pub mod payload;
pub mod query;
pub mod reader;
pub mod trie;
mod util;
pub mod word_id;
pub mod word_index;

pub use config::{Config, DebugLevel, TrieKind, WordIndexKind};
pub use model::{LanguageModel, LoadError};
pub use query::{log_prob, log_prob_cumulative, CumulativeScore, WindowScore};
pub use word_id::WordId;
