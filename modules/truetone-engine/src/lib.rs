//! Core pipeline: feature extraction, scoring, and the admission filter
//! that decides which videos reach callers.

pub mod cache;
pub mod embedder;
pub mod features;
pub mod filter;
pub mod gbdt;
pub mod judge;
pub mod labeler;
pub mod lists;
pub mod readability;
pub mod search;
pub mod source;
pub mod store;
pub mod text;

pub use cache::{CacheStats, DecisionCache};
pub use embedder::{Embedder, TextEmbedder};
pub use features::{FeatureVector, NUM_FEATURES};
pub use filter::{AdmissionFilter, Decision, DecisionReason, FilterSettings, Scorer};
pub use gbdt::{GbdtModel, ScoreModel};
pub use judge::HumanityJudge;
pub use labeler::VideoLabeler;
pub use search::{SearchEvent, SearchOrchestrator, SearchSettings};
pub use source::VideoSource;
pub use store::VideoStore;
