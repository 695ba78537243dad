pub mod api;
pub mod config;
pub mod connection;
pub mod database;
pub mod error;
pub mod feedback;
pub mod import;
pub mod presets;
pub mod sampler;
pub mod schedule;
pub mod stats;
pub mod suggestions;
pub mod types;
pub mod utils;
pub mod validator;

pub use error::{Result, SuggestError};
pub use feedback::{FeedbackAnalysis, adjust_weights, analyze_feedback};
pub use sampler::generate_suggestion;
pub use stats::{NumberStatistics, compute_statistics};
pub use types::*;
pub use validator::validate_suggestions;
