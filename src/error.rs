use thiserror::Error;

/// Failures raised by the suggestion engine and its storage calls.
#[derive(Error, Debug)]
pub enum SuggestError {
    #[error("not enough draw history: {available} draws available, at least {required} required")]
    InsufficientHistory { available: usize, required: usize },

    #[error("candidate pool exhausted after {selected} of {required} numbers; check the lottery ranges")]
    PoolExhausted { selected: usize, required: usize },

    #[error("invalid lottery configuration: {0}")]
    InvalidLottery(String),

    #[error("invalid weight configuration: {0}")]
    InvalidWeights(String),

    #[error("invalid draw: {0}")]
    InvalidDraw(String),

    #[error("lottery not found: {0}")]
    LotteryNotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl SuggestError {
    /// True when the failure means "wait for more data" rather than "fix the setup".
    pub fn is_insufficient_history(&self) -> bool {
        matches!(self, SuggestError::InsufficientHistory { .. })
    }
}

pub type Result<T, E = SuggestError> = std::result::Result<T, E>;
