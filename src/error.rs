use thiserror::Error;

/// Request-level failures. Missing upstream data is not an error; it yields
/// defaults or an empty ranking.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("fixture {0} not found")]
    FixtureNotFound(u32),
}

pub type PredictResult<T> = std::result::Result<T, PredictError>;

pub fn parse_fixture_id(raw: &str) -> PredictResult<u32> {
    let trimmed = raw.trim();
    trimmed
        .parse::<u32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| PredictError::InvalidInput(format!("fixture id {trimmed:?} is not a positive integer")))
}

pub fn parse_limit(raw: &str) -> PredictResult<usize> {
    let trimmed = raw.trim();
    trimmed
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| PredictError::InvalidInput(format!("limit {trimmed:?} is not a positive integer")))
}
