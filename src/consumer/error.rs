use thiserror::Error;

/// Errors raised while building or driving the consumer
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// The configured processing strategy tag is not known
    #[error("invalid task resolver type: {0}")]
    StrategyNotFound(String),

    /// At least one worker is required
    #[error("invalid worker count: {0}, at least 1 worker is required")]
    InvalidWorkerCount(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_not_found_message() {
        let err = ConsumerError::StrategyNotFound("parallel".to_string());
        assert_eq!(err.to_string(), "invalid task resolver type: parallel");
    }
}
