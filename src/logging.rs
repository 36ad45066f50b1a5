//! Tracing setup shared by every subcommand.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{RewardError, Result};

/// Parse a level name such as `info` or `debug`
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| RewardError::ConfigValidation {
            message: format!("unknown log_level '{}'", level),
        })
}

/// Install the global subscriber: fmt output with target and level
pub fn init(level: &str) -> Result<()> {
    let filter = parse_level(level)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(filter)
        .try_init()
        .map_err(|e| RewardError::Internal {
            message: format!("failed to install tracing subscriber: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_level(" WARN ").unwrap(), LevelFilter::WARN);
        assert!(parse_level("chatty").is_err());
    }
}
