//! Configuration for the weavery engine
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;

/// Weavery - engagement graph and feed engine
#[derive(Parser, Debug, Clone)]
#[command(name = "weavery")]
#[command(about = "Engagement graph and feed engine for the Weavery platform")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "weavery")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Upper bound for a single feed or cascade operation, in milliseconds
    #[arg(long, env = "OP_TIMEOUT_MS", default_value = "30000")]
    pub op_timeout_ms: u64,

    /// Restrict the recommended-profiles feed to verified profiles
    #[arg(long, env = "RECOMMEND_VERIFIED_ONLY", default_value = "true")]
    pub recommend_verified_only: bool,

    /// Sweep dangling edges (reactions/follows/saves whose target no longer
    /// resolves) after startup, then exit
    #[arg(long, env = "SWEEP_ORPHANS", default_value = "false")]
    pub sweep_orphans: bool,
}

impl Args {
    /// Engine policy derived from the flags
    pub fn policy(&self) -> EnginePolicy {
        EnginePolicy {
            recommend_verified_only: self.recommend_verified_only,
            op_timeout: std::time::Duration::from_millis(self.op_timeout_ms),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.op_timeout_ms == 0 {
            return Err("OP_TIMEOUT_MS must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Behavioral knobs the engine reads at run time.
#[derive(Debug, Clone)]
pub struct EnginePolicy {
    /// Only verified profiles appear in the recommended-to-follow feed
    pub recommend_verified_only: bool,
    /// Upper bound applied to every feed and cascade entry point
    pub op_timeout: std::time::Duration,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            recommend_verified_only: true,
            op_timeout: std::time::Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_rejected() {
        let args = Args::parse_from(["weavery", "--op-timeout-ms", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["weavery"]);
        assert!(args.validate().is_ok());
        let policy = args.policy();
        assert!(policy.recommend_verified_only);
        assert_eq!(policy.op_timeout, std::time::Duration::from_secs(30));
    }
}
