use std::time::Duration;

use anyhow::{Context, Result};

const NAMESPACE_VAR: &str = "CALCULATOR_NAMESPACE";
const ERROR_REQUEUE_VAR: &str = "CALCULATOR_ERROR_REQUEUE_SECS";
const DEFAULT_ERROR_REQUEUE_SECS: u64 = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Watch only this namespace; all namespaces when unset.
    pub namespace: Option<String>,
    pub error_requeue: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let namespace = lookup(NAMESPACE_VAR).filter(|namespace| !namespace.is_empty());
        let error_requeue_secs = match lookup(ERROR_REQUEUE_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid {}: {:?}", ERROR_REQUEUE_VAR, raw))?,
            None => DEFAULT_ERROR_REQUEUE_SECS,
        };
        Ok(Self {
            namespace,
            error_requeue: Duration::from_secs(error_requeue_secs),
        })
    }
}
