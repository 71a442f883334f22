//! Settings layered from a TOML file, the environment and the command line.

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use valuation::{Assumptions, BatchConfig};

use crate::cli::Args;

/// Environment variable holding the Financial Modeling Prep key.
pub(crate) const FMP_API_KEY_ENV: &str = "FMP_API_KEY";

/// Contents of a `--config` file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileConfig {
    assumptions: Assumptions,
    batch: BatchConfig,
    fmp_api_key: Option<String>,
}

impl FileConfig {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Effective settings of a run.
#[derive(Debug)]
pub(crate) struct Settings {
    pub(crate) assumptions: Assumptions,
    pub(crate) batch: BatchConfig,
    pub(crate) fmp_api_key: Option<String>,
}

impl Settings {
    /// Applies the environment and then the flags on top of the file.
    pub(crate) fn resolve(
        file: FileConfig,
        env_api_key: Option<String>,
        args: &Args,
    ) -> Result<Self> {
        let mut assumptions = file.assumptions;
        if let Some(v) = args.margin_of_safety {
            assumptions = assumptions.with_margin_of_safety(v);
        }
        if let Some(v) = args.discount_rate {
            assumptions = assumptions.with_discount_rate(v);
        }
        if let Some(v) = args.growth_decay_rate {
            assumptions = assumptions.with_growth_decay_rate(v);
        }
        if let Some(v) = args.terminal_multiplier {
            assumptions = assumptions.with_terminal_multiplier(v);
        }
        assumptions.validate()?;

        let mut batch = file.batch;
        if let Some(concurrency) = args.concurrency {
            batch = batch.with_concurrency(concurrency);
        }
        if let Some(secs) = args.timeout {
            let timeout = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("Invalid timeout: {secs}"))?;
            batch = batch.with_timeout(timeout);
        }
        if let Some(models) = &args.models {
            batch = batch.with_models(models.iter().copied());
        }
        batch.validate()?;

        let fmp_api_key = args
            .fmp_api_key
            .clone()
            .or(env_api_key)
            .or(file.fmp_api_key)
            .filter(|k| !k.trim().is_empty());

        Ok(Self {
            assumptions,
            batch,
            fmp_api_key,
        })
    }
}
