//! Runtime configuration, merged from flags and the environment.
//!
//! Environment variables:
//! - `GROQ_API_KEY` - Required. API key for the model endpoint.
//! - `SANDLOOP_MODEL` - Optional. Model name, used when `--model` is absent.
//! - `SANDLOOP_BASE_URL` - Optional. OpenAI-compatible endpoint, used when `--base-url` is absent.
//! - `SANDLOOP_ROOT` - Optional. Sandbox directory, used when `--root` is absent. Defaults to `.`.

use crate::Cli;
use sandloop_core::{Error, ProviderConfig, Result};
use std::path::PathBuf;

pub const API_KEY_VAR: &str = "GROQ_API_KEY";
pub const MODEL_VAR: &str = "SANDLOOP_MODEL";
pub const BASE_URL_VAR: &str = "SANDLOOP_BASE_URL";
pub const ROOT_VAR: &str = "SANDLOOP_ROOT";

/// Model requested from a `--base-url` endpoint when none is named
const DEFAULT_LOCAL_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Directory every tool is confined to
    pub root: PathBuf,
    pub prompt: String,
    pub verbose: bool,
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        Self::from_sources(cli, |key| std::env::var(key).ok())
    }

    /// Merge flags with values from `lookup`. Flags win; blank values count
    /// as unset.
    pub fn from_sources<F>(cli: &Cli, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = env(API_KEY_VAR).ok_or_else(|| {
            Error::config_invalid(format!("{} not found", API_KEY_VAR))
                .with_operation("config::load")
                .with_context("variable", API_KEY_VAR)
        })?;

        let prompt = cli.prompt.join(" ");
        if prompt.trim().is_empty() {
            return Err(Error::config_invalid("no prompt given").with_operation("config::load"));
        }

        let root = cli
            .root
            .clone()
            .or_else(|| env(ROOT_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            api_key,
            model: cli.model.clone().or_else(|| env(MODEL_VAR)),
            base_url: cli.base_url.clone().or_else(|| env(BASE_URL_VAR)),
            root,
            prompt,
            verbose: cli.verbose,
        })
    }

    /// Groq by default; any `--base-url` selects a self-hosted endpoint.
    pub fn provider_config(&self) -> ProviderConfig {
        match &self.base_url {
            Some(base_url) => {
                let model = self.model.as_deref().unwrap_or(DEFAULT_LOCAL_MODEL);
                ProviderConfig::local(base_url.as_str(), model).with_api_key(self.api_key.as_str())
            }
            None => {
                let config = ProviderConfig::groq(self.api_key.as_str());
                match &self.model {
                    Some(model) => config.with_model(model.as_str()),
                    None => config,
                }
            }
        }
    }
}
