use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::str::FromStr;
use url::Url;

pub const API_URL_ENV: &str = "RESUME_MATCH_API_URL";
pub const CONTRACT_ENV: &str = "RESUME_MATCH_CONTRACT";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/";

/// Which backend contract the analysis service speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Contract {
    /// Standalone analysis service: one multipart call per operation.
    #[default]
    Service,
    /// Next-style API routes: extract text first, then analyze JSON.
    NextApi,
}

impl FromStr for Contract {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "service" => Ok(Contract::Service),
            "next-api" | "next" => Ok(Contract::NextApi),
            other => Err(anyhow!(
                "unknown contract '{}' (expected 'service' or 'next-api')",
                other
            )),
        }
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contract::Service => f.write_str("service"),
            Contract::NextApi => f.write_str("next-api"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: Url,
    pub contract: Contract,
}

impl Settings {
    /// Resolves settings from command line values, falling back to the environment.
    pub fn resolve(api_url: Option<String>, contract: Option<String>) -> Result<Self> {
        let api_url = api_url.or_else(|| std::env::var(API_URL_ENV).ok());
        let contract = contract.or_else(|| std::env::var(CONTRACT_ENV).ok());
        Self::from_values(api_url.as_deref(), contract.as_deref())
    }

    fn from_values(api_url: Option<&str>, contract: Option<&str>) -> Result<Self> {
        let raw = api_url
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_API_URL);

        // Keep a trailing slash so joins stay under any path prefix
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{}/", raw)
        };
        let api_url = Url::parse(&normalized)
            .with_context(|| format!("invalid analysis service URL '{}'", raw))?;

        let contract = match contract.map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => value.parse()?,
            None => Contract::default(),
        };

        Ok(Self { api_url, contract })
    }
}
