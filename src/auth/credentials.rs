use crate::config::Config;
use crate::error::CoreError;
use log::{debug, info};
use std::fmt;
use std::path::Path;

/// Environment variables checked for a token, in order
pub const TOKEN_VARIABLES: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    Environment(&'static str),
    ConfigFile,
    Prompt,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment(name) => write!(f, "environment ({})", name),
            Self::ConfigFile => f.write_str("config file"),
            Self::Prompt => f.write_str("prompt"),
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub token: String,
    pub source: TokenSource,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.masked())
            .field("source", &self.source)
            .finish()
    }
}

impl Credentials {
    pub fn new(token: impl Into<String>, source: TokenSource) -> Self {
        Self {
            token: token.into(),
            source,
        }
    }

    /// Resolve a token from the process environment (after loading `.env`
    /// when present), falling back to the config file
    pub fn resolve(config: &Config) -> Result<Credentials, CoreError> {
        if dotenvy::dotenv().is_ok() {
            debug!("Loaded variables from .env");
        }

        Self::resolve_with(|name| std::env::var(name).ok(), config.auth.token.as_deref())
            .ok_or_else(|| {
                CoreError::AuthenticationFailure(format!(
                    "no GitHub token found; set {} or run `gh-projects auth login`",
                    TOKEN_VARIABLES.join(" or ")
                ))
            })
    }

    /// Resolution order: `GITHUB_TOKEN`, `GH_TOKEN`, then the stored token.
    /// Blank values are skipped.
    pub fn resolve_with<F>(lookup: F, stored: Option<&str>) -> Option<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        for name in TOKEN_VARIABLES {
            if let Some(token) = lookup(name).filter(|t| !t.trim().is_empty()) {
                info!("Using token from {}", name);
                return Some(Self::new(token.trim(), TokenSource::Environment(name)));
            }
        }

        stored
            .filter(|t| !t.trim().is_empty())
            .map(|token| {
                info!("Using token from config file");
                Self::new(token.trim(), TokenSource::ConfigFile)
            })
    }

    /// Read `GITHUB_TOKEN`/`GH_TOKEN` from a specific env file without
    /// touching the process environment
    pub fn from_env_file(path: &Path) -> anyhow::Result<Credentials> {
        info!("Importing token from env file: {:?}", path);
        if !path.exists() {
            anyhow::bail!("Environment file not found: {:?}", path);
        }

        let mut found = Vec::new();
        for entry in dotenvy::from_path_iter(path)
            .map_err(|e| anyhow::anyhow!("Failed to load env file {:?}: {}", path, e))?
        {
            let (key, value) =
                entry.map_err(|e| anyhow::anyhow!("Invalid line in {:?}: {}", path, e))?;
            found.push((key, value));
        }

        Self::resolve_with(
            |name| {
                found
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.clone())
            },
            None,
        )
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Neither {} found in env file: {:?}",
                TOKEN_VARIABLES.join(" nor "),
                path
            )
        })
    }

    /// Token with everything but the prefix and last four characters hidden
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let prefix: String = chars[..4].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}{}", prefix, "*".repeat(chars.len() - 8), suffix)
    }
}
