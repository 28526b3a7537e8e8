pub mod app;
pub mod commands;
pub mod output;

pub use app::{Cli, Commands};

use anyhow::{Context, Result};
use gh_projects::api::{GitHubClient, ProjectDataProvider, ProjectRef, ResilienceConfig};
use gh_projects::auth::Credentials;
use gh_projects::config::Config;
use log::debug;
use output::OutputFormat;
use std::process::ExitCode;
use std::sync::Arc;

/// How a command finished, mapped to the process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Some items of a bulk operation failed
    PartialFailure,
    /// A structured result was printed but reports failure
    Failure,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::PartialFailure => ExitCode::from(2),
            Self::Failure => ExitCode::FAILURE,
        }
    }
}

/// State shared by every command handler
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
}

impl CommandContext {
    pub fn new(config: Config, format: Option<OutputFormat>) -> Self {
        let format =
            format.unwrap_or_else(|| OutputFormat::from_setting(&config.settings.default_format));
        Self { config, format }
    }

    /// Authenticated client configured from settings
    pub fn client(&self) -> Result<Arc<GitHubClient>> {
        let credentials = Credentials::resolve(&self.config)?;
        debug!("Using token from {}", credentials.source);
        self.client_with(&credentials.token)
    }

    pub fn client_with(&self, token: &str) -> Result<Arc<GitHubClient>> {
        let resilience = ResilienceConfig::builder()
            .request_timeout(self.config.settings.request_timeout())
            .build();
        let client = GitHubClient::new(self.config.auth.api_url.clone(), token, resilience)
            .context("Failed to create GitHub client")?
            .with_page_size(self.config.settings.page_size);
        Ok(Arc::new(client))
    }

    /// Print a value in the selected format
    pub fn emit<T, F>(&self, value: &T, render_table: F) -> Result<()>
    where
        T: serde::Serialize,
        F: FnOnce(&T) -> String,
    {
        match self.format {
            OutputFormat::Json => println!("{}", output::to_json(value)?),
            OutputFormat::Table => print!("{}", render_table(value)),
        }
        Ok(())
    }
}

/// `--owner` / `--project` pair identifying a project
#[derive(clap::Args, Debug, Clone)]
pub struct ProjectArgs {
    /// User or organization login that owns the project
    #[arg(long)]
    pub owner: String,
    /// Project number as shown in its URL
    #[arg(long)]
    pub project: u32,
}

impl ProjectArgs {
    pub fn project_ref(&self) -> ProjectRef {
        ProjectRef::new(self.owner.clone(), self.project)
    }

    /// Resolve to the project's node id
    pub async fn resolve<P>(&self, provider: &P) -> Result<String>
    where
        P: ProjectDataProvider + ?Sized,
    {
        let project = provider
            .fetch_project(&self.owner, self.project)
            .await
            .map_err(gh_projects::error::CoreError::from)
            .with_context(|| format!("Failed to resolve project {}", self.project_ref()))?;
        debug!("Project {} is {}", self.project_ref(), project.id);
        Ok(project.id)
    }
}
