//! JSON document holding workflow definitions and their execution history

use super::model::{WorkflowDefinition, WorkflowExecution};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub workflows: Vec<WorkflowDefinition>,
    #[serde(default)]
    pub executions: Vec<WorkflowExecution>,
}

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

impl Default for WorkflowDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            workflows: Vec::new(),
            executions: Vec::new(),
        }
    }
}

impl WorkflowDocument {
    /// Read the document at `path`; a missing file is an empty document
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Workflow file {:?} doesn't exist, starting empty", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow file: {:?}", path))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let document: WorkflowDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse workflow file: {:?}", path))?;
        if document.version > DOCUMENT_VERSION {
            anyhow::bail!(
                "Workflow file {:?} has version {}, newest supported is {}",
                path,
                document.version,
                DOCUMENT_VERSION
            );
        }

        debug!(
            "Loaded {} workflows from {:?}",
            document.workflows.len(),
            path
        );
        Ok(document)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize workflows")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write workflow file: {:?}", path))?;

        debug!("Saved {} workflows to {:?}", self.workflows.len(), path);
        Ok(())
    }
}
