//! Sequential script invocation. Each step inherits the forwarded
//! environment (the `MONGODB_URI` secret when present) plus its own
//! literal variables; a non-zero exit aborts the run immediately.

use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::config::StepConfig;
use crate::subprocess::{ProcessCommandBuilder, ProcessError, SubprocessManager};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("step '{name}' command is not parseable: {source}")]
    Parse {
        name: String,
        source: shell_words::ParseError,
    },

    #[error("step '{name}' command is empty")]
    EmptyCommand { name: String },

    #[error("step '{name}' failed with exit code {code}")]
    StepFailed { name: String, code: i32 },

    #[error("step '{name}': {source}")]
    Process {
        name: String,
        source: ProcessError,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub name: String,
    pub exit_code: i32,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

pub struct ScriptInvoker {
    subprocess: SubprocessManager,
}

impl ScriptInvoker {
    pub fn new(subprocess: SubprocessManager) -> Self {
        Self { subprocess }
    }

    pub async fn run_steps(
        &self,
        steps: &[StepConfig],
        working_dir: &Path,
        forwarded_env: &HashMap<String, String>,
    ) -> Result<Vec<StepReport>, PipelineError> {
        let mut reports = Vec::with_capacity(steps.len());
        for step in steps {
            reports.push(self.run_step(step, working_dir, forwarded_env).await?);
        }
        Ok(reports)
    }

    async fn run_step(
        &self,
        step: &StepConfig,
        working_dir: &Path,
        forwarded_env: &HashMap<String, String>,
    ) -> Result<StepReport, PipelineError> {
        let words = shell_words::split(&step.command).map_err(|source| PipelineError::Parse {
            name: step.name.clone(),
            source,
        })?;

        let (program, args) = words.split_first().ok_or_else(|| {
            PipelineError::EmptyCommand {
                name: step.name.clone(),
            }
        })?;

        tracing::info!("running step '{}': {}", step.name, step.command);

        let mut builder = ProcessCommandBuilder::new(program)
            .args(args)
            .envs(forwarded_env.iter())
            .envs(step.env.iter())
            .current_dir(working_dir);
        if let Some(timeout) = step.timeout {
            builder = builder.timeout(timeout);
        }

        let output = self
            .subprocess
            .runner()
            .run(builder.build())
            .await
            .map_err(|source| PipelineError::Process {
                name: step.name.clone(),
                source,
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            tracing::error!("step '{}' failed with exit code {}", step.name, code);
            if !output.stderr.is_empty() {
                tracing::debug!("stderr: {}", output.stderr.trim_end());
            }
            return Err(PipelineError::StepFailed {
                name: step.name.clone(),
                code,
            });
        }

        tracing::info!(
            "step '{}' completed in {:?}",
            step.name,
            output.duration
        );

        Ok(StepReport {
            name: step.name.clone(),
            exit_code: 0,
            duration: output.duration,
        })
    }
}
