//! Environment provisioning: dependency installs and NLP asset
//! downloads, run in order before any pipeline step. Fail-fast; the
//! first non-zero exit aborts the whole run.

use std::collections::HashMap;
use std::path::Path;

use crate::subprocess::{ProcessCommandBuilder, ProcessError, SubprocessManager};

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("provisioning command '{command}' is not parseable: {source}")]
    Parse {
        command: String,
        source: shell_words::ParseError,
    },

    #[error("provisioning command '{command}' is empty")]
    EmptyCommand { command: String },

    #[error("provisioning command '{command}' failed with exit code {code}")]
    CommandFailed { command: String, code: i32 },

    #[error(transparent)]
    Process(#[from] ProcessError),
}

pub struct Provisioner {
    subprocess: SubprocessManager,
}

impl Provisioner {
    pub fn new(subprocess: SubprocessManager) -> Self {
        Self { subprocess }
    }

    pub async fn provision(
        &self,
        commands: &[String],
        working_dir: &Path,
        env: &HashMap<String, String>,
    ) -> Result<(), ProvisionError> {
        for command in commands {
            self.run_command(command, working_dir, env).await?;
        }
        Ok(())
    }

    async fn run_command(
        &self,
        command: &str,
        working_dir: &Path,
        env: &HashMap<String, String>,
    ) -> Result<(), ProvisionError> {
        let words = shell_words::split(command).map_err(|source| ProvisionError::Parse {
            command: command.to_string(),
            source,
        })?;

        let (program, args) = words.split_first().ok_or_else(|| {
            ProvisionError::EmptyCommand {
                command: command.to_string(),
            }
        })?;

        tracing::info!("provisioning: {}", command);

        let output = self
            .subprocess
            .runner()
            .run(
                ProcessCommandBuilder::new(program)
                    .args(args)
                    .envs(env.iter())
                    .current_dir(working_dir)
                    .build(),
            )
            .await?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            tracing::error!(
                "provisioning command failed (exit {}): {}",
                code,
                command
            );
            if !output.stderr.is_empty() {
                tracing::debug!("stderr: {}", output.stderr.trim_end());
            }
            return Err(ProvisionError::CommandFailed {
                command: command.to_string(),
                code,
            });
        }

        Ok(())
    }
}
