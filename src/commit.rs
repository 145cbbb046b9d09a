//! Change committer: stage the data directory, commit when the tree is
//! dirty, push. A clean tree is a successful no-op, never an error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use crate::config::CommitConfig;
use crate::subprocess::{ProcessCommandBuilder, ProcessError, ProcessOutput, SubprocessManager};

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("git {operation} failed with exit code {code}: {stderr}")]
    GitFailed {
        operation: String,
        code: i32,
        stderr: String,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// Nothing to commit; the step succeeded without touching history.
    Clean,
    Committed { message: String },
}

pub struct ChangeCommitter {
    subprocess: SubprocessManager,
    config: CommitConfig,
}

impl ChangeCommitter {
    pub fn new(subprocess: SubprocessManager, config: CommitConfig) -> Self {
        Self { subprocess, config }
    }

    /// Stage `data_dir`, then commit and push if anything changed in the
    /// working tree or the index.
    pub async fn commit_changes(
        &self,
        repo: &Path,
        data_dir: &Path,
        now: DateTime<Utc>,
    ) -> Result<CommitOutcome, CommitError> {
        let data = data_dir.to_string_lossy();
        self.git(repo, "add", &["add", data.as_ref()]).await?;

        let worktree_dirty = self.is_dirty(repo, &["diff", "--quiet"]).await?;
        let index_dirty = self
            .is_dirty(repo, &["diff", "--cached", "--quiet"])
            .await?;

        if !worktree_dirty && !index_dirty {
            tracing::info!("no data changes to commit");
            return Ok(CommitOutcome::Clean);
        }

        let message = format!(
            "{}{}",
            self.config.message_prefix,
            now.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let author_name = format!("user.name={}", self.config.author_name);
        let author_email = format!("user.email={}", self.config.author_email);
        self.git(
            repo,
            "commit",
            &[
                "-c",
                &author_name,
                "-c",
                &author_email,
                "commit",
                "-m",
                &message,
            ],
        )
        .await?;
        tracing::info!("committed data changes: {}", message);

        if self.config.push {
            self.git(repo, "push", &["push"]).await?;
            tracing::info!("pushed to remote");
        }

        Ok(CommitOutcome::Committed { message })
    }

    /// `git diff --quiet` speaks through its exit code: 0 clean, 1 dirty.
    async fn is_dirty(&self, repo: &Path, args: &[&str]) -> Result<bool, CommitError> {
        let output = self.run_git(repo, args).await?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            code => Err(CommitError::GitFailed {
                operation: args.join(" "),
                code: code.unwrap_or(-1),
                stderr: output.stderr.trim_end().to_string(),
            }),
        }
    }

    async fn git(
        &self,
        repo: &Path,
        operation: &str,
        args: &[&str],
    ) -> Result<ProcessOutput, CommitError> {
        let output = self.run_git(repo, args).await?;
        if !output.status.success() {
            return Err(CommitError::GitFailed {
                operation: operation.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: output.stderr.trim_end().to_string(),
            });
        }
        Ok(output)
    }

    async fn run_git(&self, repo: &Path, args: &[&str]) -> Result<ProcessOutput, CommitError> {
        Ok(self
            .subprocess
            .runner()
            .run(
                ProcessCommandBuilder::new("git")
                    .args(args)
                    .current_dir(repo)
                    .build(),
            )
            .await?)
    }
}
