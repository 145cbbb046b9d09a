//! Run orchestration: provision, invoke scripts, commit — strictly in
//! that order, fail-fast. A lock file in the pipeline directory keeps a
//! manual dispatch from racing an in-flight scheduled run over the same
//! working tree.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::commit::{ChangeCommitter, CommitError, CommitOutcome};
use crate::config::JobConfig;
use crate::pipeline::{PipelineError, ScriptInvoker, StepReport};
use crate::provision::{ProvisionError, Provisioner};
use crate::schedule::{Schedule, ScheduleError};
use crate::subprocess::SubprocessManager;

pub const LOCK_FILE: &str = ".dailytopics-runner.lock";

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("another run is already in progress (lock file {lock_path} exists)")]
    AlreadyRunning { lock_path: String },

    #[error("failed to create lock file {lock_path}: {source}")]
    Lock {
        lock_path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Manual,
    Scheduled,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepReport>,
    pub commit: CommitOutcome,
}

/// Exclusive run guard. Created with `create_new` so two concurrent
/// runs cannot both hold it; removed when the run finishes, including
/// on error paths via Drop.
struct RunLock {
    path: PathBuf,
}

impl RunLock {
    fn acquire(dir: &Path) -> Result<Self, RunError> {
        let path = dir.join(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(RunError::AlreadyRunning {
                    lock_path: path.display().to_string(),
                })
            }
            Err(source) => Err(RunError::Lock {
                lock_path: path.display().to_string(),
                source,
            }),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("failed to remove lock file {:?}: {}", self.path, e);
        }
    }
}

pub struct JobRunner {
    config: JobConfig,
    provisioner: Provisioner,
    invoker: ScriptInvoker,
    committer: ChangeCommitter,
}

impl JobRunner {
    pub fn new(config: JobConfig, subprocess: SubprocessManager) -> Self {
        let provisioner = Provisioner::new(subprocess.clone());
        let invoker = ScriptInvoker::new(subprocess.clone());
        let committer = ChangeCommitter::new(subprocess, config.commit.clone());
        Self {
            config,
            provisioner,
            invoker,
            committer,
        }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// One complete run. Manual dispatch and a scheduled tick differ
    /// only in the trigger recorded on the report.
    pub async fn run_once(&self, trigger: Trigger) -> Result<RunReport, RunError> {
        let dir = &self.config.pipeline_dir;
        let _lock = RunLock::acquire(dir)?;
        let started_at = Utc::now();
        tracing::info!("starting {:?} run", trigger);

        let forwarded_env = self.collect_forwarded_env();

        self.provisioner
            .provision(&self.config.provision, dir, &forwarded_env)
            .await?;

        let steps = self
            .invoker
            .run_steps(&self.config.steps, dir, &forwarded_env)
            .await?;

        let commit = self
            .committer
            .commit_changes(dir, &self.config.data_dir, Utc::now())
            .await?;

        let report = RunReport {
            trigger,
            started_at,
            finished_at: Utc::now(),
            steps,
            commit,
        };
        tracing::info!(
            "run finished in {:?}",
            (report.finished_at - report.started_at).to_std().unwrap_or_default()
        );
        Ok(report)
    }

    /// Daemon loop: sleep until the next cron fire, run, repeat.
    /// A failed run is logged and does not stop the schedule; Ctrl-C
    /// shuts the loop down between runs.
    pub async fn run_scheduled(&self) -> Result<(), RunError> {
        let schedule = Schedule::parse(&self.config.schedule).map_err(RunError::Schedule)?;
        tracing::info!("schedule '{}' active", schedule.expression());

        loop {
            let now = Utc::now();
            let next = schedule
                .next_after(now)
                .ok_or_else(|| ScheduleError::NoUpcomingFire {
                    expression: schedule.expression().to_string(),
                })?;
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!("next run at {} (in {:?})", next, wait);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    match self.run_once(Trigger::Scheduled).await {
                        Ok(report) => {
                            tracing::info!("scheduled run completed: {:?}", report.commit);
                        }
                        Err(e) => {
                            // Each tick is independent; the next one still fires.
                            tracing::error!("scheduled run failed: {}", e);
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown requested, stopping scheduler");
                    return Ok(());
                }
            }
        }
    }

    fn collect_forwarded_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        for name in &self.config.forward_env {
            match std::env::var(name) {
                Ok(value) => {
                    env.insert(name.clone(), value);
                }
                Err(_) => {
                    // The scripts decide whether a missing secret is fatal.
                    tracing::warn!("environment variable {} is not set", name);
                }
            }
        }
        env
    }
}
