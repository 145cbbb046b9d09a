use std::path::Path;

use super::JobConfig;
use crate::schedule::Schedule;

pub const DEFAULT_CONFIG_FILE: &str = "dailytopics.yml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read job file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse job file {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("invalid schedule '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },

    #[error("job file declares no steps")]
    NoSteps,

    #[error("step '{name}' has an empty command")]
    EmptyCommand { name: String },
}

/// Load the job configuration.
///
/// An explicit path must exist; the default path may be absent, in which
/// case the built-in pipeline definition is used.
pub async fn load(path: Option<&Path>) -> Result<JobConfig, ConfigError> {
    let config = match path {
        Some(path) => read_file(path).await?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                read_file(default).await?
            } else {
                tracing::debug!("no {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                JobConfig::default()
            }
        }
    };

    validate(&config)?;
    Ok(config)
}

async fn read_file(path: &Path) -> Result<JobConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

    // An intentionally empty file means "all defaults".
    if content.trim().is_empty() {
        return Ok(JobConfig::default());
    }

    serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.display().to_string(),
        source,
    })
}

fn validate(config: &JobConfig) -> Result<(), ConfigError> {
    Schedule::parse(&config.schedule).map_err(|e| ConfigError::InvalidSchedule {
        expression: config.schedule.clone(),
        reason: e.to_string(),
    })?;

    if config.steps.is_empty() {
        return Err(ConfigError::NoSteps);
    }

    for step in &config.steps {
        if step.command.trim().is_empty() {
            return Err(ConfigError::EmptyCommand {
                name: step.name.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn explicit_missing_path_is_an_error() {
        let result = load(Some(Path::new("/nonexistent/job.yml"))).await;
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[tokio::test]
    async fn empty_file_falls_back_to_defaults() {
        let file = NamedTempFile::new().unwrap();
        let config = load(Some(file.path())).await.unwrap();
        assert_eq!(config.steps.len(), 2);
    }

    #[tokio::test]
    async fn invalid_schedule_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "schedule: \"not a cron line\"").unwrap();
        let result = load(Some(file.path())).await;
        assert!(matches!(result, Err(ConfigError::InvalidSchedule { .. })));
    }

    #[tokio::test]
    async fn empty_step_list_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "steps: []").unwrap();
        let result = load(Some(file.path())).await;
        assert!(matches!(result, Err(ConfigError::NoSteps)));
    }

    #[tokio::test]
    async fn blank_step_command_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "steps:\n  - name: broken\n    command: \"   \"\n"
        )
        .unwrap();
        let result = load(Some(file.path())).await;
        match result.unwrap_err() {
            ConfigError::EmptyCommand { name } => assert_eq!(name, "broken"),
            other => panic!("expected EmptyCommand, got {other:?}"),
        }
    }
}
