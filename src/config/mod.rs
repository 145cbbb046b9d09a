//! Job file model for the runner.
//!
//! The pipeline is declared in a small YAML file (`dailytopics.yml` by
//! default). Every field carries a default reproducing the canonical
//! twice-daily news pipeline, so a missing or empty file still yields a
//! runnable job. The `MONGODB_URI` secret is deliberately absent from
//! the file; it is read from the parent environment at run time.

pub mod loader;

pub use loader::{load, ConfigError, DEFAULT_CONFIG_FILE};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Five-field cron expression, evaluated in UTC.
    #[serde(default = "default_schedule")]
    pub schedule: String,

    /// Directory containing the pipeline checkout (scripts, data, .git).
    #[serde(default = "default_pipeline_dir")]
    pub pipeline_dir: PathBuf,

    /// Directory the scripts write into, relative to `pipeline_dir`.
    /// Only this path is staged for the commit step.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Environment variable names forwarded verbatim from the parent
    /// process to every step. Values never appear in the job file.
    #[serde(default = "default_forward_env")]
    pub forward_env: Vec<String>,

    /// Provisioning commands, run in order before the steps.
    #[serde(default = "default_provision")]
    pub provision: Vec<String>,

    /// Pipeline steps, run strictly in order.
    #[serde(default = "default_steps")]
    pub steps: Vec<StepConfig>,

    #[serde(default)]
    pub commit: CommitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    pub name: String,

    /// Command line, split with shell quoting rules.
    pub command: String,

    /// Literal environment for this step, merged over the forwarded vars.
    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommitConfig {
    #[serde(default = "default_author_name")]
    pub author_name: String,

    #[serde(default = "default_author_email")]
    pub author_email: String,

    /// The run timestamp is appended to this prefix.
    #[serde(default = "default_message_prefix")]
    pub message_prefix: String,

    #[serde(default = "default_push")]
    pub push: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            schedule: default_schedule(),
            pipeline_dir: default_pipeline_dir(),
            data_dir: default_data_dir(),
            forward_env: default_forward_env(),
            provision: default_provision(),
            steps: default_steps(),
            commit: CommitConfig::default(),
        }
    }
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            author_name: default_author_name(),
            author_email: default_author_email(),
            message_prefix: default_message_prefix(),
            push: default_push(),
        }
    }
}

fn default_schedule() -> String {
    "0 8,18 * * *".to_string()
}

fn default_pipeline_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_forward_env() -> Vec<String> {
    vec!["MONGODB_URI".to_string()]
}

fn default_provision() -> Vec<String> {
    vec![
        "python -m pip install --upgrade pip".to_string(),
        "pip install -e .".to_string(),
        "python -m nltk.downloader punkt stopwords".to_string(),
    ]
}

fn default_steps() -> Vec<StepConfig> {
    vec![
        StepConfig {
            name: "collect-news".to_string(),
            command: "python scripts/collect_news.py".to_string(),
            env: HashMap::new(),
            timeout: None,
        },
        StepConfig {
            name: "process-topics".to_string(),
            command: "python scripts/process_topics.py".to_string(),
            env: HashMap::from([
                ("TOPIC_ALGORITHM".to_string(), "lda".to_string()),
                ("NUM_TOPICS".to_string(), "10".to_string()),
            ]),
            timeout: None,
        },
    ]
}

fn default_author_name() -> String {
    "GitHub Actions".to_string()
}

fn default_author_email() -> String {
    "actions@github.com".to_string()
}

fn default_message_prefix() -> String {
    "Update data: ".to_string()
}

fn default_push() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reproduce_canonical_pipeline() {
        let config = JobConfig::default();
        assert_eq!(config.schedule, "0 8,18 * * *");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.forward_env, vec!["MONGODB_URI"]);
        assert_eq!(config.provision.len(), 3);
        assert_eq!(config.steps.len(), 2);
        assert_eq!(config.steps[0].name, "collect-news");
        assert_eq!(
            config.steps[1].env.get("TOPIC_ALGORITHM").map(String::as_str),
            Some("lda")
        );
        assert_eq!(
            config.steps[1].env.get("NUM_TOPICS").map(String::as_str),
            Some("10")
        );
        assert!(config.commit.push);
        assert_eq!(config.commit.author_email, "actions@github.com");
    }

    #[test]
    fn yaml_overrides_merge_over_defaults() {
        let yaml = r#"
schedule: "30 6 * * *"
steps:
  - name: collect
    command: python scripts/collect_news.py
    timeout: 45m
commit:
  push: false
"#;
        let config: JobConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.schedule, "30 6 * * *");
        assert_eq!(config.steps.len(), 1);
        assert_eq!(
            config.steps[0].timeout,
            Some(Duration::from_secs(45 * 60))
        );
        assert!(!config.commit.push);
        // Untouched sections keep their defaults.
        assert_eq!(config.commit.author_name, "GitHub Actions");
        assert_eq!(config.provision.len(), 3);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = "schedul: typo\n";
        assert!(serde_yaml::from_str::<JobConfig>(yaml).is_err());
    }
}
