//! # dailytopics-runner
//!
//! Scheduled job runner for the dailytopics news pipeline. Twice a day
//! (or on demand) it provisions the pipeline environment, runs the
//! collection and topic-modeling scripts in order, and commits any
//! resulting changes under `data/` back to the repository.
//!
//! ## Modules
//!
//! - `config` - Job file model and loader (YAML, defaults mirror the canonical pipeline)
//! - `schedule` - Cron trigger parsing and next-fire computation
//! - `provision` - Dependency installs and NLP asset downloads
//! - `pipeline` - Sequential script invocation with forwarded secrets
//! - `commit` - Stage, diff-check, commit, push of the data directory
//! - `runner` - Run orchestration, overlap guard, and the daemon loop
//! - `subprocess` - Unified subprocess abstraction layer for testing

pub mod commit;
pub mod config;
pub mod pipeline;
pub mod provision;
pub mod runner;
pub mod schedule;
pub mod subprocess;
