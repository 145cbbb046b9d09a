use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::subprocess::ProcessCommand;

pub struct ProcessCommandBuilder {
    command: ProcessCommand,
}

impl ProcessCommandBuilder {
    pub fn new(program: &str) -> Self {
        Self {
            command: ProcessCommand {
                program: program.to_string(),
                args: Vec::new(),
                env: HashMap::new(),
                working_dir: None,
                timeout: None,
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.command.args.push(arg.to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.command
            .args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.command.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            self.command
                .env
                .insert(key.as_ref().to_string(), value.as_ref().to_string());
        }
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.command.working_dir = Some(dir.to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.command.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> ProcessCommand {
        self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assembles_full_command() {
        let command = ProcessCommandBuilder::new("python")
            .arg("scripts/collect_news.py")
            .env("MONGODB_URI", "mongodb://localhost")
            .current_dir(Path::new("/tmp"))
            .timeout(Duration::from_secs(60))
            .build();

        assert_eq!(command.program, "python");
        assert_eq!(command.args, vec!["scripts/collect_news.py"]);
        assert_eq!(
            command.env.get("MONGODB_URI").map(String::as_str),
            Some("mongodb://localhost")
        );
        assert_eq!(command.working_dir.as_deref(), Some(Path::new("/tmp")));
        assert_eq!(command.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn envs_merges_pairs() {
        let command = ProcessCommandBuilder::new("python")
            .envs([("TOPIC_ALGORITHM", "lda"), ("NUM_TOPICS", "10")])
            .build();

        assert_eq!(command.env.len(), 2);
        assert_eq!(command.env.get("NUM_TOPICS").map(String::as_str), Some("10"));
    }
}
