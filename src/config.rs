use std::path::PathBuf;
use tracing::{info, warn};

use crate::contest::Contest;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding `{contest}_questions.json`
    pub contest_dir: PathBuf,
    /// Directory for the local stats files
    pub stats_dir: PathBuf,
    /// Directory for the rolling log files
    pub log_dir: PathBuf,
    pub contest: Contest,
    /// Topic filter, 0 for no preference
    pub topic: u32,
    /// Mock exam instead of adaptive practice
    pub exam: bool,
    pub exam_year: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            contest_dir: PathBuf::from("contest_files"),
            stats_dir: PathBuf::from("stats"),
            log_dir: PathBuf::from("logs"),
            contest: Contest::Pascal,
            topic: 0,
            exam: false,
            exam_year: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        Self {
            contest_dir: lookup("CONTEST_DIR").map(PathBuf::from).unwrap_or(default.contest_dir),
            stats_dir: lookup("STATS_DIR").map(PathBuf::from).unwrap_or(default.stats_dir),
            log_dir: lookup("LOG_DIR").map(PathBuf::from).unwrap_or(default.log_dir),
            contest: lookup("CONTEST").and_then(|v| Contest::parse(&v)).unwrap_or(default.contest),
            topic: lookup("TOPIC").and_then(|v| v.parse().ok()).unwrap_or(default.topic),
            exam: default.exam,
            exam_year: default.exam_year,
        }
    }

    /// Applies command-line overrides: `<contest>`, `--topic N`, `--exam [YEAR]`.
    pub fn apply_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();
            match arg {
                "--topic" | "-t" => {
                    match args.get(i + 1).and_then(|v| v.parse().ok()) {
                        Some(topic) => {
                            self.topic = topic;
                            i += 1;
                        }
                        None => warn!("--topic expects a number, keeping topic {}", self.topic),
                    }
                }
                "--exam" | "-e" => {
                    self.exam = true;
                    if let Some(year) = args.get(i + 1).and_then(|v| v.parse().ok()) {
                        self.exam_year = Some(year);
                        i += 1;
                    }
                }
                _ => match Contest::parse(arg) {
                    Some(contest) => {
                        info!("Selected {} from argument '{}'", contest.display_name(), arg);
                        self.contest = contest;
                    }
                    None => warn!("Ignoring unknown argument '{}'", arg),
                },
            }
            i += 1;
        }
        self
    }
}
