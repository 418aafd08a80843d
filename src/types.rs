use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::contest::Contest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topics {
    #[serde(default)]
    pub primary_topics: Vec<u32>,
    #[serde(default)]
    pub secondary_topics: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solutions {
    pub solution: String,
    pub ans: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub year: u32,
    pub number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(default)]
    pub answers: Vec<String>,
    pub solutions: Solutions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Topics>,
    pub source: Source,
    /// Entries scraped without results carry the median difficulty.
    #[serde(default = "median_percentage_correct")]
    pub percentage_correct: f64,
}

fn median_percentage_correct() -> f64 {
    50.0
}

impl Question {
    /// Question number as printed on the paper; stored numbers are 0-based.
    pub fn display_number(&self) -> u32 {
        self.source.number + 1
    }

    /// Identifier used in the answer history, e.g. `2019#15`.
    pub fn id(&self) -> String {
        format!("{}#{}", self.source.year, self.display_number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubQuestionKind {
    Short,
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQuestion {
    pub html: String,
    pub solution: String,
    #[serde(default)]
    pub points: u32,
    #[serde(rename = "type")]
    pub kind: SubQuestionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceQuestion {
    #[serde(default)]
    pub base: Option<String>,
    pub sub_questions: Vec<SubQuestion>,
    pub source: Source,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContestFile<Q> {
    pub data: Vec<Q>,
    #[serde(default)]
    pub legend: HashMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicStats {
    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub time: f64,
}

impl TopicStats {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }

    pub fn avg_time(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.time / self.total as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question: String,
    pub correct: bool,
    pub topics: Vec<u32>,
}

/// One graded answer, as handed to [`UserStats::record_answer`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub question: String,
    pub correct: bool,
    pub topics: Vec<u32>,
    pub seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserStats {
    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub streak: u32,
    pub time: f64,
    pub history: Vec<HistoryEntry>,
    pub topic_stats: HashMap<u32, TopicStats>,
}

impl UserStats {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }

    pub fn avg_time(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.time / self.total as f64
    }

    pub fn record_answer(&mut self, answer: &AnswerRecord) {
        let seconds = if answer.seconds.is_finite() {
            answer.seconds.max(0.0)
        } else {
            0.0
        };

        self.total += 1;
        self.time += seconds;
        if answer.correct {
            self.correct += 1;
            self.streak += 1;
        } else {
            self.incorrect += 1;
            self.streak = 0;
        }

        for topic in &answer.topics {
            let stats = self.topic_stats.entry(*topic).or_default();
            stats.total += 1;
            stats.time += seconds;
            if answer.correct {
                stats.correct += 1;
            } else {
                stats.incorrect += 1;
            }
        }

        self.history.push(HistoryEntry {
            question: answer.question.clone(),
            correct: answer.correct,
            topics: answer.topics.clone(),
        });

        debug!(
            question = %answer.question,
            correct = answer.correct,
            seconds = seconds,
            total = self.total,
            streak = self.streak,
            "Recorded answer"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Initial,  // First start, waiting for Enter
    Ready,    // Question shown, waiting for an answer
    Feedback, // Answer graded, solution shown
    Paused,   // Empty answer submitted, waiting for Enter
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Adaptive,
    Exam,
    Sequence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub correct: bool,
    pub expected: String,
    pub seconds: f64,
}

#[derive(Debug)]
pub struct AppState {
    pub mode: AppMode,
    pub contest: Contest,
    pub topic: u32,
    pub session: SessionKind,
    pub current: Option<Question>,
    pub current_sequence: Option<SequenceQuestion>,
    pub sub_index: usize,
    pub input_buffer: String,
    pub start_time: Option<DateTime<Utc>>,
    pub outcome: Option<Outcome>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Initial,
            contest: Contest::Pascal,
            topic: 0,
            session: SessionKind::Adaptive,
            current: None,
            current_sequence: None,
            sub_index: 0,
            input_buffer: String::new(),
            start_time: None,
            outcome: None,
        }
    }
}
