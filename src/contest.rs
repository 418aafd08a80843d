use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{PracticeError, Result};
use crate::types::{ContestFile, Question, SequenceQuestion};

const BROTLI_BUFFER_SIZE: usize = 4096;

/// Mock exam layout: (first number, last number, questions to draw).
/// Stored question numbers are 0-based.
const EXAM_SECTIONS: [(u32, u32, usize); 3] = [(0, 9, 10), (10, 19, 10), (20, 24, 5)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contest {
    Pascal,
    Gauss7,
    Gauss8,
    Fryer,
}

impl Contest {
    pub const ALL: [Contest; 4] = [Contest::Pascal, Contest::Gauss7, Contest::Gauss8, Contest::Fryer];

    pub fn slug(&self) -> &'static str {
        match self {
            Contest::Pascal => "pascal",
            Contest::Gauss7 => "gauss7",
            Contest::Gauss8 => "gauss8",
            Contest::Fryer => "fryer",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Contest::Pascal => "Pascal",
            Contest::Gauss7 => "Gauss (Gr. 7)",
            Contest::Gauss8 => "Gauss (Gr. 8)",
            Contest::Fryer => "Fryer",
        }
    }

    /// Sequence contests are a base prompt with ordered sub-questions.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Contest::Fryer)
    }

    pub fn parse(arg: &str) -> Option<Contest> {
        // Remove leading dashes
        let arg = arg.trim_start_matches('-').to_lowercase();

        match arg.as_str() {
            "p" | "pa" | "pas" | "pasc" | "pasca" | "pascal" => Some(Contest::Pascal),
            "g7" | "gauss7" | "gauss-7" => Some(Contest::Gauss7),
            "g8" | "gauss8" | "gauss-8" => Some(Contest::Gauss8),
            "f" | "fr" | "fry" | "frye" | "fryer" => Some(Contest::Fryer),
            _ => None,
        }
    }
}

/// Directory of `{contest}_questions.json` files.
#[derive(Debug, Clone)]
pub struct ContestLibrary {
    dir: PathBuf,
}

impl ContestLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, contest: Contest) -> PathBuf {
        self.dir.join(format!("{}_questions.json", contest.slug()))
    }

    fn load_file<Q: DeserializeOwned>(&self, contest: Contest) -> Result<ContestFile<Q>> {
        let path = self.path_for(contest);
        let file = File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PracticeError::UnknownContest(format!("{} ({})", contest.slug(), path.display()))
            } else {
                PracticeError::Io(e)
            }
        })?;
        let contest_file: ContestFile<Q> = serde_json::from_reader(BufReader::new(file))?;
        info!(
            contest = contest.slug(),
            questions = contest_file.data.len(),
            topics = contest_file.legend.len(),
            "Loaded contest file"
        );
        Ok(contest_file)
    }

    pub fn load_questions(&self, contest: Contest) -> Result<ContestFile<Question>> {
        if contest.is_sequence() {
            return Err(PracticeError::InvalidInput(format!(
                "{} is a sequence contest",
                contest.display_name()
            )));
        }
        self.load_file(contest)
    }

    pub fn load_sequences(&self, contest: Contest) -> Result<ContestFile<SequenceQuestion>> {
        if !contest.is_sequence() {
            return Err(PracticeError::InvalidInput(format!(
                "{} is not a sequence contest",
                contest.display_name()
            )));
        }
        self.load_file(contest)
    }
}

/// Base64 then brotli, the encoding used for question bodies and solutions.
pub fn decode_text(encoded: &str) -> Result<String> {
    let compressed = STANDARD.decode(encoded.trim())?;
    let mut decompressor = brotli::Decompressor::new(compressed.as_slice(), BROTLI_BUFFER_SIZE);
    let mut text = String::new();
    decompressor
        .read_to_string(&mut text)
        .map_err(|e| PracticeError::Decode(e.to_string()))?;
    Ok(text)
}

pub fn decode_question(question: &Question) -> Result<Question> {
    let mut decoded = question.clone();
    decoded.question = decode_text(&question.question)?;
    decoded.solutions.solution = decode_text(&question.solutions.solution)?;
    debug!(question = %question.id(), "Decoded question");
    Ok(decoded)
}

pub fn decode_sequence(sequence: &SequenceQuestion) -> Result<SequenceQuestion> {
    let mut decoded = sequence.clone();
    if let Some(base) = &sequence.base {
        decoded.base = Some(decode_text(base)?);
    }
    for sub in decoded.sub_questions.iter_mut() {
        sub.html = decode_text(&sub.html)?;
        sub.solution = decode_text(&sub.solution)?;
    }
    Ok(decoded)
}

/// Draws a mock contest: stored numbers 0-9, 10-19 and 20-24 sampled without
/// replacement, optionally restricted to one year.
pub fn assemble_exam<'a, R: Rng + ?Sized>(
    pool: &'a [Question],
    year: Option<u32>,
    rng: &mut R,
) -> Vec<&'a Question> {
    let candidates: Vec<&Question> = pool
        .iter()
        .filter(|q| year.map_or(true, |y| q.source.year == y))
        .collect();

    let mut exam = Vec::new();
    for (first, last, count) in EXAM_SECTIONS {
        let section: Vec<&Question> = candidates
            .iter()
            .copied()
            .filter(|q| (first..=last).contains(&q.source.number))
            .collect();
        exam.extend(section.choose_multiple(&mut *rng, count).copied());
    }

    info!(
        year = ?year,
        candidates = candidates.len(),
        selected = exam.len(),
        "Assembled mock exam"
    );
    exam
}

/// Reverses the contest legend to look up topic names by id.
pub fn topic_names(legend: &HashMap<String, u32>) -> HashMap<u32, String> {
    legend.iter().map(|(name, id)| (*id, name.clone())).collect()
}
