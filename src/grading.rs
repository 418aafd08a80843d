use crate::types::{Question, Topics};

/// Primary topics followed by secondary topics.
pub fn question_topics(topics: Option<&Topics>) -> Vec<u32> {
    match topics {
        Some(t) => t
            .primary_topics
            .iter()
            .chain(t.secondary_topics.iter())
            .copied()
            .collect(),
        None => Vec::new(),
    }
}

/// Whether `parseInt` would read a number from `s`: optional whitespace,
/// optional sign, then at least one digit. The value itself is never needed.
fn starts_with_integer(s: &str) -> bool {
    let s = s.trim_start();
    let rest = s.strip_prefix(['-', '+']).unwrap_or(s);
    rest.starts_with(|c: char| c.is_ascii_digit())
}

/// Answers that do not start with a number are option letters.
pub fn is_multiple_choice(ans: &str) -> bool {
    !starts_with_integer(ans)
}

fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

pub fn is_answer_correct(question: &Question, option: &str) -> bool {
    let ans = &question.solutions.ans;
    if is_multiple_choice(ans) {
        let correct_index = match ans.chars().next() {
            Some(c) if c.is_ascii_uppercase() => (c as u8 - b'A') as usize,
            _ => return false,
        };
        match question.answers.iter().position(|a| a == option) {
            Some(index) => index == correct_index,
            None => false,
        }
    } else {
        normalize(option) == normalize(ans)
    }
}

/// Grades what was typed in the terminal. For multiple choice questions a
/// single letter picks the option at that position.
pub fn grade_input(question: &Question, input: &str) -> bool {
    let input = input.trim();
    if is_multiple_choice(&question.solutions.ans) {
        let mut chars = input.chars();
        if let (Some(letter), None) = (chars.next(), chars.next()) {
            let letter = letter.to_ascii_uppercase();
            if letter.is_ascii_uppercase() {
                let index = (letter as u8 - b'A') as usize;
                if let Some(option) = question.answers.get(index) {
                    return is_answer_correct(question, option);
                }
            }
        }
    }
    is_answer_correct(question, input)
}

/// The answer as it should be shown after grading.
pub fn expected_answer(question: &Question) -> String {
    let ans = question.solutions.ans.trim();
    if !is_multiple_choice(ans) {
        return ans.to_string();
    }
    let option = ans
        .chars()
        .next()
        .filter(|c| c.is_ascii_uppercase())
        .and_then(|c| question.answers.get((c as u8 - b'A') as usize));
    match option {
        Some(text) => format!("({}) {}", ans, crate::render::answer_text(text)),
        None => ans.to_string(),
    }
}
