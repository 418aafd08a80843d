use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use rand::Rng;
use ratatui::layout::Alignment;
use ratatui::widgets::Axis;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Block, Borders, Chart, Dataset, GraphType, Paragraph, Wrap},
    Frame,
};
use tracing::{info, warn};

use crate::config::Config;
use crate::contest::{assemble_exam, decode_question, decode_sequence, topic_names};
use crate::error::{PracticeError, Result};
use crate::grading::{expected_answer, grade_input, question_topics};
use crate::render::{answer_text, to_plain_text};
use crate::selector::next_question;
use crate::stats_store::StatsCache;
use crate::types::*;

const OPTION_LETTERS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

/// Questions loaded for the session's contest.
pub enum QuestionPool {
    Standard(ContestFile<Question>),
    Sequence(ContestFile<SequenceQuestion>),
}

pub struct App {
    pub state: AppState,
    pub should_quit: bool,
    questions: Vec<Question>,
    sequences: Vec<SequenceQuestion>,
    topic_names: HashMap<u32, String>,
    exam_queue: VecDeque<Question>,
    stats: StatsCache,
}

impl App {
    pub fn new(config: &Config, pool: QuestionPool, stats: StatsCache) -> Self {
        let mut state = AppState {
            contest: config.contest,
            topic: config.topic,
            ..AppState::default()
        };

        let (questions, sequences, legend) = match pool {
            QuestionPool::Standard(file) => (file.data, Vec::new(), file.legend),
            QuestionPool::Sequence(file) => (Vec::new(), file.data, file.legend),
        };

        let mut exam_queue = VecDeque::new();
        if !sequences.is_empty() || (questions.is_empty() && config.contest.is_sequence()) {
            state.session = SessionKind::Sequence;
        } else if config.exam {
            state.session = SessionKind::Exam;
            let mut rng = rand::thread_rng();
            exam_queue = assemble_exam(&questions, config.exam_year, &mut rng)
                .into_iter()
                .cloned()
                .collect();
        }

        info!(
            contest = config.contest.slug(),
            topic = config.topic,
            session = ?state.session,
            questions = questions.len(),
            sequences = sequences.len(),
            "Practice session created"
        );

        Self {
            state,
            should_quit: false,
            questions,
            sequences,
            topic_names: topic_names(&legend),
            exam_queue,
            stats,
        }
    }

    fn stats_key(&self) -> &'static str {
        self.state.contest.slug()
    }

    pub fn stats(&mut self) -> &UserStats {
        let key = self.stats_key();
        self.stats.get(key)
    }

    pub fn handle_enter(&mut self) -> Result<()> {
        match self.state.mode {
            AppMode::Initial | AppMode::Paused => {
                self.state.mode = AppMode::Ready;
                if self.state.current.is_none() && self.state.current_sequence.is_none() {
                    self.select_next_question()?;
                } else {
                    self.state.start_time = Some(Utc::now());
                }
            }
            AppMode::Ready => {
                if self.state.session == SessionKind::Sequence {
                    self.state.mode = AppMode::Feedback;
                } else if self.state.input_buffer.trim().is_empty() {
                    self.state.mode = AppMode::Paused;
                    self.state.start_time = None;
                    self.state.input_buffer.clear();
                } else {
                    self.check_answer()?;
                }
            }
            AppMode::Feedback => {
                self.state.mode = AppMode::Ready;
                if !self.advance_sub_question() {
                    self.select_next_question()?;
                }
            }
        }
        Ok(())
    }

    /// Moves to the next part of the current sequence question, if any.
    fn advance_sub_question(&mut self) -> bool {
        let parts = match &self.state.current_sequence {
            Some(sequence) => sequence.sub_questions.len(),
            None => return false,
        };
        if self.state.sub_index + 1 < parts {
            self.state.sub_index += 1;
            self.state.input_buffer.clear();
            self.state.start_time = Some(Utc::now());
            true
        } else {
            false
        }
    }

    /// Shows the next question. Entries that fail to decode are logged and
    /// dropped from the session so a corrupt contest file never stalls it.
    pub fn select_next_question(&mut self) -> Result<()> {
        let mut rng = rand::thread_rng();

        match self.state.session {
            SessionKind::Sequence => loop {
                if self.sequences.is_empty() {
                    return Err(PracticeError::InvalidInput("contest has no questions".to_string()));
                }
                let index = rng.gen_range(0..self.sequences.len());
                match decode_sequence(&self.sequences[index]) {
                    Ok(decoded) => {
                        self.state.current_sequence = Some(decoded);
                        self.state.sub_index = 0;
                        break;
                    }
                    Err(PracticeError::Decode(e)) => {
                        let source = self.sequences.swap_remove(index).source;
                        warn!(year = source.year, number = source.number, error = %e, "Dropping sequence that failed to decode");
                    }
                    Err(e) => return Err(e),
                }
            },
            SessionKind::Exam => loop {
                let Some(question) = self.exam_queue.pop_front() else {
                    info!("Mock exam finished, continuing with adaptive practice");
                    self.state.session = SessionKind::Adaptive;
                    return self.select_next_question();
                };
                match decode_question(&question) {
                    Ok(decoded) => {
                        self.state.current = Some(decoded);
                        break;
                    }
                    Err(PracticeError::Decode(e)) => {
                        warn!(question = %question.id(), error = %e, "Skipping exam question that failed to decode");
                    }
                    Err(e) => return Err(e),
                }
            },
            SessionKind::Adaptive => loop {
                let key = self.stats_key();
                let stats = self.stats.get(key);
                let question = next_question(&self.questions, self.state.topic, stats, &mut rng)
                    .ok_or_else(|| PracticeError::InvalidInput("contest has no questions".to_string()))?;
                match decode_question(question) {
                    Ok(decoded) => {
                        self.state.current = Some(decoded);
                        break;
                    }
                    Err(PracticeError::Decode(e)) => {
                        let id = question.id();
                        let index = self.questions.iter().position(|q| std::ptr::eq(q, question));
                        warn!(question = %id, error = %e, "Dropping question that failed to decode");
                        if let Some(index) = index {
                            self.questions.swap_remove(index);
                        }
                    }
                    Err(e) => return Err(e),
                }
            },
        }

        self.state.outcome = None;
        self.state.input_buffer.clear();
        self.state.start_time = Some(Utc::now());
        Ok(())
    }

    pub fn handle_input(&mut self, c: char) {
        self.state.input_buffer.push(c);
    }

    pub fn check_answer(&mut self) -> Result<bool> {
        if self.state.mode != AppMode::Ready {
            return Ok(false);
        }

        if let (Some(question), Some(start_time)) =
            (self.state.current.as_ref(), self.state.start_time)
        {
            let seconds = (Utc::now() - start_time).num_milliseconds() as f64 / 1000.0;
            let input = self.state.input_buffer.trim().to_string();
            let correct = grade_input(question, &input);

            let record = AnswerRecord {
                question: question.id(),
                correct,
                topics: question_topics(question.topics.as_ref()),
                seconds,
            };
            let outcome = Outcome {
                correct,
                expected: expected_answer(question),
                seconds,
            };

            let key = self.stats_key();
            self.stats.record_answer(key, &record);

            info!(
                question = %record.question,
                input = %input,
                correct = correct,
                seconds = seconds,
                "Answer checked"
            );

            self.state.outcome = Some(outcome);
            self.state.mode = AppMode::Feedback;
            self.state.input_buffer.clear();
            Ok(correct)
        } else {
            warn!("Answer submitted without an active question");
            Ok(false)
        }
    }

    pub fn reset_stats(&mut self) {
        let key = self.stats_key();
        self.stats.reset(key);
    }

    pub fn render(&mut self, f: &mut Frame) {
        let key = self.stats_key();
        let stats = self.stats.get(key).clone();

        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),       // Contest header
                Constraint::Percentage(50),  // Question and feedback
                Constraint::Length(3),       // User input field
                Constraint::Min(8),          // Progress and topic statistics
                Constraint::Length(3),       // Help information
            ])
            .split(f.area());

        self.render_header(f, main_chunks[0], &stats);
        self.render_question_area(f, main_chunks[1]);
        self.render_input(f, main_chunks[2]);
        self.render_progress(f, main_chunks[3], &stats);
        self.render_help(f, main_chunks[4]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect, stats: &UserStats) {
        let topic = match self.state.topic {
            0 => "All topics".to_string(),
            t => self.topic_name(t),
        };
        let session = match self.state.session {
            SessionKind::Adaptive => "Adaptive",
            SessionKind::Exam => "Mock exam",
            SessionKind::Sequence => "Sequence",
        };
        let line = Line::from(vec![
            Span::styled(
                self.state.contest.display_name(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" | {} | {}", session, topic)),
            Span::raw(format!(
                " | {} answered, {:.0}% correct, streak {}",
                stats.total,
                stats.success_rate() * 100.0,
                stats.streak
            )),
        ]);
        f.render_widget(
            Paragraph::new(line)
                .block(Block::default().borders(Borders::ALL))
                .alignment(Alignment::Center),
            area,
        );
    }

    fn topic_name(&self, topic: u32) -> String {
        self.topic_names
            .get(&topic)
            .cloned()
            .unwrap_or_else(|| format!("Topic {}", topic))
    }

    fn render_question_area(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);

        let (title, body) = self.question_text();
        f.render_widget(
            Paragraph::new(body)
                .block(Block::default().title(title).borders(Borders::ALL))
                .wrap(Wrap { trim: false }),
            chunks[0],
        );

        f.render_widget(
            Paragraph::new(self.feedback_text())
                .block(Block::default().title("Solution").borders(Borders::ALL))
                .wrap(Wrap { trim: false }),
            chunks[1],
        );
    }

    fn question_text(&self) -> (String, Vec<Line>) {
        match self.state.mode {
            AppMode::Initial => return ("Question".to_string(), vec![Line::from("Press Enter to start")]),
            AppMode::Paused => return ("Question".to_string(), vec![Line::from("Press Enter to continue")]),
            _ => {}
        }

        if let Some(sequence) = &self.state.current_sequence {
            let mut lines: Vec<Line> = Vec::new();
            if let Some(base) = &sequence.base {
                lines.extend(to_plain_text(base).lines().map(|l| Line::from(l.to_string())));
                lines.push(Line::from(""));
            }
            if let Some(sub) = sequence.sub_questions.get(self.state.sub_index) {
                lines.extend(to_plain_text(&sub.html).lines().map(|l| Line::from(l.to_string())));
            }
            let title = format!(
                "{} #{} part {}/{}",
                sequence.source.year,
                sequence.source.number,
                self.state.sub_index + 1,
                sequence.sub_questions.len()
            );
            return (title, lines);
        }

        match &self.state.current {
            Some(question) => {
                let mut lines: Vec<Line> = to_plain_text(&question.question)
                    .lines()
                    .map(|l| Line::from(l.to_string()))
                    .collect();
                if !question.answers.is_empty() {
                    lines.push(Line::from(""));
                }
                for (letter, option) in OPTION_LETTERS.iter().zip(question.answers.iter()) {
                    lines.push(Line::from(vec![
                        Span::styled(format!("({}) ", letter), Style::default().fg(Color::Yellow)),
                        Span::raw(answer_text(option)),
                    ]));
                }
                let title = format!("{} #{}", question.source.year, question.display_number());
                (title, lines)
            }
            None => ("Question".to_string(), vec![Line::from("Loading...")]),
        }
    }

    fn feedback_text(&self) -> Vec<Line> {
        if self.state.mode != AppMode::Feedback {
            return Vec::new();
        }

        let mut lines = Vec::new();
        if let Some(outcome) = &self.state.outcome {
            let (label, color) = if outcome.correct {
                ("Correct!", Color::Green)
            } else {
                ("Incorrect", Color::Red)
            };
            lines.push(Line::from(vec![
                Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(format!(" ({:.1}s)", outcome.seconds)),
            ]));
            lines.push(Line::from(format!("Answer: {}", outcome.expected)));
            lines.push(Line::from(""));
        }

        let solution = match (&self.state.current_sequence, &self.state.current) {
            (Some(sequence), _) => sequence
                .sub_questions
                .get(self.state.sub_index)
                .map(|sub| {
                    let kind = match sub.kind {
                        SubQuestionKind::Short => "short answer",
                        SubQuestionKind::Full => "full solution",
                    };
                    lines.push(Line::from(format!("{} marks, {}", sub.points, kind)));
                    to_plain_text(&sub.solution)
                }),
            (None, Some(question)) => Some(to_plain_text(&question.solutions.solution)),
            (None, None) => None,
        };
        if let Some(solution) = solution {
            lines.extend(solution.lines().map(|l| Line::from(l.to_string())));
        }
        lines
    }

    fn render_input(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Answer")
            .borders(Borders::ALL);

        let input = Paragraph::new(Line::from(vec![
            Span::raw(&self.state.input_buffer)
        ]))
        .block(block)
        .alignment(Alignment::Center);

        f.render_widget(input, area);
    }

    fn render_progress(&self, f: &mut Frame, area: Rect, stats: &UserStats) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(40),
                Constraint::Percentage(30),
                Constraint::Percentage(30),
            ])
            .split(area);

        self.render_accuracy_trend(f, chunks[0], stats);

        let mut topics: Vec<(String, &TopicStats)> = stats
            .topic_stats
            .iter()
            .map(|(topic, topic_stats)| (self.topic_name(*topic), topic_stats))
            .collect();

        topics.sort_by(|a, b| a.1.success_rate().total_cmp(&b.1.success_rate()));
        f.render_widget(
            Paragraph::new(Self::render_topic_column(&topics, true))
                .block(Block::default().title("Weakest Topics").borders(Borders::ALL)),
            chunks[1],
        );

        topics.sort_by(|a, b| b.1.avg_time().total_cmp(&a.1.avg_time()));
        f.render_widget(
            Paragraph::new(Self::render_topic_column(&topics, false))
                .block(Block::default().title("Slowest Topics").borders(Borders::ALL)),
            chunks[2],
        );
    }

    fn render_accuracy_trend(&self, f: &mut Frame, area: Rect, stats: &UserStats) {
        let points = accuracy_trend(&stats.history);
        if points.is_empty() {
            f.render_widget(
                Paragraph::new("No answers yet")
                    .block(Block::default().title("Accuracy Trend (EMA)").borders(Borders::ALL)),
                area,
            );
            return;
        }

        let x_max = points.len() as f64;
        let x_labels: Vec<Span> = (0..=4)
            .map(|i| Span::from(format!("{:.0}", x_max * i as f64 / 4.0)))
            .collect();
        let y_labels: Vec<Span> = (0..=4)
            .map(|i| Span::from(format!("{}%", i * 25)))
            .collect();

        let dataset = Dataset::default()
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&points);

        let chart = Chart::new(vec![dataset])
            .block(Block::default()
                .title("Accuracy Trend (EMA)")
                .borders(Borders::ALL))
            .x_axis(
                Axis::default()
                    .title("Answers")
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, x_max])
                    .labels(x_labels)
            )
            .y_axis(
                Axis::default()
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, 100.0])
                    .labels(y_labels)
            );

        f.render_widget(chart, area);
    }

    fn render_topic_column(topics: &[(String, &TopicStats)], is_accuracy: bool) -> Vec<Line<'static>> {
        let mut text = Vec::new();

        for (name, stats) in topics.iter().take(10) {
            let accuracy = stats.success_rate();
            let avg_time = stats.avg_time();
            let display_value = if is_accuracy {
                format!("{:.0}%", accuracy * 100.0)
            } else {
                format!("{:.0}s", avg_time)
            };

            let value_color = if is_accuracy {
                if accuracy < 0.5 { Color::Red }
                else if accuracy < 0.8 { Color::Yellow }
                else { Color::Green }
            } else {
                if avg_time > 180.0 { Color::Red }
                else if avg_time > 90.0 { Color::Yellow }
                else { Color::Green }
            };

            text.push(Line::from(vec![
                Span::raw(format!("{}: ", name)),
                Span::styled(display_value, Style::default().fg(value_color)),
                Span::raw(format!(" ({})", stats.total)),
            ]));
        }

        text
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let help_text = match self.state.session {
            SessionKind::Sequence => "ESC to quit | Enter to reveal / next part | F2 to reset stats",
            _ => "ESC to quit | Enter to submit | Letter or number answers | F2 to reset stats",
        };

        let help = Paragraph::new(Line::from(help_text))
            .block(Block::default().borders(Borders::ALL));

        f.render_widget(help, area);
    }
}

/// Exponential moving average of correctness, in percent, per answer.
pub fn accuracy_trend(history: &[HistoryEntry]) -> Vec<(f64, f64)> {
    const ALPHA: f64 = 0.2;
    let mut ema = 0.0;
    history
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let value = if entry.correct { 100.0 } else { 0.0 };
            ema = if idx == 0 { value } else { ALPHA * value + (1.0 - ALPHA) * ema };
            (idx as f64, ema)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contest::tests::encode_text;
    use crate::contest::Contest;
    use crate::stats_store::tests::MemoryStore;
    use crate::stats_store::StatsEvent;
    use std::sync::Arc;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn question(number: u32, ans: &str) -> Question {
        Question {
            question: encode_text(&format!("<p>Question {}</p>", number)),
            answers: vec!["1".to_string(), "2".to_string(), "3".to_string()],
            solutions: Solutions {
                solution: encode_text("Count them."),
                ans: ans.to_string(),
            },
            topics: Some(Topics {
                primary_topics: vec![5],
                secondary_topics: vec![],
            }),
            source: Source { year: 2020, number },
            percentage_correct: 40.0,
        }
    }

    fn app(config: Config, pool: QuestionPool) -> (App, UnboundedReceiver<StatsEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cache = StatsCache::new(Arc::new(MemoryStore::default()), None, tx);
        (App::new(&config, pool, cache), rx)
    }

    fn standard(questions: Vec<Question>) -> QuestionPool {
        QuestionPool::Standard(ContestFile {
            data: questions,
            legend: HashMap::from([("Counting".to_string(), 5)]),
        })
    }

    #[test]
    fn answering_records_stats_and_shows_feedback() {
        let (mut app, mut rx) = app(Config::default(), standard(vec![question(1, "B")]));
        app.handle_enter().unwrap();
        assert_eq!(app.state.mode, AppMode::Ready);
        assert_eq!(app.state.current.as_ref().unwrap().question, "<p>Question 1</p>");
        assert_eq!(app.question_text().0, "2020 #2");

        app.handle_input('b');
        app.handle_enter().unwrap();
        assert_eq!(app.state.mode, AppMode::Feedback);
        let outcome = app.state.outcome.clone().unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.expected, "(B) 2");

        let stats = app.stats().clone();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.topic_stats[&5].correct, 1);
        assert!(matches!(rx.try_recv().unwrap(), StatsEvent::Saved { .. }));

        app.handle_enter().unwrap();
        assert_eq!(app.state.mode, AppMode::Ready);
        assert!(app.state.outcome.is_none());
    }

    #[test]
    fn empty_answer_pauses_and_resumes_same_question() {
        let (mut app, _rx) = app(Config::default(), standard(vec![question(1, "A"), question(2, "A")]));
        app.handle_enter().unwrap();
        let shown = app.state.current.clone();

        app.handle_enter().unwrap();
        assert_eq!(app.state.mode, AppMode::Paused);
        assert_eq!(app.stats().total, 0);

        app.handle_enter().unwrap();
        assert_eq!(app.state.mode, AppMode::Ready);
        assert_eq!(app.state.current, shown);
    }

    #[test]
    fn wrong_answer_breaks_streak() {
        let (mut app, _rx) = app(Config::default(), standard(vec![question(1, "C")]));
        app.handle_enter().unwrap();
        app.handle_input('a');
        assert!(!app.check_answer().unwrap());
        assert_eq!(app.stats().incorrect, 1);
        assert_eq!(app.stats().streak, 0);
        // Not in Ready any more.
        assert!(!app.check_answer().unwrap());
        assert_eq!(app.stats().total, 1);
    }

    #[test]
    fn exam_serves_queue_then_switches_to_adaptive() {
        let config = Config {
            exam: true,
            ..Config::default()
        };
        let (mut app, _rx) = app(config, standard(vec![question(3, "A"), question(14, "A")]));
        assert_eq!(app.state.session, SessionKind::Exam);

        let mut served = Vec::new();
        for _ in 0..2 {
            app.select_next_question().unwrap();
            served.push(app.state.current.as_ref().unwrap().source.number);
        }
        assert_eq!(served, vec![3, 14]);

        app.select_next_question().unwrap();
        assert_eq!(app.state.session, SessionKind::Adaptive);
        assert!(app.state.current.is_some());
    }

    #[test]
    fn sequence_parts_are_revealed_in_order() {
        let sequence = SequenceQuestion {
            base: Some(encode_text("A pattern of tiles.")),
            sub_questions: vec![
                SubQuestion {
                    html: encode_text("(a) How many?"),
                    solution: encode_text("Six."),
                    points: 2,
                    kind: SubQuestionKind::Short,
                },
                SubQuestion {
                    html: encode_text("(b) Explain."),
                    solution: encode_text("Because."),
                    points: 4,
                    kind: SubQuestionKind::Full,
                },
            ],
            source: Source { year: 2017, number: 2 },
        };
        let config = Config {
            contest: Contest::Fryer,
            ..Config::default()
        };
        let pool = QuestionPool::Sequence(ContestFile {
            data: vec![sequence],
            legend: HashMap::new(),
        });
        let (mut app, _rx) = app(config, pool);
        assert_eq!(app.state.session, SessionKind::Sequence);

        app.handle_enter().unwrap();
        assert_eq!(app.state.sub_index, 0);
        app.handle_enter().unwrap();
        assert_eq!(app.state.mode, AppMode::Feedback);
        assert!(app.feedback_text().len() > 1);

        app.handle_enter().unwrap();
        assert_eq!(app.state.mode, AppMode::Ready);
        assert_eq!(app.state.sub_index, 1);

        app.handle_enter().unwrap();
        app.handle_enter().unwrap();
        assert_eq!(app.state.sub_index, 0);
        assert_eq!(app.stats().total, 0);
    }

    #[test]
    fn corrupt_question_is_dropped_and_another_is_served() {
        let mut corrupt = question(2, "A");
        corrupt.question = "%%% not base64 %%%".to_string();
        let (mut app, _rx) = app(Config::default(), standard(vec![corrupt, question(1, "A")]));

        for _ in 0..50 {
            app.state.mode = AppMode::Initial;
            app.state.current = None;
            app.handle_enter().unwrap();
            assert_eq!(app.state.current.as_ref().unwrap().source.number, 1);
        }
        assert_eq!(app.questions.len(), 1);
    }

    #[test]
    fn corrupt_exam_question_is_skipped() {
        let mut corrupt = question(4, "A");
        corrupt.solutions.solution = "!!".to_string();
        let config = Config {
            exam: true,
            ..Config::default()
        };
        let (mut app, _rx) = app(config, standard(vec![corrupt, question(12, "A")]));
        app.select_next_question().unwrap();
        assert_eq!(app.state.current.as_ref().unwrap().source.number, 12);
        assert_eq!(app.state.session, SessionKind::Exam);
    }

    #[test]
    fn empty_pool_is_an_error() {
        let (mut app, _rx) = app(Config::default(), standard(vec![]));
        assert!(matches!(app.handle_enter(), Err(PracticeError::InvalidInput(_))));
    }

    #[test]
    fn reset_clears_current_contest_stats() {
        let (mut app, mut rx) = app(Config::default(), standard(vec![question(1, "A")]));
        app.handle_enter().unwrap();
        app.handle_input('a');
        app.handle_enter().unwrap();
        app.reset_stats();
        assert_eq!(app.stats().total, 0);
        let events: Vec<StatsEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.last(), Some(&StatsEvent::Reset { key: "pascal".to_string() }));
    }

    #[test]
    fn accuracy_trend_is_an_ema() {
        let entry = |correct| HistoryEntry {
            question: "x".to_string(),
            correct,
            topics: vec![],
        };
        let points = accuracy_trend(&[entry(true), entry(false), entry(false)]);
        assert_eq!(points[0], (0.0, 100.0));
        assert!((points[1].1 - 80.0).abs() < 1e-9);
        assert!((points[2].1 - 64.0).abs() < 1e-9);
    }
}
