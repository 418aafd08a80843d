//! Adaptive question selection.
//!
//! Every candidate gets a weight from three factors: how weak the learner is
//! on the question's topics, how hard the question is, and how slow the
//! learner is on those topics compared to their overall pace. The next
//! question is drawn from the normalized weights.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::grading::question_topics;
use crate::types::{Question, UserStats};

/// Topic weight for questions without topic tags.
pub const UNTAGGED_TOPIC_WEIGHT: f64 = 0.85;

/// Upper bound of the time factor.
pub const MAX_TIME_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightComponents {
    pub topic: f64,
    pub difficulty: f64,
    pub time_factor: f64,
}

impl WeightComponents {
    /// Product of the components, floored at zero.
    pub fn weight(&self) -> f64 {
        let weight = self.topic * self.difficulty * self.time_factor;
        if weight.is_finite() && weight > 0.0 {
            weight
        } else {
            0.0
        }
    }
}

/// `ln((100 - pc) / 2) + 1`, strictly increasing as `pc` falls on `[0, 100)`.
/// Questions everyone gets right (`pc >= 100`) carry no difficulty weight.
pub fn difficulty_weight(percentage_correct: f64) -> f64 {
    if !percentage_correct.is_finite() || percentage_correct >= 100.0 {
        return 0.0;
    }
    let pc = percentage_correct.max(0.0);
    ((100.0 - pc) / 2.0).ln() + 1.0
}

fn overall_avg_time(stats: &UserStats) -> Option<f64> {
    if stats.total == 0 {
        return None;
    }
    let avg = stats.time / stats.total as f64;
    (avg.is_finite() && avg > 0.0).then_some(avg)
}

pub fn weight_components(question: &Question, stats: &UserStats) -> WeightComponents {
    let difficulty = difficulty_weight(question.percentage_correct);
    let topics = question_topics(question.topics.as_ref());

    if topics.is_empty() {
        return WeightComponents {
            topic: UNTAGGED_TOPIC_WEIGHT,
            difficulty,
            time_factor: 1.0,
        };
    }

    // Topics never answered count as zero accuracy and zero time.
    let (accuracy_sum, time_sum) = topics
        .iter()
        .filter_map(|topic| stats.topic_stats.get(topic))
        .fold((0.0, 0.0), |(acc, time), topic| {
            (acc + topic.success_rate(), time + topic.avg_time())
        });
    let count = topics.len() as f64;
    let avg_accuracy = accuracy_sum / count;
    let avg_topic_time = time_sum / count;

    let time_factor = match overall_avg_time(stats) {
        Some(overall) => (avg_topic_time / overall).min(MAX_TIME_FACTOR),
        None => 1.0,
    };

    WeightComponents {
        topic: 1.0 - avg_accuracy,
        difficulty,
        time_factor,
    }
}

pub fn question_weight(question: &Question, stats: &UserStats) -> f64 {
    weight_components(question, stats).weight()
}

/// Selection probabilities for `pool`, in pool order. Uniform when every
/// weight is zero.
pub fn distribution(pool: &[Question], stats: &UserStats) -> Vec<f64> {
    let candidates: Vec<&Question> = pool.iter().collect();
    candidate_distribution(&candidates, stats)
}

fn candidate_distribution(candidates: &[&Question], stats: &UserStats) -> Vec<f64> {
    let weights: Vec<f64> = candidates
        .iter()
        .map(|question| {
            let components = weight_components(question, stats);
            let weight = components.weight();
            debug!(
                question = %question.id(),
                topic = components.topic,
                difficulty = components.difficulty,
                time_factor = components.time_factor,
                weight = weight,
                "Weight calculation details"
            );
            weight
        })
        .collect();

    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        weights.iter().map(|w| w / total).collect()
    } else {
        debug!(candidates = candidates.len(), "All weights zero, falling back to uniform");
        vec![1.0 / candidates.len() as f64; candidates.len()]
    }
}

/// First index with non-zero probability whose cumulative probability
/// reaches `r`. When rounding leaves the running sum short of `r`, the last
/// index with non-zero probability.
pub fn sample_index(probabilities: &[f64], r: f64) -> Option<usize> {
    let mut cumulative = 0.0;
    let mut last = None;
    for (index, p) in probabilities.iter().enumerate() {
        if *p <= 0.0 {
            continue;
        }
        cumulative += p;
        last = Some(index);
        if cumulative >= r {
            return last;
        }
    }
    last.or_else(|| probabilities.len().checked_sub(1))
}

fn weighted_pick<'a, R: Rng + ?Sized>(
    candidates: &[&'a Question],
    stats: &UserStats,
    rng: &mut R,
) -> Option<&'a Question> {
    if candidates.is_empty() {
        return None;
    }
    let probabilities = candidate_distribution(candidates, stats);
    let r: f64 = rng.gen();
    let index = sample_index(&probabilities, r)?;
    debug!(
        index = index,
        r = r,
        probability = probabilities[index],
        "Selected question"
    );
    candidates.get(index).copied()
}

/// Picks the next question, biased towards weak and slow topics and hard
/// questions. Returns `None` only when `pool` is empty.
pub fn select_next<'a, R: Rng + ?Sized>(
    pool: &'a [Question],
    stats: &UserStats,
    rng: &mut R,
) -> Option<&'a Question> {
    let candidates: Vec<&Question> = pool.iter().collect();
    weighted_pick(&candidates, stats, rng)
}

/// Serves a question for a topic filter. Topic `0` means no preference and
/// picks uniformly without weighting. Otherwise only questions tagged with
/// the topic are candidates; if none are, the whole pool is weighted.
pub fn next_question<'a, R: Rng + ?Sized>(
    pool: &'a [Question],
    topic: u32,
    stats: &UserStats,
    rng: &mut R,
) -> Option<&'a Question> {
    if topic == 0 {
        return pool.choose(rng);
    }

    let tagged: Vec<&Question> = pool
        .iter()
        .filter(|q| question_topics(q.topics.as_ref()).contains(&topic))
        .collect();

    if tagged.is_empty() {
        debug!(topic = topic, "No questions tagged with topic, weighting whole pool");
        return select_next(pool, stats, rng);
    }
    weighted_pick(&tagged, stats, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Solutions, Source, TopicStats, Topics};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn question(number: u32, topics: Option<Vec<u32>>, percentage_correct: f64) -> Question {
        Question {
            question: format!("q{}", number),
            answers: vec![],
            solutions: Solutions {
                solution: String::new(),
                ans: "1".to_string(),
            },
            topics: topics.map(|primary| Topics {
                primary_topics: primary,
                secondary_topics: vec![],
            }),
            source: Source { year: 2020, number },
            percentage_correct,
        }
    }

    fn topic(total: u32, correct: u32, time: f64) -> TopicStats {
        TopicStats {
            total,
            correct,
            incorrect: total - correct,
            time,
        }
    }

    fn stats(total: u32, time: f64, topics: Vec<(u32, TopicStats)>) -> UserStats {
        UserStats {
            total,
            time,
            topic_stats: topics.into_iter().collect::<HashMap<_, _>>(),
            ..UserStats::default()
        }
    }

    fn scenario() -> (Vec<Question>, UserStats) {
        let pool = vec![
            question(1, Some(vec![1]), 50.0),
            question(2, Some(vec![2]), 90.0),
        ];
        let stats = stats(
            10,
            100.0,
            vec![(1, topic(10, 2, 50.0)), (2, topic(10, 9, 50.0))],
        );
        (pool, stats)
    }

    #[test]
    fn weaker_and_harder_question_is_preferred() {
        let (pool, stats) = scenario();
        let w1 = question_weight(&pool[0], &stats);
        let w2 = question_weight(&pool[1], &stats);
        assert!(w1 > w2, "w1 = {}, w2 = {}", w1, w2);

        let probabilities = distribution(&pool, &stats);
        assert!(probabilities[0] > 0.5);

        let mut rng = StdRng::seed_from_u64(42);
        let trials = 4000;
        let first = (0..trials)
            .filter(|_| select_next(&pool, &stats, &mut rng).unwrap().source.number == 1)
            .count();
        assert!(first as f64 / trials as f64 > 0.5);
    }

    #[test]
    fn scenario_components_match_formula() {
        let (pool, stats) = scenario();
        let c = weight_components(&pool[0], &stats);
        assert!((c.topic - 0.8).abs() < 1e-12);
        assert!((c.difficulty - (25.0f64.ln() + 1.0)).abs() < 1e-12);
        assert!((c.time_factor - 0.5).abs() < 1e-12);
    }

    #[test]
    fn always_returns_a_pool_member() {
        let pool = vec![
            question(1, Some(vec![1, 2]), 10.0),
            question(2, None, 99.5),
            question(3, Some(vec![3]), 100.0),
        ];
        let stats = stats(5, 20.0, vec![(1, topic(5, 5, 20.0))]);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let picked = select_next(&pool, &stats, &mut rng).unwrap();
            assert!(pool.contains(picked));
        }
        assert!(select_next(&[], &stats, &mut rng).is_none());
    }

    #[test]
    fn identical_questions_are_drawn_uniformly() {
        let pool: Vec<Question> = (1..=3).map(|n| question(n, Some(vec![n]), 40.0)).collect();
        let stats = stats(
            30,
            300.0,
            (1..=3).map(|n| (n, topic(10, 6, 100.0))).collect(),
        );
        let mut rng = StdRng::seed_from_u64(11);
        let mut counts = [0usize; 3];
        let trials = 6000;
        for _ in 0..trials {
            let picked = select_next(&pool, &stats, &mut rng).unwrap();
            counts[(picked.source.number - 1) as usize] += 1;
        }
        for count in counts {
            let share = count as f64 / trials as f64;
            assert!((share - 1.0 / 3.0).abs() < 0.04, "share = {}", share);
        }
    }

    #[test]
    fn lower_accuracy_raises_weight() {
        let q = question(1, Some(vec![1]), 50.0);
        let strong = stats(10, 100.0, vec![(1, topic(10, 8, 100.0))]);
        let weak = stats(10, 100.0, vec![(1, topic(10, 3, 100.0))]);
        assert!(question_weight(&q, &weak) > question_weight(&q, &strong));

        let other = question(2, Some(vec![2]), 50.0);
        let pool = vec![q, other];
        let with = |correct: u32| {
            stats(
                20,
                200.0,
                vec![(1, topic(10, correct, 100.0)), (2, topic(10, 5, 100.0))],
            )
        };
        assert!(distribution(&pool, &with(2))[0] > distribution(&pool, &with(7))[0]);
    }

    #[test]
    fn harder_questions_weigh_more() {
        let mut previous = difficulty_weight(99.9);
        for pc in [99.0, 90.0, 75.5, 50.0, 10.0, 0.0] {
            let current = difficulty_weight(pc);
            assert!(current > previous, "pc = {}", pc);
            previous = current;
        }
    }

    #[test]
    fn everyone_correct_does_not_panic_and_weighs_zero() {
        assert_eq!(difficulty_weight(100.0), 0.0);
        assert_eq!(difficulty_weight(120.0), 0.0);
        assert_eq!(difficulty_weight(f64::NAN), 0.0);
        assert_eq!(difficulty_weight(-5.0), difficulty_weight(0.0));

        let pool = vec![question(1, None, 100.0), question(2, None, 100.0)];
        let probabilities = distribution(&pool, &UserStats::default());
        assert_eq!(probabilities, vec![0.5, 0.5]);

        let mixed = vec![question(1, None, 100.0), question(2, None, 60.0)];
        let probabilities = distribution(&mixed, &UserStats::default());
        assert_eq!(probabilities[0], 0.0);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            assert_eq!(select_next(&mixed, &UserStats::default(), &mut rng).unwrap().source.number, 2);
        }
    }

    #[test]
    fn empty_history_uses_neutral_time_factor() {
        let q = question(1, Some(vec![4]), 50.0);
        let fresh = UserStats::default();
        let c = weight_components(&q, &fresh);
        assert_eq!(c.time_factor, 1.0);
        assert_eq!(c.topic, 1.0);

        let divergent = stats(0, 50.0, vec![(4, topic(3, 1, 30.0))]);
        assert_eq!(weight_components(&q, &divergent).time_factor, 1.0);
    }

    #[test]
    fn untagged_questions_use_constant_topic_weight() {
        let q = question(1, None, 50.0);
        let c = weight_components(&q, &stats(4, 40.0, vec![]));
        assert_eq!(c.topic, UNTAGGED_TOPIC_WEIGHT);
        assert_eq!(c.time_factor, 1.0);

        let empty_tags = question(2, Some(vec![]), 50.0);
        assert_eq!(weight_components(&empty_tags, &UserStats::default()).topic, UNTAGGED_TOPIC_WEIGHT);
    }

    #[test]
    fn unseen_topics_pull_accuracy_down_and_time_factor_is_capped() {
        let q = question(1, Some(vec![1, 2]), 50.0);
        let s = stats(2, 2.0, vec![(1, topic(1, 1, 100.0))]);
        let c = weight_components(&q, &s);
        assert!((c.topic - 0.5).abs() < 1e-12);
        assert_eq!(c.time_factor, MAX_TIME_FACTOR);
    }

    #[test]
    fn selection_does_not_mutate_inputs() {
        let (pool, stats) = scenario();
        let pool_before = pool.clone();
        let stats_before = stats.clone();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            select_next(&pool, &stats, &mut rng);
            next_question(&pool, 1, &stats, &mut rng);
        }
        assert_eq!(pool, pool_before);
        assert_eq!(stats, stats_before);
    }

    #[test]
    fn sampling_walks_cumulative_weights() {
        let probabilities = [0.2, 0.5, 0.3];
        assert_eq!(sample_index(&probabilities, 0.0), Some(0));
        assert_eq!(sample_index(&probabilities, 0.2), Some(0));
        assert_eq!(sample_index(&probabilities, 0.21), Some(1));
        assert_eq!(sample_index(&probabilities, 0.95), Some(2));
        // Drift: the sum falls short of r.
        assert_eq!(sample_index(&[0.3, 0.3, 0.3], 0.99), Some(2));
        assert_eq!(sample_index(&[], 0.5), None);
        // Zero-probability entries are never picked.
        assert_eq!(sample_index(&[0.0, 1.0], 0.0), Some(1));
        assert_eq!(sample_index(&[0.5, 0.0], 0.9), Some(0));
    }

    #[test]
    fn topic_filter_restricts_candidates() {
        let pool = vec![
            question(1, Some(vec![1]), 50.0),
            question(2, Some(vec![2]), 50.0),
            question(3, None, 50.0),
        ];
        let stats = UserStats::default();
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..200 {
            assert_eq!(next_question(&pool, 2, &stats, &mut rng).unwrap().source.number, 2);
        }

        // Secondary topics count too.
        let mut secondary = question(4, None, 50.0);
        secondary.topics = Some(Topics {
            primary_topics: vec![9],
            secondary_topics: vec![7],
        });
        let pool = vec![pool[0].clone(), secondary];
        assert_eq!(next_question(&pool, 7, &stats, &mut rng).unwrap().source.number, 4);
    }

    #[test]
    fn no_topic_preference_picks_from_whole_pool() {
        let pool: Vec<Question> = (1..=4).map(|n| question(n, None, 100.0)).collect();
        let mut rng = StdRng::seed_from_u64(2);
        let mut seen = [false; 4];
        for _ in 0..400 {
            let picked = next_question(&pool, 0, &UserStats::default(), &mut rng).unwrap();
            seen[(picked.source.number - 1) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert!(next_question(&[], 0, &UserStats::default(), &mut rng).is_none());
    }

    #[test]
    fn unknown_topic_falls_back_to_whole_pool() {
        let pool = vec![question(1, Some(vec![1]), 50.0)];
        let mut rng = StdRng::seed_from_u64(8);
        let picked = next_question(&pool, 42, &UserStats::default(), &mut rng).unwrap();
        assert_eq!(picked.source.number, 1);
    }
}
