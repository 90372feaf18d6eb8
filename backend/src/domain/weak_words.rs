//! Weak-word aggregation and review sampling.
//!
//! Every saved quiz result lists the items the learner missed. Folding those
//! lists per textbook yields, for each word number, how often it was missed
//! and when it was last missed. Review tests are sampled from that fold.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use super::results::QuizResult;
use super::textbook::review_textbook_key;

/// Misses at most this many whole days old count as recent.
pub const RECENT_WINDOW_DAYS: i64 = 30;
/// Miss count at which a word is frequent.
pub const FREQUENT_THRESHOLD: u32 = 2;
/// Words per review test when the caller does not ask for a count.
pub const DEFAULT_REVIEW_COUNT: usize = 10;

/// Review bucket for a weak word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeakWordCategory {
    /// Missed once, within the recent window.
    Recent,
    /// Missed at least twice.
    Frequent,
    /// Missed once, long ago.
    Single,
}

impl WeakWordCategory {
    /// Classify a word. Frequency wins over recency.
    ///
    /// Age is counted in whole elapsed days, so a miss 30 days and some
    /// hours ago is still recent.
    pub fn classify(wrong_count: u32, last_wrong_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if wrong_count >= FREQUENT_THRESHOLD {
            Self::Frequent
        } else if now.signed_duration_since(last_wrong_at).num_days() <= RECENT_WINDOW_DAYS {
            Self::Recent
        } else {
            Self::Single
        }
    }
}

/// A word the learner has missed at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakWord {
    pub word_number: i32,
    pub word: String,
    pub meaning: String,
    pub textbook: String,
    pub wrong_count: u32,
    pub last_wrong_at: DateTime<Utc>,
    pub category: WeakWordCategory,
}

/// Weak words for one textbook with per-category counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextbookWeakWords {
    pub textbook: String,
    pub words: Vec<WeakWord>,
    pub recent_count: usize,
    pub frequent_count: usize,
    pub single_count: usize,
}

struct Tally {
    word: String,
    meaning: String,
    wrong_count: u32,
    last_wrong_at: DateTime<Utc>,
}

/// Fold quiz results into weak words grouped by textbook.
///
/// Textbooks are ordered by name and words by word number.
pub fn aggregate_weak_words(results: &[QuizResult], now: DateTime<Utc>) -> Vec<TextbookWeakWords> {
    let mut tallies: BTreeMap<String, BTreeMap<i32, Tally>> = BTreeMap::new();

    for result in results {
        if result.incorrect_words.is_empty() || result.selected_text.trim().is_empty() {
            continue;
        }
        let textbook = review_textbook_key(&result.selected_text);
        let words = tallies.entry(textbook).or_default();
        for entry in &result.incorrect_words {
            words
                .entry(entry.word_number)
                .and_modify(|tally| {
                    tally.wrong_count += 1;
                    tally.last_wrong_at = tally.last_wrong_at.max(result.created_at);
                })
                .or_insert_with(|| Tally {
                    word: entry.word.clone(),
                    meaning: entry.meaning.clone(),
                    wrong_count: 1,
                    last_wrong_at: result.created_at,
                });
        }
    }

    tallies
        .into_iter()
        .filter(|(_, words)| !words.is_empty())
        .map(|(textbook, words)| {
            let words: Vec<WeakWord> = words
                .into_iter()
                .map(|(word_number, tally)| WeakWord {
                    word_number,
                    category: WeakWordCategory::classify(
                        tally.wrong_count,
                        tally.last_wrong_at,
                        now,
                    ),
                    word: tally.word,
                    meaning: tally.meaning,
                    textbook: textbook.clone(),
                    wrong_count: tally.wrong_count,
                    last_wrong_at: tally.last_wrong_at,
                })
                .collect();
            let count_of =
                |category| words.iter().filter(|word| word.category == category).count();
            TextbookWeakWords {
                recent_count: count_of(WeakWordCategory::Recent),
                frequent_count: count_of(WeakWordCategory::Frequent),
                single_count: count_of(WeakWordCategory::Single),
                textbook,
                words,
            }
        })
        .collect()
}

/// Filters applied before sampling a review test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewFilter {
    pub include_recent: bool,
    pub include_frequent: bool,
    pub include_single: bool,
    /// Inclusive word-number range.
    pub range: Option<(i32, i32)>,
    pub count: usize,
}

impl Default for ReviewFilter {
    fn default() -> Self {
        Self {
            include_recent: true,
            include_frequent: true,
            include_single: false,
            range: None,
            count: DEFAULT_REVIEW_COUNT,
        }
    }
}

impl ReviewFilter {
    fn admits(&self, word: &WeakWord) -> bool {
        let category_ok = match word.category {
            WeakWordCategory::Recent => self.include_recent,
            WeakWordCategory::Frequent => self.include_frequent,
            WeakWordCategory::Single => self.include_single,
        };
        let range_ok = self
            .range
            .is_none_or(|(start, end)| (start..=end).contains(&word.word_number));
        category_ok && range_ok
    }
}

/// Uniformly sample `min(count, available)` words that pass the filter.
pub fn select_review_words<R: Rng + ?Sized>(
    words: &[WeakWord],
    filter: &ReviewFilter,
    rng: &mut R,
) -> Vec<WeakWord> {
    let mut candidates: Vec<WeakWord> = words
        .iter()
        .filter(|word| filter.admits(word))
        .cloned()
        .collect();
    let take = filter.count.min(candidates.len());
    let (picked, _) = candidates.partial_shuffle(rng, take);
    picked.to_vec()
}
