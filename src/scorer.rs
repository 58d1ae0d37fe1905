//! Stateless scoring over `(target, typed, elapsed)`.
//!
//! Lengths and positions are counted in chars, never bytes, so paragraphs
//! with typographic punctuation score the same as plain ASCII ones.

/// Length of every test, in seconds.
pub const TIME_LIMIT_SECS: f64 = 60.0;

/// Smallest elapsed time used for WPM, keeps the division finite.
pub const MIN_ELAPSED_SECS: f64 = 0.0001;

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
    Untyped,
}

/// One slot of the feedback sequence, one per target character.
///
/// `shown` is what the presentation should draw: the typed character once the
/// slot has been typed over, the target character otherwise.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct CharFeedback {
    pub expected: char,
    pub shown: char,
    pub outcome: Outcome,
}

pub fn char_feedback(target: &str, typed: &str) -> Vec<CharFeedback> {
    let mut typed_chars = typed.chars();
    target
        .chars()
        .map(|expected| match typed_chars.next() {
            None => CharFeedback {
                expected,
                shown: expected,
                outcome: Outcome::Untyped,
            },
            Some(c) => CharFeedback {
                expected,
                shown: c,
                outcome: if c == expected {
                    Outcome::Correct
                } else {
                    Outcome::Incorrect
                },
            },
        })
        .collect()
}

fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Number of whitespace-delimited words; `""` has none.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Count typed words that differ from the target word at the same position.
/// Extra typed words count; target words not yet reached do not.
pub fn word_mistakes(target: &str, typed: &str) -> usize {
    let target_words = words(target);
    words(typed)
        .iter()
        .enumerate()
        .filter(|(i, word)| match target_words.get(*i) {
            Some(expected) => expected != *word,
            None => !word.is_empty(),
        })
        .count()
}

pub fn correct_chars(target: &str, typed: &str) -> usize {
    target
        .chars()
        .zip(typed.chars())
        .filter(|(expected, c)| expected == c)
        .count()
}

/// Rounded percentage of typed characters that match the target, 100 when
/// nothing has been typed. Overflow past the target only grows the
/// denominator.
pub fn accuracy(target: &str, typed: &str) -> u8 {
    let typed_len = typed.chars().count();
    if typed_len == 0 {
        return 100;
    }
    let pct = (correct_chars(target, typed) as f64 / typed_len as f64) * 100.0;
    pct.round().clamp(0.0, 100.0) as u8
}

/// Elapsed seconds clamped to `[MIN_ELAPSED_SECS, TIME_LIMIT_SECS]`.
pub fn time_used(elapsed_secs: Option<f64>) -> f64 {
    let secs = match elapsed_secs {
        Some(secs) if secs.is_finite() && secs > 0.0 => secs.min(TIME_LIMIT_SECS),
        _ => MIN_ELAPSED_SECS,
    };
    secs.max(MIN_ELAPSED_SECS)
}

pub fn wpm(typed: &str, elapsed_secs: Option<f64>) -> u32 {
    let minutes = time_used(elapsed_secs) / 60.0;
    (word_count(typed) as f64 / minutes).round() as u32
}

/// Counters shown while a test is in progress.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct LiveStats {
    pub mistakes: usize,
    pub words: usize,
    pub chars: usize,
    pub accuracy: u8,
}

impl LiveStats {
    pub fn compute(target: &str, typed: &str) -> Self {
        Self {
            mistakes: word_mistakes(target, typed),
            words: word_count(typed),
            chars: typed.trim().chars().count(),
            accuracy: accuracy(target, typed),
        }
    }
}
