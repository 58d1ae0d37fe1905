//! Pure view model handed to the presentation layer.

use crate::corpus::Difficulty;
use crate::scorer::{CharFeedback, LiveStats};
use crate::session::{Clock, Session, SessionState, TestResult};
use chrono::Local;

pub const EMPTY_HISTORY: &str = "No past tests yet.";

#[derive(Debug, Clone, PartialEq)]
pub struct RenderModel {
    pub state: SessionState,
    pub difficulty: Difficulty,
    pub feedback: Vec<CharFeedback>,
    /// Characters typed past the end of the target.
    pub overflow: String,
    pub time_left: String,
    pub stats: LiveStats,
    pub summary: Option<String>,
}

impl RenderModel {
    pub fn from_session<C: Clock>(session: &Session<C>, result: Option<&TestResult>) -> Self {
        let target_len = session.target().chars().count();
        Self {
            state: session.state(),
            difficulty: session.difficulty(),
            feedback: session.feedback(),
            overflow: session.typed().chars().skip(target_len).collect(),
            time_left: format!("{:.2}", session.time_left()),
            stats: session.live_stats(),
            summary: result.map(summary),
        }
    }
}

pub fn summary(result: &TestResult) -> String {
    format!(
        "Test ended - WPM: {}, Accuracy: {}%, Time used: {:.2}s, Difficulty: {}",
        result.wpm, result.accuracy, result.time_used, result.difficulty
    )
}

pub fn history_line(result: &TestResult) -> String {
    format!(
        "{} WPM - {}% - {}  ({} • {:.2}s)",
        result.wpm,
        result.accuracy,
        result.difficulty,
        result.timestamp.with_timezone(&Local).format("%c"),
        result.time_used
    )
}

/// One line per stored result, or a single placeholder line.
pub fn history_lines(results: &[TestResult]) -> Vec<String> {
    if results.is_empty() {
        return vec![EMPTY_HISTORY.to_string()];
    }
    results.iter().map(history_line).collect()
}
