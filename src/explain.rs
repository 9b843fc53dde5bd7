//! Rule-based commentary on a student's grades and habits.
//!
//! Every rule is an independent threshold check evaluated in a fixed order,
//! so the same metrics always produce the same lists.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metrics::StudentMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Improved,
    Declined,
    NoChange,
}

impl Trend {
    pub fn between(from: f64, to: f64) -> Trend {
        if to > from {
            Trend::Improved
        } else if to < from {
            Trend::Declined
        } else {
            Trend::NoChange
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Trend::Improved => "Improved",
            Trend::Declined => "Declined",
            Trend::NoChange => "No change",
        }
    }
}

/// The grade checkpoints a trend is measured across.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    InitialToMidterm,
    MidtermToFinal,
    InitialToFinal,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::InitialToMidterm => "Initial → Midterm",
            Stage::MidtermToFinal => "Midterm → Final",
            Stage::InitialToFinal => "Initial → Final",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendEntry {
    pub stage: Stage,
    pub direction: Trend,
}

impl fmt::Display for TrendEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.direction.label(), self.stage.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weakness {
    LowStudytime,
    HighAbsences,
    PreviousFailures,
    DroppedPerformance,
    TooMuchFreetime,
    LongTravelTime,
    WeakInitialPerformance,
}

impl Weakness {
    pub fn text(self) -> &'static str {
        match self {
            Weakness::LowStudytime => "Low studytime",
            Weakness::HighAbsences => "High absences",
            Weakness::PreviousFailures => "Has previous failures",
            Weakness::DroppedPerformance => "Dropped performance from Midterm → Final",
            Weakness::TooMuchFreetime => "Too much freetime",
            Weakness::LongTravelTime => "Long travel time",
            Weakness::WeakInitialPerformance => "Weak initial performance",
        }
    }
}

pub const NO_WEAKNESSES: &str = "No major weaknesses identified";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suggestion {
    StudyMore,
    ImproveAttendance,
    ReviseWeakTopics,
    ReduceFreetime,
    UseCommute,
    PracticeTests,
    KeepGoing,
}

impl Suggestion {
    pub fn text(self) -> &'static str {
        match self {
            Suggestion::StudyMore => "Increase daily study to 2–3 hrs.",
            Suggestion::ImproveAttendance => "Improve attendance.",
            Suggestion::ReviseWeakTopics => "Revise weak topics weekly.",
            Suggestion::ReduceFreetime => "Reduce unproductive time.",
            Suggestion::UseCommute => "Use commute time for microlearning.",
            Suggestion::PracticeTests => "Practice chapter tests regularly.",
            Suggestion::KeepGoing => "Great improvement — keep going!",
        }
    }
}

pub const NO_SUGGESTIONS: &str = "Excellent — continue same habits.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub trend: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
}

pub fn trends(m: &StudentMetrics) -> [TrendEntry; 3] {
    [
        TrendEntry { stage: Stage::InitialToMidterm, direction: Trend::between(m.g1, m.g2) },
        TrendEntry { stage: Stage::MidtermToFinal, direction: Trend::between(m.g2, m.g3) },
        // A higher final grade than the initial one counts as improvement.
        TrendEntry { stage: Stage::InitialToFinal, direction: Trend::between(m.g1, m.g3) },
    ]
}

pub fn weaknesses(m: &StudentMetrics) -> Vec<Weakness> {
    let rules = [
        (m.studytime < 2.0, Weakness::LowStudytime),
        (m.absences > 5.0, Weakness::HighAbsences),
        (m.failures > 0.0, Weakness::PreviousFailures),
        (m.g3 < m.g2, Weakness::DroppedPerformance),
        (m.freetime > 3.0, Weakness::TooMuchFreetime),
        (m.traveltime > 2.0, Weakness::LongTravelTime),
        (m.g1 <= 5.0, Weakness::WeakInitialPerformance),
    ];
    rules.into_iter().filter(|(fired, _)| *fired).map(|(_, w)| w).collect()
}

pub fn suggestions(m: &StudentMetrics) -> Vec<Suggestion> {
    let rules = [
        (m.studytime < 2.0, Suggestion::StudyMore),
        (m.absences > 5.0, Suggestion::ImproveAttendance),
        (m.failures > 0.0, Suggestion::ReviseWeakTopics),
        (m.freetime > 3.0, Suggestion::ReduceFreetime),
        (m.traveltime > 2.0, Suggestion::UseCommute),
        (m.g3 < 10.0, Suggestion::PracticeTests),
        (m.g2 > m.g1 && m.g3 >= m.g2, Suggestion::KeepGoing),
    ];
    rules.into_iter().filter(|(fired, _)| *fired).map(|(_, s)| s).collect()
}

/// Runs all three rule sets. Never fails and never returns an empty
/// weakness or suggestion list.
pub fn explain(metrics: &StudentMetrics) -> ExplanationResult {
    let trend = trends(metrics).iter().map(ToString::to_string).collect();

    let mut weaknesses: Vec<String> =
        weaknesses(metrics).into_iter().map(|w| w.text().to_string()).collect();
    if weaknesses.is_empty() {
        weaknesses.push(NO_WEAKNESSES.to_string());
    }

    let mut suggestions: Vec<String> =
        suggestions(metrics).into_iter().map(|s| s.text().to_string()).collect();
    if suggestions.is_empty() {
        suggestions.push(NO_SUGGESTIONS.to_string());
    }

    ExplanationResult { trend, weaknesses, suggestions }
}
