//! Built-in question bank.
//!
//! One question per symptom category. Each option maps an answer label to a
//! canonical id and the confidence that label carries as evidence.

use crate::features::{Answer, AnswerChoice, AnswerTable, Answers, SymptomCategory, UNKNOWN_SENTINEL};

/// Label offered on every question for "I can't tell".
pub const NOT_SURE_LABEL: &str = "Not sure";

#[derive(Debug, Clone)]
pub struct Question {
    pub category: SymptomCategory,
    pub prompt: &'static str,
    /// (label, canonical id, confidence)
    pub options: &'static [(&'static str, &'static str, f64)],
}

impl Question {
    /// Answer table including the "Not sure" option.
    pub fn table(&self) -> AnswerTable {
        let mut table: AnswerTable = self
            .options
            .iter()
            .map(|(label, id, cf)| (label.to_string(), AnswerChoice::new(*id, *cf)))
            .collect();
        table.insert(
            NOT_SURE_LABEL.to_string(),
            AnswerChoice::new(UNKNOWN_SENTINEL, 0.0),
        );
        table
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.options
            .iter()
            .map(|(label, _, _)| *label)
            .chain(std::iter::once(NOT_SURE_LABEL))
            .collect()
    }

    /// Case-insensitive label lookup, returning the canonical spelling.
    pub fn resolve_label(&self, input: &str) -> Option<&'static str> {
        let wanted = input.trim().to_lowercase();
        self.labels()
            .into_iter()
            .find(|label| label.to_lowercase() == wanted)
    }
}

static QUESTIONS: &[Question] = &[
    Question {
        category: SymptomCategory::PowerState,
        prompt: "Does the PC power on?",
        options: &[
            ("Yes", "on", 1.0),
            ("No", "dead", 1.0),
            ("Fans spin, then stops", "cycling", 0.9),
        ],
    },
    Question {
        category: SymptomCategory::BeepCodes,
        prompt: "Are there diagnostic beeps?",
        options: &[
            ("No", "none", 0.8),
            ("One short beep", "single", 0.9),
            ("Repeating long beeps", "repeating-long", 1.0),
            ("Continuous beeping", "continuous", 1.0),
        ],
    },
    Question {
        category: SymptomCategory::ScreenVisuals,
        prompt: "Is the screen showing a display?",
        options: &[
            ("Visible", "normal", 0.9),
            ("Completely black screen", "black", 1.0),
            ("Artifacts or stripes", "artifacts", 1.0),
            ("Flickering", "flicker", 0.8),
        ],
    },
    Question {
        category: SymptomCategory::BootProgress,
        prompt: "How far does the machine get when booting?",
        options: &[
            ("Boots normally", "normal", 0.9),
            ("Stuck at logo", "stuck-logo", 1.0),
            ("No boot device found", "no-boot-device", 1.0),
            ("Restarts in a loop", "boot-loop", 1.0),
        ],
    },
    Question {
        category: SymptomCategory::CpuTemp,
        prompt: "What CPU temperature does the monitor report?",
        options: &[
            ("Below 60°C", "normal", 0.9),
            ("60-85°C", "warm", 0.7),
            ("Above 85°C", "above-85", 1.0),
        ],
    },
    Question {
        category: SymptomCategory::ShutdownPattern,
        prompt: "Does the PC shut down unexpectedly?",
        options: &[
            ("Never", "never", 0.8),
            ("Under heavy load", "under-load", 1.0),
            ("At random times", "random", 0.9),
        ],
    },
    Question {
        category: SymptomCategory::SoundOutput,
        prompt: "Is there sound output?",
        options: &[
            ("Normal", "normal", 0.9),
            ("No sound at all", "none", 1.0),
            ("Crackling or distorted", "distorted", 0.9),
        ],
    },
    Question {
        category: SymptomCategory::VolumeBar,
        prompt: "How does the volume bar behave?",
        options: &[
            ("Responds normally", "normal", 0.8),
            ("Bar is frozen/gray", "frozen", 1.0),
            ("Bar is missing", "missing", 0.9),
        ],
    },
    Question {
        category: SymptomCategory::FanNoise,
        prompt: "What do the fans sound like?",
        options: &[
            ("Quiet", "quiet", 0.7),
            ("Constantly loud", "loud", 0.9),
            ("Grinding or rattling", "grinding", 1.0),
            ("Silent, not spinning", "stopped", 1.0),
        ],
    },
    Question {
        category: SymptomCategory::StorageNoise,
        prompt: "Any unusual noise from the drive?",
        options: &[
            ("None", "none", 0.7),
            ("Clicking", "clicking", 1.0),
            ("Grinding", "grinding", 1.0),
        ],
    },
    Question {
        category: SymptomCategory::UsbDevices,
        prompt: "Are USB devices recognised?",
        options: &[
            ("Yes", "working", 0.8),
            ("Intermittently", "intermittent", 0.8),
            ("Not at all", "dead", 1.0),
        ],
    },
    Question {
        category: SymptomCategory::NetworkLink,
        prompt: "Is the network link up?",
        options: &[
            ("Connected", "up", 0.8),
            ("Drops frequently", "flapping", 0.9),
            ("No link light", "down", 1.0),
        ],
    },
];

/// All built-in questions, in wizard order.
pub fn questions() -> &'static [Question] {
    QUESTIONS
}

pub fn question(category: SymptomCategory) -> Option<&'static Question> {
    QUESTIONS.iter().find(|q| q.category == category)
}

/// Build an [`Answer`] for `category` from a selection label.
///
/// Returns `None` for unknown categories or labels.
pub fn answer(category: &str, selection: &str) -> Option<Answer> {
    let q = question(SymptomCategory::parse(category)?)?;
    let label = q.resolve_label(selection)?;
    Some(Answer::new(label, q.table()))
}

/// Questions not yet answered, in wizard order.
pub fn unanswered(answers: &Answers) -> Vec<&'static Question> {
    QUESTIONS
        .iter()
        .filter(|q| !answers.contains_key(q.category.as_str()))
        .collect()
}
