use serde::{Deserialize, Serialize};

/// Whether a survey was submitted by a person or rolled up for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyType {
    Individual,
    Calculated,
}

impl SurveyType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Calculated => "calculated",
        }
    }

    pub fn parse(s: &str) -> Option<SurveyType> {
        match s {
            "individual" => Some(Self::Individual),
            "calculated" => Some(Self::Calculated),
            _ => None,
        }
    }
}

/// Keys of the application settings table. The table rejects any other key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKey {
    /// The organization's target statement shown alongside survey results.
    Target,
}

impl SettingKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Target => "target",
        }
    }

    pub fn parse(s: &str) -> Option<SettingKey> {
        match s {
            "target" => Some(Self::Target),
            _ => None,
        }
    }
}

/// The only question-set files the server will ever read.
pub const QUESTION_SETS: [&str; 3] = [
    "questions_standard.json",
    "questions_short.json",
    "questions_extended.json",
];

#[must_use]
pub fn default_question_set() -> &'static str {
    QUESTION_SETS[0]
}

#[must_use]
pub fn is_allowed_question_set(name: &str) -> bool {
    QUESTION_SETS.contains(&name)
}
