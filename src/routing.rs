//! Intent classification for citizen requests
//!
//! Requests are routed by [`Intent`]. The [`KeywordClassifier`] is
//! deterministic and always available; the [`LlmClassifier`] consults the
//! model only for messages the keywords cannot place as an emergency.

use crate::error::{Result, SahayiError};
use crate::locator::ServiceKind;
use crate::prompts::CLASSIFIER_INSTRUCTION;
use crate::providers::{Message, Provider};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

const POLICE_KEYWORDS: &[&str] = &[
    "danger",
    "dangerous",
    "in danger",
    "unsafe",
    "not safe",
    "assault",
    "assaulted",
    "attack",
    "attacked",
    "attacking",
    "theft",
    "thief",
    "stolen",
    "stole",
    "steal",
    "stealing",
    "robbery",
    "robbed",
    "mugged",
    "burglar",
    "burglary",
    "break-in",
    "broke in",
    "breaking in",
    "suspicious",
    "threat",
    "threatened",
    "threatening",
    "intruder",
    "stranger at",
    "following me",
    "someone is following",
    "harassed",
    "harassing",
    "scam",
    "scammed",
    "police",
];

const MEDICAL_KEYWORDS: &[&str] = &[
    "ill",
    "illness",
    "sick",
    "injury",
    "injured",
    "hurt",
    "breathing",
    "can't breathe",
    "cannot breathe",
    "short of breath",
    "chest pain",
    "heart attack",
    "stroke",
    "fall",
    "fell",
    "fallen",
    "bleeding",
    "blood",
    "confusion",
    "confused",
    "dizzy",
    "dizziness",
    "faint",
    "fainted",
    "fainting",
    "weak",
    "weakness",
    "cannot move",
    "can't move",
    "unable to move",
    "unconscious",
    "seizure",
    "pain",
];

// Facility nouns only signal an emergency when no general request is present
const FACILITY_KEYWORDS: &[&str] = &[
    "ambulance",
    "hospital",
    "doctor",
    "clinic",
];

const GENERAL_KEYWORDS: &[&str] = &[
    "reminder",
    "remind",
    "bill",
    "bills",
    "medicine",
    "medicines",
    "medication",
    "message",
    "messages",
    "text my",
    "cab",
    "taxi",
    "ride",
    "appointment",
    "groceries",
];

/// What a citizen's message asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Danger, crime or a personal threat
    Police,
    /// Illness, injury or another health emergency
    Medical,
    /// A recognised request the helper does not support yet
    General,
    /// No request detected
    Unknown,
}

impl Intent {
    /// The emergency service this intent routes to, if any
    pub fn service(&self) -> Option<ServiceKind> {
        match self {
            Intent::Police => Some(ServiceKind::Police),
            Intent::Medical => Some(ServiceKind::Medical),
            Intent::General | Intent::Unknown => None,
        }
    }

    /// Parse a classifier label (`POLICE`, `MEDICAL`, `GENERAL`, `NONE`)
    ///
    /// Only the first word of `label` is considered.
    ///
    /// # Examples
    ///
    /// ```
    /// use sahayi::routing::Intent;
    ///
    /// assert_eq!(Intent::from_label("MEDICAL."), Some(Intent::Medical));
    /// assert_eq!(Intent::from_label(" none"), Some(Intent::Unknown));
    /// assert_eq!(Intent::from_label("maybe police"), None);
    /// ```
    pub fn from_label(label: &str) -> Option<Self> {
        let word = label
            .split_whitespace()
            .next()?
            .trim_matches(|c: char| !c.is_ascii_alphabetic())
            .to_ascii_uppercase();
        match word.as_str() {
            "POLICE" => Some(Intent::Police),
            "MEDICAL" => Some(Intent::Medical),
            "GENERAL" => Some(Intent::General),
            "NONE" | "UNKNOWN" => Some(Intent::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Intent::Police => "police",
            Intent::Medical => "medical",
            Intent::General => "general",
            Intent::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// Classifies a message into an [`Intent`]
///
/// Classification never fails; implementations fall back to
/// [`Intent::Unknown`] or a deterministic result instead.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify `message`
    async fn classify(&self, message: &str) -> Intent;
}

/// Word-boundary keyword classifier
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    police: Regex,
    medical: Regex,
    facility: Regex,
    general: Regex,
}

impl KeywordClassifier {
    /// Compile the keyword patterns
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Config` if a pattern fails to compile
    pub fn new() -> Result<Self> {
        Ok(Self {
            police: keyword_regex(POLICE_KEYWORDS)?,
            medical: keyword_regex(MEDICAL_KEYWORDS)?,
            facility: keyword_regex(FACILITY_KEYWORDS)?,
            general: keyword_regex(GENERAL_KEYWORDS)?,
        })
    }

    /// Classify without any model call
    ///
    /// Medical wins over police, and either emergency wins over a general
    /// request. A facility noun alone ("doctor", "hospital") is medical
    /// only when the message carries no general request, so "my hospital
    /// bill" stays general.
    pub fn classify_message(&self, message: &str) -> Intent {
        let text = normalize_quotes(message);
        let general = self.general.is_match(&text);
        if self.medical.is_match(&text) {
            Intent::Medical
        } else if self.police.is_match(&text) {
            Intent::Police
        } else if self.facility.is_match(&text) && !general {
            Intent::Medical
        } else if general {
            Intent::General
        } else {
            Intent::Unknown
        }
    }

    /// The emergency service `message` describes, if any
    pub fn detect_emergency(&self, message: &str) -> Option<ServiceKind> {
        self.classify_message(message).service()
    }

    /// Whether `message` contains any routing keyword
    pub fn has_keyword(&self, message: &str) -> bool {
        self.classify_message(message) != Intent::Unknown
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, message: &str) -> Intent {
        self.classify_message(message)
    }
}

/// Keyword classifier with a model fallback for non-emergencies
pub struct LlmClassifier {
    provider: Arc<dyn Provider>,
    keywords: KeywordClassifier,
}

impl LlmClassifier {
    /// Create a classifier that asks `provider` when keywords find no
    /// emergency
    pub fn new(provider: Arc<dyn Provider>, keywords: KeywordClassifier) -> Self {
        Self { provider, keywords }
    }

    async fn ask_model(&self, message: &str) -> Result<Intent> {
        let messages = vec![
            Message::system(CLASSIFIER_INSTRUCTION),
            Message::user(message),
        ];
        let response = self.provider.complete(&messages, &[]).await?;
        let answer = response.message.content.unwrap_or_default();
        Intent::from_label(&answer).ok_or_else(|| {
            SahayiError::Provider(format!("Unrecognised classifier answer: {:?}", answer)).into()
        })
    }
}

#[async_trait]
impl IntentClassifier for LlmClassifier {
    async fn classify(&self, message: &str) -> Intent {
        let keyword_intent = self.keywords.classify_message(message);
        if keyword_intent.service().is_some() {
            return keyword_intent;
        }

        match self.ask_model(message).await {
            Ok(intent) => {
                tracing::debug!(%keyword_intent, %intent, "Model classified message");
                intent
            }
            Err(e) => {
                tracing::warn!("Model classification failed, using keywords: {}", e);
                keyword_intent
            }
        }
    }
}

fn keyword_regex(keywords: &[&str]) -> Result<Regex> {
    let alternatives = keywords
        .iter()
        .map(|k| regex::escape(k).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives))
        .map_err(|e| SahayiError::Config(format!("Invalid keyword pattern: {}", e)).into())
}

fn normalize_quotes(text: &str) -> String {
    text.replace(['\u{2018}', '\u{2019}'], "'")
}
