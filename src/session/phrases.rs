//! Scripted lines and utterance parsing for the guided session

use crate::locator::ServiceKind;

/// First prompt for the citizen's name
pub const GREETING: &str =
    "Hello! I'm here to help you. May I know your name so I can assist you better?";

/// Repeated prompt for the name when the citizen seems hesitant
pub const HESITATION: &str =
    "Don't worry, I'm here to help. What would you like me to call you?";

/// Prompt for the name when an emergency was mentioned first
pub const ASK_NAME_URGENT: &str = "May I know your name so I can get you help quickly?";

/// Prompt for the current location
pub const ASK_LOCATION: &str =
    "Could you tell me your current address or location? This will help me assist you better.";

/// Notice when the citizen is not in the contact records
pub const NOT_FOUND_NOTICE: &str =
    "I couldn't find your details in our records, but I can still help you.";

/// Notice when the contact records could not be reached
pub const LOOKUP_UNAVAILABLE: &str =
    "I'm having trouble reaching our records right now, but I can still help you.";

/// Promise made only when a profile with emergency contacts is on file
pub const CONTACTS_NOTICE: &str =
    "We'll also be reaching out to your emergency contacts to let them know you need help.";

const GREETING_WORDS: &[&str] = &[
    "hi", "hello", "hey", "hii", "namaste", "good", "morning", "afternoon", "evening", "greetings",
];

const COMMON_WORDS: &[&str] = &[
    "a", "about", "afraid", "alone", "am", "an", "and", "are", "at", "away", "back", "bad",
    "been", "but", "can", "cannot", "could", "did", "do", "don't", "doing", "feeling", "fine",
    "for", "from", "going", "great", "having", "help", "here", "home", "how", "i", "i'm", "in",
    "is", "it", "just", "lost", "me", "my", "need", "nearby", "no", "nope", "not", "now", "ok",
    "okay", "on", "outside", "please", "really", "right", "scared", "so", "sorry", "sure",
    "thank", "thanks", "that", "the", "there", "this", "tired", "to", "trying", "unwell",
    "very", "want", "well", "what", "where", "who", "why", "with", "worried", "yeah", "yes",
    "you",
];

// How someone feels, never who they are ("I'm hungry")
const STATE_WORDS: &[&str] = &[
    "alright", "anxious", "better", "bored", "busy", "cold", "confused", "dizzy", "good",
    "happy", "hot", "hungry", "ill", "lonely", "nervous", "old", "sad", "sick", "sleepy",
    "stuck", "thirsty", "upset", "weak",
];

// Opening words of a clause that talks about the citizen, not a place
const SUBJECT_WORDS: &[&str] = &[
    "can", "could", "he", "help", "i", "i'm", "it", "it's", "me", "my", "please", "she",
    "someone", "somebody", "there", "they", "this", "we", "you",
];

const NAME_STOP_WORDS: &[&str] = &[
    "and", "but", "from", "here", "i", "i'm", "please", "so", "at", "in", "calling",
];

const AFFIRMATIVE_WORDS: &[&str] = &[
    "yes", "yeah", "yep", "yup", "correct", "right", "sure", "ok", "okay", "indeed",
    "absolutely", "y", "true",
];

const NEGATIVE_WORDS: &[&str] = &["no", "nope", "nah", "n", "not"];

const NEGATIVE_PHRASES: &[&str] = &[
    "not at home",
    "not home",
    "i'm not",
    "i am not",
    "somewhere else",
    "elsewhere",
    "away from home",
];

const AT_HOME_PHRASES: &[&str] = &["i'm at home", "i am at home", "i'm home", "i am home", "at home"];

const NAME_PHRASES: &[&str] = &["my name is", "call me", "this is", "name's"];

const SELF_PHRASES: &[&str] = &["i am", "i'm"];

const PLACE_PHRASES: &[&str] = &[
    "i'm currently at",
    "i am currently at",
    "i'm now at",
    "i am now at",
    "i'm at",
    "i am at",
    "i'm near",
    "i am near",
    "i'm in",
    "i am in",
    "i'm outside",
    "i am outside",
    "currently at",
];

const PLACE_TRAILERS: &[&str] = &[" right now", " now", " currently", " at the moment"];

const NOT_PLACES: &[&str] = &["home", "trouble", "a hurry", "danger", "pain", "a lot of pain"];

/// Warm acknowledgement once the name is known
pub fn acknowledge(name: &str) -> String {
    format!(
        "Thank you, {}. It's wonderful to talk with you. I'm here to help you with anything you need.",
        name
    )
}

/// Ask whether the citizen is at their home address
pub fn confirm_home(address: &str) -> String {
    format!(
        "Just to make sure I can help you properly, are you currently at {}? Or are you somewhere else right now?",
        address
    )
}

/// Confirmation once a location is established
pub fn location_noted(location: &str) -> String {
    format!(
        "Thank you. I have your location as {}. How can I help you today?",
        location
    )
}

/// Confirmation when the citizen moves
pub fn location_updated(location: &str) -> String {
    format!("Thank you, I've updated your location to {}.", location)
}

/// Immediate reassurance on an emergency
pub fn emergency_reassurance(name: Option<&str>) -> String {
    match name {
        Some(name) => format!(
            "I understand, {}. Let me help you right away. Please don't worry, I'm here for you.",
            name
        ),
        None => "I understand. Let me help you right away. Please don't worry, I'm here for you."
            .to_string(),
    }
}

/// Announce the search for a service
pub fn finding(kind: ServiceKind) -> String {
    format!(
        "I'm finding the nearest {} for you right now.",
        kind.facility()
    )
}

/// Acknowledge a request the helper cannot handle yet
pub fn general_ack(name: &str) -> String {
    format!(
        "Thank you for telling me, {}. I'm working on adding support for that, and I'll be able to help you with it soon.",
        name
    )
}

/// Ask what the citizen needs
pub fn ask_how_to_help(name: &str) -> String {
    format!("How can I help you today, {}?", name)
}

/// Fallback when the locator could not produce details
pub fn locator_fallback(kind: ServiceKind, emergency_number: &str) -> String {
    format!(
        "I'm sorry, I couldn't find the nearest {} right now. If this is an emergency, please call {} immediately. You can tell me again and I will keep trying.",
        kind.facility(),
        emergency_number
    )
}

/// Trim and normalise curly apostrophes
pub fn normalize(utterance: &str) -> String {
    utterance
        .trim()
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// Title-case every word of a name
///
/// # Examples
///
/// ```
/// use sahayi::session::phrases::title_case;
///
/// assert_eq!(title_case("john SMITH"), "John Smith");
/// assert_eq!(title_case("mary-jane"), "Mary-Jane");
/// ```
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            word.split('-')
                .map(capitalize)
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Extract a name from `utterance`
///
/// Explicit phrases ("my name is", "call me", "this is", "name's") are
/// always honoured. "I am" / "I'm" only count when `has_intent_keyword` is
/// false and the candidate is capitalised and is neither a common word nor
/// a feeling ("I'm hungry"). Otherwise a bare reply of
/// one to four alphabetic words that are not greetings or common words is
/// taken as the name.
pub fn extract_name(utterance: &str, has_intent_keyword: bool) -> Option<String> {
    let text = normalize(utterance);

    for phrase in NAME_PHRASES {
        if let Some(rest) = after_phrase(&text, phrase) {
            if let Some(name) = name_words(rest) {
                return Some(name);
            }
        }
    }

    if !has_intent_keyword {
        for phrase in SELF_PHRASES {
            if let Some(rest) = after_phrase(&text, phrase) {
                let capitalised = rest.chars().next().map_or(false, char::is_uppercase);
                if let Some(name) = name_words(rest).filter(|_| capitalised) {
                    let first = name.split_whitespace().next().unwrap_or_default();
                    if !is_common(first) {
                        return Some(name);
                    }
                }
            }
        }
    }

    if has_intent_keyword {
        return None;
    }

    let bare = text.trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ','));
    let words: Vec<&str> = bare.split_whitespace().collect();
    if words.is_empty() || words.len() > 4 {
        return None;
    }
    let alphabetic = words
        .iter()
        .all(|w| w.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-'));
    let ordinary = words.iter().any(|w| is_common(w) || is_greeting(w));
    if alphabetic && !ordinary {
        Some(title_case(bare))
    } else {
        None
    }
}

/// Extract an explicitly stated place ("I'm at the market")
///
/// The place ends at the first clause break and drops trailing time words.
/// Phrases such as "I'm in pain" or "I'm at home" yield nothing.
pub fn extract_place(utterance: &str) -> Option<String> {
    let text = normalize(utterance);
    for phrase in PLACE_PHRASES {
        let Some(rest) = after_phrase(&text, phrase) else {
            continue;
        };
        let mut place = clause(rest).to_string();
        for trailer in PLACE_TRAILERS {
            if place.to_ascii_lowercase().ends_with(trailer) {
                place.truncate(place.len() - trailer.len());
            }
        }
        let place = place.trim().to_string();
        if place.is_empty() || NOT_PLACES.contains(&place.to_ascii_lowercase().as_str()) {
            return None;
        }
        return Some(place);
    }
    None
}

/// Take an utterance given in answer to "where are you" as the location
pub fn as_location(utterance: &str) -> Option<String> {
    if let Some(place) = extract_place(utterance) {
        return Some(place);
    }
    let text = normalize(utterance);
    let text = text.trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ','));
    if text.is_empty() || !text.chars().any(char::is_alphanumeric) {
        return None;
    }
    let words: Vec<String> = words_lower(text);
    if words.len() <= 2 && words.iter().all(|w| is_common(w) || is_greeting(w)) {
        return None;
    }
    Some(text.to_string())
}

/// Split an utterance into its clauses at commas, semicolons and sentence
/// ends
pub fn clauses(utterance: &str) -> Vec<String> {
    normalize(utterance)
        .replace(". ", ";")
        .split([',', ';', '!', '?'])
        .map(|c| c.trim().trim_end_matches('.').trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Take a single clause as a place, unless it talks about the citizen
/// ("please hurry") or answers yes or no
pub fn clause_place(clause: &str) -> Option<String> {
    let first = words_lower(clause).into_iter().next()?;
    if SUBJECT_WORDS.contains(&first.as_str()) || is_negative(clause) || is_affirmative(clause) {
        return None;
    }
    as_location(clause)
}

/// Whether the utterance says yes
pub fn is_affirmative(utterance: &str) -> bool {
    let lower = normalize(utterance).to_ascii_lowercase();
    if is_negative(utterance) {
        return false;
    }
    let first = words_lower(&lower).into_iter().next().unwrap_or_default();
    AFFIRMATIVE_WORDS.contains(&first.as_str())
        || AT_HOME_PHRASES.iter().any(|p| contains_phrase(&lower, p))
}

/// Whether the utterance says no
pub fn is_negative(utterance: &str) -> bool {
    let lower = normalize(utterance).to_ascii_lowercase();
    let first = words_lower(&lower).into_iter().next().unwrap_or_default();
    NEGATIVE_WORDS.contains(&first.as_str())
        || NEGATIVE_PHRASES.iter().any(|p| contains_phrase(&lower, p))
}

fn words_lower(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_ascii_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

fn is_common(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    COMMON_WORDS.contains(&lower.as_str()) || STATE_WORDS.contains(&lower.as_str())
}

fn is_greeting(word: &str) -> bool {
    GREETING_WORDS.contains(&word.to_ascii_lowercase().as_str())
}

fn contains_phrase(lower: &str, phrase: &str) -> bool {
    find_phrase(lower, phrase).is_some()
}

/// Byte offset just past `phrase` in `text`, matched case-insensitively on
/// word boundaries
fn find_phrase(text: &str, phrase: &str) -> Option<usize> {
    let lower = text.to_ascii_lowercase();
    let mut from = 0;
    while let Some(pos) = lower[from..].find(phrase) {
        let start = from + pos;
        let end = start + phrase.len();
        let before_ok = lower[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric() && c != '\'');
        let after_ok = lower[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric() && c != '\'');
        if before_ok && after_ok {
            return Some(end);
        }
        from = end;
    }
    None
}

fn after_phrase<'a>(text: &'a str, phrase: &str) -> Option<&'a str> {
    find_phrase(text, phrase).map(|end| text[end..].trim_start())
}

fn clause(text: &str) -> &str {
    let mut end = text.len();
    for stop in [".", "!", "?", ";", ",", " and ", " but ", " because "] {
        if let Some(pos) = text.to_ascii_lowercase().find(stop) {
            end = end.min(pos);
        }
    }
    text[..end].trim()
}

fn name_words(text: &str) -> Option<String> {
    let mut words = Vec::new();
    for raw in text.split_whitespace() {
        let word = raw.trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';'));
        let ends_clause = word.len() != raw.len();
        if word.is_empty()
            || !word.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-')
            || NAME_STOP_WORDS.contains(&word.to_ascii_lowercase().as_str())
        {
            break;
        }
        words.push(word);
        if ends_clause || words.len() == 4 {
            break;
        }
    }
    if words.is_empty() {
        None
    } else {
        Some(title_case(&words.join(" ")))
    }
}
