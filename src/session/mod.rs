//! Guided emergency session
//!
//! The guided orchestrator is a finite-state machine over
//! `NameUnknown -> NameKnown -> LocationConfirmed -> Routed`. Each utterance
//! produces a [`Reply`] with the text for the citizen, the resulting state
//! and the service the request was routed to, if any.
//!
//! A locator is only ever called once both a name and a location are in the
//! [`SessionContext`].

pub mod phrases;

use crate::error::Result;
use crate::locator::{LocateRequest, Locator, ServiceKind};
use crate::profile::{LookupOutcome, ProfileLookup, UserProfile};
use crate::routing::{Intent, IntentClassifier, KeywordClassifier};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// How the location is being established
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum LocationStep {
    /// Waiting for a yes/no on the home address from the profile
    ConfirmHome {
        /// Home address from the profile
        address: String,
    },
    /// Waiting for the citizen to say where they are
    AskCurrent,
}

/// Guided session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No name yet; `prompts` counts how often it was asked
    NameUnknown { prompts: u32 },
    /// Name known, location pending
    NameKnown { step: LocationStep },
    /// Name and location known
    LocationConfirmed,
    /// A request was routed to `service`
    Routed { service: ServiceKind },
}

impl SessionState {
    fn label(&self) -> &'static str {
        match self {
            SessionState::NameUnknown { .. } => "name_unknown",
            SessionState::NameKnown {
                step: LocationStep::ConfirmHome { .. },
            } => "confirm_home",
            SessionState::NameKnown {
                step: LocationStep::AskCurrent,
            } => "ask_current",
            SessionState::LocationConfirmed => "location_confirmed",
            SessionState::Routed { .. } => "routed",
        }
    }
}

/// What the session knows about the citizen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionContext {
    /// Session identifier used in logs
    pub id: Uuid,
    /// Citizen's name
    pub name: Option<String>,
    /// Profile, when the lookup found one
    pub profile: Option<UserProfile>,
    /// Confirmed location
    pub location: Option<String>,
    /// Emergency reported before it could be routed
    pub pending: Option<ServiceKind>,
    /// The utterance that reported the pending emergency
    pub pending_request: Option<String>,
}

impl SessionContext {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            profile: None,
            location: None,
            pending: None,
            pending_request: None,
        }
    }
}

/// Response to one utterance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    /// Text for the citizen
    pub text: String,
    /// State after the utterance
    pub state: SessionState,
    /// Service the utterance was routed to
    pub routed: Option<ServiceKind>,
}

/// Guided orchestrator for one citizen
pub struct Orchestrator {
    state: SessionState,
    context: SessionContext,
    lookup: Arc<dyn ProfileLookup>,
    locator: Arc<dyn Locator>,
    classifier: Arc<dyn IntentClassifier>,
    keywords: KeywordClassifier,
    emergency_number: String,
}

impl Orchestrator {
    /// Create a session
    ///
    /// `classifier` routes requests once the location is known; emergency
    /// detection before that point always uses keywords.
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Config` if the keyword patterns fail to compile
    pub fn new(
        lookup: Arc<dyn ProfileLookup>,
        locator: Arc<dyn Locator>,
        classifier: Arc<dyn IntentClassifier>,
        emergency_number: impl Into<String>,
    ) -> Result<Self> {
        let context = SessionContext::new();
        tracing::info!(session_id = %context.id, "Guided session started");
        Ok(Self {
            state: SessionState::NameUnknown { prompts: 0 },
            context,
            lookup,
            locator,
            classifier,
            keywords: KeywordClassifier::new()?,
            emergency_number: emergency_number.into(),
        })
    }

    /// Current state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// What the session knows
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Opening line of the session
    pub fn greet(&mut self) -> Reply {
        if let SessionState::NameUnknown { prompts } = self.state {
            self.transition(SessionState::NameUnknown {
                prompts: prompts + 1,
            });
            return self.reply(vec![phrases::GREETING.to_string()], None);
        }
        let question = self.current_question();
        self.reply(vec![question], None)
    }

    /// Handle one utterance
    pub async fn handle(&mut self, utterance: &str) -> Reply {
        let text = phrases::normalize(utterance);
        if text.is_empty() {
            let question = self.current_question();
            return self.reply(vec![question], None);
        }

        match self.state.clone() {
            SessionState::NameUnknown { prompts } => self.on_name_unknown(&text, prompts).await,
            SessionState::NameKnown {
                step: LocationStep::ConfirmHome { address },
            } => self.on_confirm_home(&text, address).await,
            SessionState::NameKnown {
                step: LocationStep::AskCurrent,
            } => self.on_ask_current(&text).await,
            SessionState::LocationConfirmed | SessionState::Routed { .. } => {
                self.on_request(&text).await
            }
        }
    }

    async fn on_name_unknown(&mut self, text: &str, prompts: u32) -> Reply {
        let emergency = self.keywords.detect_emergency(text);
        if let Some(kind) = emergency {
            self.remember_pending(kind, text);
        }

        let has_keyword = self.keywords.has_keyword(text);
        if let Some(name) = phrases::extract_name(text, has_keyword) {
            return self.on_name(name, emergency.is_some()).await;
        }

        let lines = if emergency.is_some() {
            vec![
                phrases::emergency_reassurance(None),
                phrases::ASK_NAME_URGENT.to_string(),
            ]
        } else if prompts == 0 {
            vec![phrases::GREETING.to_string()]
        } else {
            vec![phrases::HESITATION.to_string()]
        };
        self.transition(SessionState::NameUnknown {
            prompts: prompts + 1,
        });
        self.reply(lines, None)
    }

    async fn on_name(&mut self, name: String, urgent: bool) -> Reply {
        tracing::info!(session_id = %self.context.id, "Citizen introduced themselves");
        let mut lines = Vec::new();
        if urgent {
            lines.push(phrases::emergency_reassurance(Some(&name)));
        }
        lines.push(phrases::acknowledge(&name));

        let outcome = self.lookup.lookup(&name).await;
        self.context.name = Some(name);

        match outcome {
            Ok(LookupOutcome::Found(profile)) => {
                let address = profile.home_address.clone();
                self.context.profile = Some(profile);
                match address {
                    Some(address) => {
                        lines.push(phrases::confirm_home(&address));
                        self.transition(SessionState::NameKnown {
                            step: LocationStep::ConfirmHome { address },
                        });
                    }
                    None => {
                        lines.push(phrases::ASK_LOCATION.to_string());
                        self.ask_current();
                    }
                }
            }
            Ok(LookupOutcome::NotFound) => {
                tracing::info!(session_id = %self.context.id, "No profile on file");
                lines.push(phrases::NOT_FOUND_NOTICE.to_string());
                lines.push(phrases::ASK_LOCATION.to_string());
                self.ask_current();
            }
            Err(e) => {
                tracing::error!(session_id = %self.context.id, "Profile lookup failed: {}", e);
                lines.push(phrases::LOOKUP_UNAVAILABLE.to_string());
                lines.push(phrases::ASK_LOCATION.to_string());
                self.ask_current();
            }
        }

        self.reply(lines, None)
    }

    async fn on_confirm_home(&mut self, text: &str, address: String) -> Reply {
        if phrases::is_negative(text) {
            if let Some(place) = phrases::extract_place(text) {
                self.note_emergency(text);
                return self.confirm_location(place, Vec::new()).await;
            }
            self.ask_current();
            return self.reply(vec![phrases::ASK_LOCATION.to_string()], None);
        }

        if phrases::is_affirmative(text) {
            self.note_emergency(text);
            return self.confirm_location(address, Vec::new()).await;
        }

        if let Some(place) = phrases::extract_place(text) {
            self.note_emergency(text);
            return self.confirm_location(place, Vec::new()).await;
        }

        let mut lines = Vec::new();
        if self.note_emergency(text) {
            lines.push(phrases::emergency_reassurance(self.context.name.as_deref()));
        }
        lines.push(phrases::confirm_home(&address));
        self.reply(lines, None)
    }

    async fn on_ask_current(&mut self, text: &str) -> Reply {
        if let Some(place) = phrases::extract_place(text) {
            self.note_emergency(text);
            return self.confirm_location(place, Vec::new()).await;
        }

        if self.note_emergency(text) {
            // "45 Lake Road, I have chest pain" carries the place in its own clause
            let place = phrases::clauses(text)
                .iter()
                .filter(|c| !self.keywords.has_keyword(c))
                .find_map(|c| phrases::clause_place(c));
            if let Some(place) = place {
                return self.confirm_location(place, Vec::new()).await;
            }
            let lines = vec![
                phrases::emergency_reassurance(self.context.name.as_deref()),
                phrases::ASK_LOCATION.to_string(),
            ];
            return self.reply(lines, None);
        }

        match phrases::as_location(text) {
            Some(place) if !phrases::is_negative(text) && !phrases::is_affirmative(text) => {
                self.confirm_location(place, Vec::new()).await
            }
            _ => self.reply(vec![phrases::ASK_LOCATION.to_string()], None),
        }
    }

    async fn on_request(&mut self, text: &str) -> Reply {
        let mut lines = Vec::new();
        if let Some(place) = phrases::extract_place(text) {
            tracing::info!(session_id = %self.context.id, "Location updated");
            lines.push(phrases::location_updated(&place));
            self.context.location = Some(place);
        }

        let intent = self.classifier.classify(text).await;
        tracing::debug!(session_id = %self.context.id, %intent, "Request classified");

        if let Some(kind) = intent.service() {
            return self.route(kind, Some(text.to_string()), lines).await;
        }

        let name = self.context.name.clone().unwrap_or_default();
        match intent {
            Intent::General => lines.push(phrases::general_ack(&name)),
            _ => lines.push(phrases::ask_how_to_help(&name)),
        }
        self.reply(lines, None)
    }

    async fn confirm_location(&mut self, place: String, mut lines: Vec<String>) -> Reply {
        tracing::info!(session_id = %self.context.id, "Location confirmed");
        self.context.location = Some(place.clone());
        self.transition(SessionState::LocationConfirmed);

        if let Some(kind) = self.context.pending.take() {
            let request = self.context.pending_request.take();
            return self.route(kind, request, lines).await;
        }

        lines.push(phrases::location_noted(&place));
        self.reply(lines, None)
    }

    async fn route(
        &mut self,
        kind: ServiceKind,
        request: Option<String>,
        mut lines: Vec<String>,
    ) -> Reply {
        let (Some(name), Some(location)) =
            (self.context.name.clone(), self.context.location.clone())
        else {
            tracing::warn!(session_id = %self.context.id, "Routing requested before location was known");
            self.remember_pending(kind, request.as_deref().unwrap_or_default());
            lines.push(phrases::ASK_LOCATION.to_string());
            return self.reply(lines, None);
        };

        let profile = self.context.profile.as_ref();
        let has_contacts = profile.map_or(false, UserProfile::has_contacts);
        let has_medical_history = profile.map_or(false, UserProfile::has_medical_history);
        lines.push(phrases::emergency_reassurance(Some(&name)));
        lines.push(phrases::finding(kind));
        if has_contacts {
            lines.push(phrases::CONTACTS_NOTICE.to_string());
        }

        let locate = LocateRequest {
            kind,
            location,
            request,
            has_contacts,
            has_medical_history,
        };
        tracing::info!(session_id = %self.context.id, service = %kind, "Routing to locator");

        match self.locator.locate(&locate).await {
            Ok(details) => {
                lines.push(details);
                self.transition(SessionState::Routed { service: kind });
                self.reply(lines, Some(kind))
            }
            Err(e) => {
                tracing::error!(session_id = %self.context.id, service = %kind, "Locator failed: {}", e);
                lines.push(phrases::locator_fallback(kind, &self.emergency_number));
                self.transition(SessionState::LocationConfirmed);
                self.reply(lines, None)
            }
        }
    }

    /// Store an emergency mentioned in `text`; true if one was found
    fn note_emergency(&mut self, text: &str) -> bool {
        match self.keywords.detect_emergency(text) {
            Some(kind) => {
                self.remember_pending(kind, text);
                true
            }
            None => false,
        }
    }

    fn remember_pending(&mut self, kind: ServiceKind, text: &str) {
        // A medical report is never downgraded by a later police one
        if self.context.pending == Some(ServiceKind::Medical) && kind == ServiceKind::Police {
            return;
        }
        tracing::info!(session_id = %self.context.id, service = %kind, "Emergency pending");
        self.context.pending = Some(kind);
        self.context.pending_request = Some(text.to_string()).filter(|t| !t.is_empty());
    }

    fn ask_current(&mut self) {
        self.transition(SessionState::NameKnown {
            step: LocationStep::AskCurrent,
        });
    }

    fn current_question(&self) -> String {
        match &self.state {
            SessionState::NameUnknown { prompts: 0 } => phrases::GREETING.to_string(),
            SessionState::NameUnknown { .. } => phrases::HESITATION.to_string(),
            SessionState::NameKnown {
                step: LocationStep::ConfirmHome { address },
            } => phrases::confirm_home(address),
            SessionState::NameKnown {
                step: LocationStep::AskCurrent,
            } => phrases::ASK_LOCATION.to_string(),
            SessionState::LocationConfirmed | SessionState::Routed { .. } => {
                phrases::ask_how_to_help(self.context.name.as_deref().unwrap_or_default())
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state.label() != next.label() {
            tracing::debug!(
                session_id = %self.context.id,
                from = self.state.label(),
                to = next.label(),
                "Session transition"
            );
        }
        self.state = next;
    }

    fn reply(&self, lines: Vec<String>, routed: Option<ServiceKind>) -> Reply {
        Reply {
            text: lines.join("\n"),
            state: self.state.clone(),
            routed,
        }
    }
}
