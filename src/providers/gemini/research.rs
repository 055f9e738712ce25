//! Deep research handshake.
//!
//! Deep research runs as two exchanges sharing one request id. The planning
//! request makes the service draft a plan and hand back a state token; the
//! execution request presents that token to start the research. When the
//! planning reply carries no token the service answered directly, and the
//! workflow finishes with that reply.
//!
//! [`DeepResearch`] only tracks state. The client drives it by sending
//! [`DeepResearch::next_request`] and feeding each decoded reply to
//! [`DeepResearch::advance`] until [`DeepResearch::is_done`].

use tracing::debug;
use uuid::Uuid;

use crate::providers::gemini::codec::{Continuity, DeepResearchPayload, ResearchPhase};
use crate::providers::gemini::constants::{
    DEEP_RESEARCH_FEATURE_ID, DEEP_RESEARCH_START_PROMPT, DEFAULT_LOCALE,
};
use crate::providers::types::Response;

#[derive(Debug, Clone, PartialEq)]
pub enum ResearchState {
    /// Waiting for the plan.
    Planning { prompt: String },
    /// Plan accepted; waiting for the research result.
    Execution {
        state_token: String,
        continuity: Continuity,
    },
    Done(Response),
}

/// One deep research workflow, keyed by its request id.
#[derive(Debug, Clone)]
pub struct DeepResearch {
    request_id: String,
    locale: String,
    state: ResearchState,
}

impl DeepResearch {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self::with_request_id(prompt, Uuid::new_v4().to_string())
    }

    pub fn with_request_id(prompt: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            locale: DEFAULT_LOCALE.to_string(),
            state: ResearchState::Planning {
                prompt: prompt.into(),
            },
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn state(&self) -> &ResearchState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, ResearchState::Done(_))
    }

    /// Request to send for the current state, or `None` once done.
    pub fn next_request(&self) -> Option<DeepResearchPayload> {
        match &self.state {
            ResearchState::Planning { prompt } => Some(DeepResearchPayload {
                phase: ResearchPhase::Planning,
                prompt: prompt.clone(),
                locale: self.locale.clone(),
                continuity: None,
                state_token: String::new(),
                feature_id: Some(DEEP_RESEARCH_FEATURE_ID),
                request_id: self.request_id.clone(),
            }),
            ResearchState::Execution {
                state_token,
                continuity,
            } => Some(DeepResearchPayload {
                phase: ResearchPhase::Execution,
                prompt: DEEP_RESEARCH_START_PROMPT.to_string(),
                locale: self.locale.clone(),
                continuity: Some(continuity.clone()),
                state_token: state_token.clone(),
                feature_id: None,
                request_id: self.request_id.clone(),
            }),
            ResearchState::Done(_) => None,
        }
    }

    /// Apply the decoded reply to the request last produced by
    /// [`Self::next_request`].
    pub fn advance(mut self, response: Response) -> Self {
        self.state = match self.state {
            ResearchState::Planning { .. } => match response.state_token() {
                Some(token) => {
                    debug!(request_id = %self.request_id, "Research plan received, starting execution");
                    ResearchState::Execution {
                        state_token: token.to_string(),
                        continuity: Continuity::from_response(&response),
                    }
                }
                None => {
                    debug!(request_id = %self.request_id, "No state token in plan, returning it as the answer");
                    ResearchState::Done(response)
                }
            },
            ResearchState::Execution { .. } => ResearchState::Done(response),
            done @ ResearchState::Done(_) => done,
        };
        self
    }

    /// Final response once the workflow is done.
    pub fn into_response(self) -> Option<Response> {
        match self.state {
            ResearchState::Done(response) => Some(response),
            _ => None,
        }
    }
}
