//! Wire codec for the Gemini web RPC format.
//!
//! Requests are nested positional JSON arrays, serialized twice: the inner
//! array becomes a string inside an outer envelope, which is sent as the
//! `f.req` form field. Responses arrive as newline-separated envelopes after
//! an anti-hijacking prefix, each possibly carrying a payload that is itself a
//! JSON string.
//!
//! All magic offsets live in this module. Callers work with
//! [`SessionMetadata`], [`DeepResearchPayload`] and [`Response`].

use std::collections::HashSet;

use serde_json::{Value, json};

use crate::providers::ProviderError;
use crate::providers::gemini::constants::{
    ANTI_HIJACK_PREFIX, DEEP_RESEARCH_SLOTS, ERROR_MARKER, RESPONSE_MARKER, RETRIEVE_RESEARCH_RPC,
};
use crate::providers::types::{
    Candidate, Image, META_CHOICE_ID, META_CONVERSATION_ID, META_RESPONSE_ID, META_STATE_TOKEN,
    META_THOUGHTS, Reference, Response, SessionMetadata,
};

// ---------------------------------------------------------------------------
// Positional arrays
// ---------------------------------------------------------------------------

/// Builder for sparse positional arrays.
///
/// Unset interior slots serialize as `null`. With a fixed length the array is
/// padded to that length; otherwise it ends at the highest slot that was set.
#[derive(Debug, Default)]
pub(crate) struct Slots {
    values: Vec<Value>,
    min_len: usize,
}

impl Slots {
    /// Array padded with `null` up to `len` slots.
    pub(crate) fn fixed(len: usize) -> Self {
        Self {
            values: Vec::with_capacity(len),
            min_len: len,
        }
    }

    /// Array truncated after the last slot that was set.
    pub(crate) fn truncated() -> Self {
        Self::default()
    }

    pub(crate) fn set(&mut self, index: usize, value: impl Into<Value>) -> &mut Self {
        if self.values.len() <= index {
            self.values.resize(index + 1, Value::Null);
        }
        self.values[index] = value.into();
        self
    }

    pub(crate) fn into_value(self) -> Value {
        let mut values = self.values;
        if values.len() < self.min_len {
            values.resize(self.min_len, Value::Null);
        }
        Value::Array(values)
    }
}

// ---------------------------------------------------------------------------
// Single-turn encoding
// ---------------------------------------------------------------------------

/// Inner request array: `[[prompt], null, [cid, rid, rcid]]`.
pub fn single_turn_inner(prompt: &str, metadata: &SessionMetadata) -> Value {
    json!([
        [prompt],
        null,
        [
            metadata.conversation_id,
            metadata.response_id,
            metadata.choice_id
        ]
    ])
}

/// Value of the `f.req` form field for a single turn.
pub fn encode_single_turn(prompt: &str, metadata: &SessionMetadata) -> String {
    let inner = single_turn_inner(prompt, metadata).to_string();
    json!([null, inner]).to_string()
}

// ---------------------------------------------------------------------------
// Deep research encoding
// ---------------------------------------------------------------------------

/// Which half of the deep research handshake a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchPhase {
    /// The service drafts a research plan.
    Planning,
    /// The service executes the plan it drafted.
    Execution,
}

impl ResearchPhase {
    fn indicator(self) -> u8 {
        match self {
            Self::Planning => 0,
            Self::Execution => 1,
        }
    }
}

/// Continuity ids handed from the planning phase to the execution phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Continuity {
    pub conversation_id: String,
    pub response_id: String,
    pub choice_id: String,
}

impl Continuity {
    pub fn from_response(response: &Response) -> Self {
        let meta = SessionMetadata::from_response(response);
        Self {
            conversation_id: meta.conversation_id.unwrap_or_default(),
            response_id: meta.response_id.unwrap_or_default(),
            choice_id: meta.choice_id.unwrap_or_default(),
        }
    }
}

/// Named view of the 65-slot deep research request.
#[derive(Debug, Clone, PartialEq)]
pub struct DeepResearchPayload {
    pub phase: ResearchPhase,
    pub prompt: String,
    pub locale: String,
    /// `None` sends the empty placeholder used by the planning phase.
    pub continuity: Option<Continuity>,
    pub state_token: String,
    pub feature_id: Option<&'static str>,
    pub request_id: String,
}

impl DeepResearchPayload {
    /// Positional inner array.
    pub fn to_inner(&self) -> Value {
        let continuity = match &self.continuity {
            Some(c) => json!([c.conversation_id, c.response_id, c.choice_id]),
            None => json!(["", "", "", null, null, null, null, null, null, ""]),
        };

        let mut slots = Slots::fixed(DEEP_RESEARCH_SLOTS);
        slots
            .set(0, json!([self.prompt, 0, null, null, null, null, 0]))
            .set(1, json!([self.locale]))
            .set(2, continuity)
            .set(3, self.state_token.as_str())
            .set(17, json!([[self.phase.indicator()]]))
            .set(54, json!([[[[[1]]]]]))
            .set(55, json!([[1]]))
            .set(59, self.request_id.as_str());
        if let Some(feature_id) = self.feature_id {
            slots.set(4, feature_id);
        }
        slots.into_value()
    }

    /// Value of the `f.req` form field. The execution phase repeats the
    /// state token as a fourth envelope element.
    pub fn to_freq(&self) -> String {
        let mut outer = Slots::truncated();
        outer.set(1, self.to_inner().to_string());
        if self.phase == ResearchPhase::Execution && !self.state_token.is_empty() {
            outer.set(3, self.state_token.as_str());
        }
        outer.into_value().to_string()
    }
}

/// Value of the `f.req` form field for research retrieval.
pub fn encode_retrieve_research(conversation_id: &str) -> String {
    let inner = json!([conversation_id]).to_string();
    json!([[[RETRIEVE_RESEARCH_RPC, inner, null, "generic"]]]).to_string()
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a generation response body.
///
/// Streaming bodies repeat cumulative frames; the last payload carrying
/// candidates wins.
pub fn decode(body: &str) -> Result<Response, ProviderError> {
    let payloads = extract_payloads(body)?;
    let payload = payloads
        .iter()
        .rev()
        .find(|p| has_candidates(p))
        .or_else(|| payloads.last())
        .ok_or_else(no_payload)?;
    Ok(parse_generation(payload))
}

/// Decode a research retrieval body into the report text and its sources.
pub fn decode_research(body: &str) -> Result<Response, ProviderError> {
    let payloads = extract_payloads(body)?;
    let payload = payloads
        .iter()
        .rev()
        .find(|p| !p.is_null())
        .ok_or_else(no_payload)?;

    let text = str_at(payload, &[0, 1])
        .or_else(|| longest_string(payload).map(String::from))
        .unwrap_or_default();

    let mut references = Vec::new();
    let mut seen = HashSet::new();
    collect_references(payload, &mut references, &mut seen);

    Ok(Response {
        text,
        references,
        ..Default::default()
    })
}

/// Every payload found in the body, in order.
fn extract_payloads(body: &str) -> Result<Vec<Value>, ProviderError> {
    let mut payloads = Vec::new();
    let mut error_code = None;

    for line in body.lines() {
        let line = line.trim();
        // Length prefixes and the hijack guard are not arrays.
        if line.is_empty() || line.starts_with(ANTI_HIJACK_PREFIX) || !line.starts_with('[') {
            continue;
        }
        let Ok(Value::Array(envelope)) = serde_json::from_str::<Value>(line) else {
            continue;
        };

        for item in envelope.iter().filter_map(Value::as_array) {
            match item.first().and_then(Value::as_str) {
                Some(RESPONSE_MARKER) if item.len() >= 3 => {
                    let parsed = item
                        .get(2)
                        .and_then(Value::as_str)
                        .and_then(|raw| serde_json::from_str::<Value>(raw).ok());
                    if let Some(payload) = parsed {
                        payloads.push(payload);
                    }
                }
                Some(ERROR_MARKER) => {
                    error_code = item.get(5).and_then(Value::as_i64).or(error_code);
                }
                _ => {}
            }
        }
    }

    if payloads.is_empty() {
        return Err(match error_code {
            Some(code) => {
                ProviderError::MalformedResponse(format!("service reported error code {code}"))
            }
            None => no_payload(),
        });
    }
    Ok(payloads)
}

fn no_payload() -> ProviderError {
    ProviderError::MalformedResponse("no payload found in response body".to_string())
}

fn has_candidates(payload: &Value) -> bool {
    at(payload, &[4])
        .and_then(Value::as_array)
        .is_some_and(|c| !c.is_empty())
}

fn parse_generation(payload: &Value) -> Response {
    let conversation_id = str_at(payload, &[1, 0]);
    let response_id = str_at(payload, &[1, 1]);

    let raw_candidates: &[Value] = at(payload, &[4])
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let candidates: Vec<Candidate> = raw_candidates
        .iter()
        .map(|c| Candidate {
            id: str_at(c, &[0]).unwrap_or_default(),
            content: str_at(c, &[1, 0]).unwrap_or_default(),
        })
        .collect();

    let chosen_index = 0;
    let chosen = raw_candidates.get(chosen_index);
    let images = chosen.map(parse_images).unwrap_or_default();

    let mut response = Response {
        text: candidates
            .get(chosen_index)
            .map(|c| c.content.clone())
            .unwrap_or_default(),
        images,
        candidates,
        chosen_index,
        ..Default::default()
    };

    let choice_id = response
        .candidates
        .get(chosen_index)
        .map(|c| c.id.clone())
        .filter(|id| !id.is_empty());
    let entries = [
        (META_CONVERSATION_ID, conversation_id.clone()),
        (META_RESPONSE_ID, response_id.clone()),
        (META_CHOICE_ID, choice_id),
        (META_STATE_TOKEN, str_at(payload, &[3])),
        (META_THOUGHTS, chosen.and_then(|c| str_at(c, &[37, 0, 0]))),
    ];
    for (key, value) in entries {
        if let Some(value) = value {
            response.metadata.insert(key.to_string(), Value::String(value));
        }
    }

    response.conversation_id = conversation_id;
    response.response_id = response_id;
    response
}

fn parse_images(candidate: &Value) -> Vec<Image> {
    let Some(raw) = at(candidate, &[12, 1]).and_then(Value::as_array) else {
        return Vec::new();
    };
    raw.iter()
        .filter_map(|img| {
            let url = str_at(img, &[0, 0, 0])?;
            Some(Image {
                url,
                title: str_at(img, &[7, 0]).unwrap_or_default(),
                alt_text: str_at(img, &[0, 4]).unwrap_or_default(),
                width: None,
                height: None,
            })
        })
        .collect()
}

fn collect_references(value: &Value, out: &mut Vec<Reference>, seen: &mut HashSet<String>) {
    let Some(items) = value.as_array() else {
        return;
    };

    let url = items
        .iter()
        .filter_map(Value::as_str)
        .find(|s| is_url(s));
    let title = items
        .iter()
        .filter_map(Value::as_str)
        .find(|s| !s.trim().is_empty() && !is_url(s));
    if let (Some(url), Some(title)) = (url, title) {
        if seen.insert(url.to_string()) {
            out.push(Reference {
                title: title.to_string(),
                url: url.to_string(),
            });
        }
    }

    for item in items {
        collect_references(item, out, seen);
    }
}

fn is_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}

fn longest_string(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items
            .iter()
            .filter_map(longest_string)
            .max_by_key(|s| s.len()),
        _ => None,
    }
}

fn at<'a>(value: &'a Value, path: &[usize]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, &i| v.get(i))
}

/// Non-empty string at `path`.
fn str_at(value: &Value, path: &[usize]) -> Option<String> {
    at(value, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
