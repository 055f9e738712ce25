//! Protocol-neutral streaming events.
//!
//! The backing service returns a complete reply, so streaming endpoints replay
//! it as a short, finite event sequence: a role-only opener, the reply text,
//! and a terminal event carrying the finish reason. Each protocol module maps
//! these events onto its own chunk shapes.

use crate::providers::types::Response;

// MARK: - Events

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Announces the assistant role. Carries no text.
    Role,
    /// Reply text, in order.
    Content(String),
    /// End of the reply. The delta is empty.
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Role,
    Content,
    Finish,
    Done,
}

// MARK: - Iterator

/// Lazy iterator over the stream events for one reply.
///
/// Not restartable: once exhausted it keeps returning `None`.
#[derive(Debug, Clone)]
pub struct ResponseEvents {
    text: String,
    stage: Stage,
}

impl ResponseEvents {
    pub fn new(response: &Response) -> Self {
        Self::from_text(response.text.clone())
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stage: Stage::Role,
        }
    }
}

impl Iterator for ResponseEvents {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<StreamEvent> {
        loop {
            match self.stage {
                Stage::Role => {
                    self.stage = Stage::Content;
                    return Some(StreamEvent::Role);
                }
                Stage::Content => {
                    self.stage = Stage::Finish;
                    if !self.text.is_empty() {
                        return Some(StreamEvent::Content(std::mem::take(&mut self.text)));
                    }
                }
                Stage::Finish => {
                    self.stage = Stage::Done;
                    return Some(StreamEvent::Finish);
                }
                Stage::Done => return None,
            }
        }
    }
}

impl std::iter::FusedIterator for ResponseEvents {}
