use std::fmt;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Lazy, finite sequence of answer fragments. Fragments must be concatenated
/// in order; their boundaries carry no meaning.
pub type TextStream = BoxStream<'static, Result<String, DomainError>>;

/// Prompt text built for a single request from the retrieved reviews and the
/// user's question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundedContext(String);

impl GroundedContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for GroundedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Speaker of a turn sent to the generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// Conversation handed to the generator for one request.
///
/// The history always holds exactly two scripted turns: the system
/// instruction sent as a user turn and a fixed model acknowledgment. The
/// grounded context follows as the message to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSession {
    history: [ChatTurn; 2],
    message: GroundedContext,
}

impl GenerationSession {
    pub fn seeded(
        system_instruction: impl Into<String>,
        acknowledgment: impl Into<String>,
        context: GroundedContext,
    ) -> Self {
        Self {
            history: [
                ChatTurn {
                    role: ChatRole::User,
                    text: system_instruction.into(),
                },
                ChatTurn {
                    role: ChatRole::Model,
                    text: acknowledgment.into(),
                },
            ],
            message: context,
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn message(&self) -> &GroundedContext {
        &self.message
    }

    /// Every turn in send order: the seeded history followed by the message.
    pub fn turns(&self) -> impl Iterator<Item = (ChatRole, &str)> {
        self.history
            .iter()
            .map(|t| (t.role, t.text.as_str()))
            .chain(std::iter::once((ChatRole::User, self.message.as_str())))
    }
}
