use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// One message of the caller-supplied chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// Returns the content of the final turn, which must come from the user.
///
/// Earlier turns are accepted as-is; only the last one becomes the query.
pub fn latest_user_query(conversation: &[ConversationTurn]) -> Result<&str, DomainError> {
    let last = conversation
        .last()
        .ok_or_else(|| DomainError::input("conversation is empty"))?;

    if last.role != Role::User {
        return Err(DomainError::input(format!(
            "last message must come from the user, got {}",
            last.role.as_str()
        )));
    }

    let query = last.content.trim();
    if query.is_empty() {
        return Err(DomainError::input("latest user message is empty"));
    }

    Ok(query)
}
