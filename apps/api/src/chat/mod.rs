pub mod handlers;
pub mod prompts;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chat::prompts::{GREETING_MODEL, GREETING_USER};
use crate::llm_client::{
    Content, GenerateRequest, GenerativeModel, LlmError, Part, Role, SafetyProfile,
};

/// One prior message. History lives with the caller; nothing is stored server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

/// Seed exchange, prior turns, then the new message. Blank turns are dropped.
pub fn build_request(history: &[ChatTurn], message: &str) -> GenerateRequest {
    let seed = [
        (Role::User, GREETING_USER),
        (Role::Model, GREETING_MODEL),
    ];

    let contents = seed
        .into_iter()
        .chain(history.iter().map(|turn| (turn.role, turn.text.as_str())))
        .filter(|(_, text)| !text.trim().is_empty())
        .chain(std::iter::once((Role::User, message)))
        .map(|(role, text)| Content {
            role: Some(role),
            parts: vec![Part::Text(text.to_string())],
        })
        .collect();

    GenerateRequest {
        contents,
        safety: SafetyProfile::Strict,
    }
}

pub async fn reply(
    model: &dyn GenerativeModel,
    history: &[ChatTurn],
    message: &str,
) -> Result<String, LlmError> {
    let request = build_request(history, message);
    debug!("Chat request with {} turns", request.contents.len());
    let text = model.generate(&request).await?;
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: Role, text: &str) -> ChatTurn {
        ChatTurn {
            role,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_request_starts_with_greeting_and_ends_with_message() {
        let request = build_request(&[], "How do I improve my summary?");

        assert_eq!(request.contents.len(), 3);
        assert_eq!(request.contents[0].role, Some(Role::User));
        assert_eq!(
            request.contents[1].parts,
            vec![Part::Text(GREETING_MODEL.to_string())]
        );
        assert_eq!(
            request.contents[2].parts,
            vec![Part::Text("How do I improve my summary?".to_string())]
        );
        assert_eq!(request.safety, SafetyProfile::Strict);
    }

    #[test]
    fn test_history_is_kept_in_order_without_blank_turns() {
        let history = vec![
            turn(Role::User, "What is an ATS?"),
            turn(Role::Model, "An applicant tracking system."),
            turn(Role::User, "   "),
        ];
        let request = build_request(&history, "Thanks");

        let roles: Vec<_> = request.contents.iter().map(|c| c.role).collect();
        assert_eq!(
            roles,
            vec![
                Some(Role::User),
                Some(Role::Model),
                Some(Role::User),
                Some(Role::Model),
                Some(Role::User)
            ]
        );
    }
}
