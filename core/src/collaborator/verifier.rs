use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Settings;
use crate::error::CollaboratorError;
use crate::model::Task;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of a proof review. A collaborator outage is reported as a
/// rejecting verdict, never an error: task state must not wedge on a flaky
/// remote model, and the user can resubmit.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub approved: bool,
    pub reason: String,
}

impl Verdict {
    pub fn service_failed() -> Self {
        Self {
            approved: false,
            reason: "verification service failed, please try again".to_string(),
        }
    }
}

#[async_trait]
pub trait ProofVerifier: Send + Sync {
    async fn verify(&self, task: &Task, image: &[u8], mime: &str) -> Verdict;
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<serde_json::Value>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatRecvMessage,
}

#[derive(Deserialize)]
struct ChatRecvMessage {
    content: Option<String>,
}

const VERIFY_SYSTEM_PROMPT: &str = "You review photographic proof that a task was genuinely completed. \
Given the task title, description and category, decide whether the photo plausibly shows the finished work. \
Reply with a single line starting with APPROVED or REJECTED, followed by a colon and a short reason.";

/// Sends the proof photo plus task context to a chat-completions style
/// generative endpoint and parses an APPROVED/REJECTED verdict out of the
/// reply.
pub struct AiVerifier {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl AiVerifier {
    pub fn new(settings: &Settings) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint: settings.ai_endpoint.clone(),
            api_key: settings.ai_api_key.clone(),
            model: settings.ai_model.clone(),
        })
    }

    async fn request_verdict(
        &self,
        task: &Task,
        image: &[u8],
        mime: &str,
    ) -> Result<Verdict, CollaboratorError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let task_summary = format!(
            "Task: {}\nCategory: {:?}\nPlanned hours: {}\nDescription: {}",
            task.title,
            task.category,
            task.planned_hours,
            task.description.as_deref().unwrap_or("-"),
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                json!({ "role": "system", "content": VERIFY_SYSTEM_PROMPT }),
                json!({
                    "role": "user",
                    "content": [
                        { "type": "text", "text": task_summary },
                        {
                            "type": "image_url",
                            "image_url": { "url": format!("data:{};base64,{}", mime, encoded) }
                        }
                    ]
                }),
            ],
            temperature: 0.0,
            max_tokens: 200,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: ChatResponse = resp.json().await?;
        let content = body
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| CollaboratorError::Malformed("empty completion".to_string()))?;

        Ok(parse_verdict(content))
    }
}

fn parse_verdict(content: &str) -> Verdict {
    let line = content.trim();
    let (head, rest) = line.split_once(':').unwrap_or((line, ""));
    let approved = head.trim().eq_ignore_ascii_case("approved");
    let reason = rest.trim();
    Verdict {
        approved,
        reason: if reason.is_empty() {
            if approved {
                "proof accepted".to_string()
            } else {
                "proof did not show the completed task".to_string()
            }
        } else {
            reason.to_string()
        },
    }
}

#[async_trait]
impl ProofVerifier for AiVerifier {
    async fn verify(&self, task: &Task, image: &[u8], mime: &str) -> Verdict {
        match self.request_verdict(task, image, mime).await {
            Ok(verdict) => verdict,
            Err(err) => {
                log::warn!("proof verification failed for task {}: {}", task.id, err);
                Verdict::service_failed()
            }
        }
    }
}

/// Deterministic stand-in for offline use and tests: approves anything that
/// looks like an image payload.
pub struct OfflineVerifier;

#[async_trait]
impl ProofVerifier for OfflineVerifier {
    async fn verify(&self, _task: &Task, image: &[u8], _mime: &str) -> Verdict {
        if image.is_empty() {
            Verdict {
                approved: false,
                reason: "empty proof file".to_string(),
            }
        } else {
            Verdict {
                approved: true,
                reason: "accepted without remote review (offline mode)".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verdict_approved() {
        let v = parse_verdict("APPROVED: desk photo matches the essay task");
        assert!(v.approved);
        assert_eq!(v.reason, "desk photo matches the essay task");
    }

    #[test]
    fn test_parse_verdict_rejected_without_reason() {
        let v = parse_verdict("REJECTED");
        assert!(!v.approved);
        assert!(!v.reason.is_empty());
    }

    #[test]
    fn test_parse_verdict_garbage_rejects() {
        let v = parse_verdict("I am not sure what this is.");
        assert!(!v.approved);
    }
}
