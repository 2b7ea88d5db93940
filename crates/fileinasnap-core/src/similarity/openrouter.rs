use super::{Excerpt, SimilarityOracle};
use crate::config::OpenRouterSettings;
use crate::error::Error;
use config::ConfigError;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::trace;

const SCORE_FIELDS: [&str; 3] = ["similarity_score", "similarity", "score"];

/// Collaborator backed by an OpenRouter chat-completion model.
pub struct OpenRouterOracle {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
    settings: OpenRouterSettings,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

impl OpenRouterOracle {
    pub fn new(settings: OpenRouterSettings) -> Result<Self, Error> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Message(
                    "openrouter.api_key (or OPENROUTER_API_KEY) is required for the openrouter provider"
                        .to_string(),
                )
            })?;

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build();
        let endpoint = format!("{}/chat/completions", settings.api_base.trim_end_matches('/'));

        Ok(Self {
            agent,
            endpoint,
            api_key,
            settings,
        })
    }

    fn request_body(&self, a: &Excerpt<'_>, b: &Excerpt<'_>) -> Value {
        json!({
            "model": self.settings.model,
            "messages": [
                {
                    "role": "user",
                    "content": build_prompt(a, b),
                }
            ],
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
        })
    }
}

impl SimilarityOracle for OpenRouterOracle {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn compare(&self, a: &Excerpt<'_>, b: &Excerpt<'_>) -> Result<f64, Error> {
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("HTTP-Referer", &self.settings.site_url)
            .set("X-Title", &self.settings.site_name)
            .send_json(self.request_body(a, b))
            .map_err(|e| match e {
                ureq::Error::Status(code, response) => Error::Collaborator(format!(
                    "OpenRouter API error: {} - {}",
                    code,
                    response.into_string().unwrap_or_default()
                )),
                other => Error::Collaborator(format!("OpenRouter request failed: {}", other)),
            })?;

        let completion: ChatCompletion = response
            .into_json()
            .map_err(|e| Error::Collaborator(format!("Malformed OpenRouter response: {}", e)))?;

        let text = first_message(completion)?;
        trace!("OpenRouter replied for '{}' / '{}': {}", a.name, b.name, text);
        parse_similarity_score(&text)
    }
}

fn first_message(completion: ChatCompletion) -> Result<String, Error> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::Collaborator("OpenRouter response has no message content".to_string()))
}

fn build_prompt(a: &Excerpt<'_>, b: &Excerpt<'_>) -> String {
    format!(
        "Compare the two files below and rate how similar their content is, \
         from 0.0 (unrelated) to 1.0 (the same document).\n\
         Respond only with JSON: {{\"similarity_score\": <number>}}\n\n\
         File A: {}\n{}\n\n\
         File B: {}\n{}\n",
        a.name, a.text, b.name, b.text
    )
}

/// Pulls the score out of a model reply.
///
/// Takes the first `{...}` object in the text that carries `similarity_score`,
/// `similarity` or `score`; code fences, chatter and stray braces around it are ignored.
/// A reply that is just a number is accepted as well.
pub fn parse_similarity_score(text: &str) -> Result<f64, Error> {
    for (start, _) in text.match_indices('{') {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(map))) = values.next() {
            if let Some(score) = score_field(&map) {
                return Ok(score);
            }
        }
    }

    text.trim().parse::<f64>().map_err(|_| {
        Error::Collaborator(format!(
            "could not find a similarity score in model reply: {:.120}",
            text
        ))
    })
}

fn score_field(map: &Map<String, Value>) -> Option<f64> {
    SCORE_FIELDS.iter().find_map(|field| match map.get(*field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        assert_eq!(parse_similarity_score(r#"{"similarity_score": 0.87}"#).unwrap(), 0.87);
    }

    #[test]
    fn test_parse_fenced_json_with_chatter() {
        let reply = "Sure! Here is the result:\n```json\n{\n  \"similarity_score\": 0.95,\n  \"reason\": \"same invoice\"\n}\n```";
        assert_eq!(parse_similarity_score(reply).unwrap(), 0.95);
    }

    #[test]
    fn test_parse_aliases_and_strings() {
        assert_eq!(parse_similarity_score(r#"{"similarity": 0.5}"#).unwrap(), 0.5);
        assert_eq!(parse_similarity_score(r#"{"score": "0.25"}"#).unwrap(), 0.25);
    }

    #[test]
    fn test_parse_bare_number() {
        assert_eq!(parse_similarity_score(" 0.7\n").unwrap(), 0.7);
    }

    #[test]
    fn test_parse_ignores_braces_after_the_answer() {
        let reply = r#"{"similarity_score": 0.92} (scale {0..1})"#;
        assert_eq!(parse_similarity_score(reply).unwrap(), 0.92);
    }

    #[test]
    fn test_parse_skips_echoed_format() {
        let reply = "Format: {\"similarity_score\": <number>}\nAnswer: {\"similarity_score\": 0.81}";
        assert_eq!(parse_similarity_score(reply).unwrap(), 0.81);

        let reply = r#"{"note": "no score here"} then {"score": 0.4}"#;
        assert_eq!(parse_similarity_score(reply).unwrap(), 0.4);
    }

    #[test]
    fn test_parse_failure() {
        assert!(matches!(
            parse_similarity_score("These files look fairly similar."),
            Err(Error::Collaborator(_))
        ));
        assert!(parse_similarity_score(r#"{"verdict": "similar"}"#).is_err());
    }

    #[test]
    fn test_first_message_from_completion_body() {
        let body = r#"{
            "id": "gen-123",
            "choices": [
                {"message": {"role": "assistant", "content": "{\"similarity_score\": 0.91}"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }"#;
        let completion: ChatCompletion = serde_json::from_str(body).unwrap();
        let text = first_message(completion).unwrap();
        assert_eq!(parse_similarity_score(&text).unwrap(), 0.91);
    }

    #[test]
    fn test_empty_choices() {
        let completion: ChatCompletion = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(first_message(completion), Err(Error::Collaborator(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let settings = OpenRouterSettings {
            api_key: Some("sk-test".to_string()),
            api_base: "https://example.invalid/api/v1/".to_string(),
            ..OpenRouterSettings::default()
        };
        let oracle = OpenRouterOracle::new(settings).unwrap();
        assert_eq!(oracle.endpoint, "https://example.invalid/api/v1/chat/completions");

        let body = oracle.request_body(
            &Excerpt { name: "a.txt", text: "alpha" },
            &Excerpt { name: "b.txt", text: "beta" },
        );
        assert_eq!(body["model"], "mistralai/mistral-7b-instruct");
        assert_eq!(body["messages"][0]["role"], "user");
        let prompt = body["messages"][0]["content"].as_str().unwrap();
        assert!(prompt.contains("File A: a.txt\nalpha"));
        assert!(prompt.contains("File B: b.txt\nbeta"));
    }

    #[test]
    fn test_blank_key_rejected() {
        let settings = OpenRouterSettings {
            api_key: Some("   ".to_string()),
            ..OpenRouterSettings::default()
        };
        assert!(matches!(OpenRouterOracle::new(settings), Err(Error::Config(_))));
    }
}
