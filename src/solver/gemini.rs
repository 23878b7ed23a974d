use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{SolveInput, SolveRequest, Solver, SolverMode};
use crate::config::SolverConfig;

/// Solver backed by the Gemini `generateContent` REST endpoint.
pub struct GeminiSolver {
    mode: SolverMode,
    model: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiSolver {
    pub fn new(cfg: &SolverConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build gemini http client")?;
        Ok(Self {
            mode: cfg.mode,
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn text_part(text: String) -> Part {
    Part {
        text: Some(text),
        inline_data: None,
    }
}

fn request_body(request: SolveRequest) -> GenerateRequest {
    let mut parts = vec![text_part(request.prompt)];
    match request.input {
        SolveInput::Image { body, content_type } => parts.push(Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: content_type,
                data: STANDARD.encode(&body),
            }),
        }),
        SolveInput::Question(q) => parts.push(text_part(q)),
    }
    GenerateRequest {
        contents: vec![Content {
            role: Some("user".into()),
            parts,
        }],
    }
}

/// Concatenated text of the first candidate, if it has any.
fn answer_text(resp: GenerateResponse) -> Option<String> {
    let content = resp.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    (!text.trim().is_empty()).then_some(text)
}

#[async_trait]
impl Solver for GeminiSolver {
    fn mode(&self) -> SolverMode {
        self.mode
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn solve(&self, request: SolveRequest) -> anyhow::Result<String> {
        anyhow::ensure!(
            request.input.mode() == self.mode,
            "{} input sent to a {} solver",
            request.input.mode(),
            self.mode
        );
        debug!(model = %self.model, mode = %self.mode, "sending generateContent");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .json(&request_body(request))
            .send()
            .await
            .context("gemini request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, "gemini request failed");
            anyhow::bail!("gemini returned {status}: {error_text}");
        }

        let body: GenerateResponse = response.json().await.context("decode gemini response")?;
        answer_text(body).context("gemini returned no answer text")
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn image_request_inlines_base64() {
        let body = request_body(SolveRequest {
            prompt: "solve".into(),
            input: SolveInput::Image {
                body: Bytes::from_static(b"abc"),
                content_type: "image/png".into(),
            },
        });
        let json = serde_json::to_value(&body).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "solve");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "YWJj");
        assert!(parts[1].get("text").is_none());
    }

    #[test]
    fn chat_request_sends_question_as_text() {
        let body = request_body(SolveRequest {
            prompt: "solve".into(),
            input: SolveInput::Question("x^2 = 4".into()),
        });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][1]["text"], "x^2 = 4");
    }

    #[test]
    fn answer_joins_first_candidate_parts() {
        let resp: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "x = 2"}, {"text": " or x = -2"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(answer_text(resp).as_deref(), Some("x = 2 or x = -2"));
    }

    #[test]
    fn empty_candidates_have_no_answer() {
        let resp: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(answer_text(resp).is_none());

        let blank: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "  "}]}}]
        }))
        .unwrap();
        assert!(answer_text(blank).is_none());
    }

    #[tokio::test]
    async fn rejects_input_for_other_mode() {
        let solver = GeminiSolver::new(&SolverConfig {
            mode: SolverMode::Chat,
            api_key: "k".into(),
            model: "m".into(),
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
            system_prompt_path: "unused".into(),
        })
        .unwrap();
        let err = solver
            .solve(SolveRequest {
                prompt: "p".into(),
                input: SolveInput::Image {
                    body: Bytes::new(),
                    content_type: "image/png".into(),
                },
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("image input sent to a chat solver"));
    }
}
