// SPDX-License-Identifier: MIT

//! Gemini API client for hosted multimodal inference

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::{Credential, EngineConfig};
use crate::{MedscanError, Result};

/// Gemini `generateContent` API client
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// One conversation turn: a role plus its parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// A single content part. Exactly one field is expected to be set;
/// the wire format is protobuf-JSON camelCase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: serde_json::Value,
}

/// Tool advertisement carried alongside the contents
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDecl {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDecl]>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }

    /// Concatenated text of all text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.parts
            .iter()
            .filter_map(|p| p.function_call.as_ref())
            .collect()
    }
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
            ..Self::default()
        }
    }

    pub fn function_response(name: impl Into<String>, response: serde_json::Value) -> Self {
        Self {
            function_response: Some(FunctionResponse {
                name: name.into(),
                response,
            }),
            ..Self::default()
        }
    }
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(engine: &EngineConfig, credential: &Credential) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(engine.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        let base_url = engine.url.trim_end_matches('/').to_string();

        Self {
            client,
            base_url,
            api_key: credential.expose().to_string(),
        }
    }

    /// Check that the provider answers at all
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/v1beta/models", self.base_url);

        self.client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                MedscanError::Provider(format!("Cannot reach {}: {}", self.base_url, e))
            })?;

        Ok(())
    }

    /// List available model names
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/v1beta/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let models: ModelsResponse = response.json().await?;
        Ok(models
            .models
            .into_iter()
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }

    /// Check if a specific model is available
    pub async fn model_available(&self, model: &str) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| m == model || m.starts_with(model)))
    }

    /// Run one `generateContent` round and return the model's turn
    pub async fn generate(
        &self,
        model: &str,
        contents: &[Content],
        tools: Option<&[ToolDecl]>,
    ) -> Result<Content> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let request = GenerateRequest { contents, tools };

        debug!("Sending generate request: model={}", model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MedscanError::Provider(format!(
                "Gemini returned status {}: {}",
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        let result: GenerateResponse = response.json().await?;
        result
            .candidates
            .into_iter()
            .find_map(|c| c.content)
            .ok_or_else(|| MedscanError::Provider("No candidates in response".to_string()))
    }
}
