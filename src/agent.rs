// SPDX-License-Identifier: MIT

//! Agent wrapper binding the model client and the search capability
//!
//! Presents a single operation: prompt plus images in, markdown text out.
//! When the model asks for a web search, the agent runs it and feeds the
//! results back as a function response before re-invoking the model.

use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{AppConfig, Credential};
use crate::gemini::{Content, FunctionCall, FunctionDeclaration, GeminiClient, Part, ToolDecl};
use crate::preprocess::mime_for_extension;
use crate::search::WebSearch;
use crate::{MedscanError, Result};

const WEB_SEARCH_TOOL: &str = "web_search";

/// An image handle the agent can transmit to the model
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    path: PathBuf,
    mime_type: String,
}

impl ImageAttachment {
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Infer the media type from the file extension
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(mime_for_extension)
            .unwrap_or("image/png")
            .to_string();
        Self { path, mime_type }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and base64-encode the image into an inline-data part
    fn to_part(&self) -> Result<Part> {
        let bytes = std::fs::read(&self.path)?;
        let encoded = general_purpose::STANDARD.encode(&bytes);
        Ok(Part::inline_data(self.mime_type.clone(), encoded))
    }
}

/// Façade over the multimodal model and the web-search capability
pub struct MedicalAgent {
    gemini: GeminiClient,
    search: WebSearch,
    model: String,
    max_tool_rounds: u32,
}

impl MedicalAgent {
    pub fn new(config: &AppConfig, credential: &Credential) -> Self {
        Self::with_clients(
            GeminiClient::new(&config.engine, credential),
            WebSearch::new(&config.search),
            &config.engine.model,
            config.engine.max_tool_rounds,
        )
    }

    /// Assemble an agent from pre-built clients (tests point these at mocks)
    pub fn with_clients(
        gemini: GeminiClient,
        search: WebSearch,
        model: &str,
        max_tool_rounds: u32,
    ) -> Self {
        Self {
            gemini,
            search,
            model: model.to_string(),
            max_tool_rounds,
        }
    }

    fn tool_declarations() -> Vec<ToolDecl> {
        vec![ToolDecl {
            function_declarations: vec![FunctionDeclaration {
                name: WEB_SEARCH_TOOL.to_string(),
                description: "Search the web for information using DuckDuckGo. Returns organic \
                              search results including title, URL, and snippet for each result."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query"
                        }
                    },
                    "required": ["query"]
                }),
            }],
        }]
    }

    /// Generate a markdown report for `prompt` plus zero or more images.
    ///
    /// Runs a bounded function-calling loop; every fault propagates as a
    /// typed error so the orchestration boundary formats the user message.
    pub async fn analyze(&self, prompt: &str, images: &[ImageAttachment]) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(MedscanError::InvalidArgument(
                "prompt cannot be empty".to_string(),
            ));
        }

        let mut parts = vec![Part::text(prompt)];
        for image in images {
            parts.push(image.to_part()?);
        }

        let mut contents = vec![Content::user(parts)];
        let tools = Self::tool_declarations();

        for _round in 0..=self.max_tool_rounds {
            let turn = self.gemini.generate(&self.model, &contents, Some(&tools)).await?;

            let calls: Vec<FunctionCall> =
                turn.function_calls().into_iter().cloned().collect();
            if calls.is_empty() {
                return Ok(turn.text());
            }

            info!("Model requested {} tool call(s)", calls.len());

            let mut responses = Vec::with_capacity(calls.len());
            for call in &calls {
                let outcome = self.dispatch(call).await?;
                responses.push(Part::function_response(call.name.clone(), outcome));
            }

            // Echo the model's turn, then answer it
            contents.push(turn);
            contents.push(Content::user(responses));
        }

        Err(MedscanError::Provider(format!(
            "model produced no text after {} tool rounds",
            self.max_tool_rounds
        )))
    }

    async fn dispatch(&self, call: &FunctionCall) -> Result<serde_json::Value> {
        match call.name.as_str() {
            WEB_SEARCH_TOOL => {
                let query = call.args.get("query").and_then(|v| v.as_str()).ok_or_else(|| {
                    MedscanError::InvalidArgument(
                        "web_search call is missing the query argument".to_string(),
                    )
                })?;
                info!("Executing web search: {}", query);
                let results = self.search.search(query).await?;
                Ok(json!({ "results": results }))
            }
            other => {
                warn!("Model requested unknown tool: {}", other);
                Ok(json!({ "error": format!("unknown tool: {}", other) }))
            }
        }
    }
}
