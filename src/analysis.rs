// SPDX-License-Identifier: MIT

//! Analysis orchestration: preprocess, invoke the agent, clean up

use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::agent::{ImageAttachment, MedicalAgent};
use crate::config::{AppConfig, Credential};
use crate::preprocess;
use crate::Result;

/// Sequences one analysis request end to end.
///
/// Owns the agent and the fixed diagnostic prompt; nothing is shared across
/// requests and the resized scratch image never outlives the call.
pub struct ImageAnalyzer {
    agent: MedicalAgent,
    prompt: String,
    scratch_dir: PathBuf,
}

impl ImageAnalyzer {
    pub fn new(config: &AppConfig, credential: &Credential) -> Self {
        Self::with_agent(MedicalAgent::new(config, credential), config)
    }

    pub fn with_agent(agent: MedicalAgent, config: &AppConfig) -> Self {
        Self {
            agent,
            prompt: config.prompts.analysis.clone(),
            scratch_dir: config.scratch_dir(),
        }
    }

    /// Typed variant: preprocess the image, hand it to the agent with the
    /// diagnostic prompt, return the markdown report.
    pub async fn run(&self, image_path: &Path) -> Result<String> {
        info!("Analyzing image: {:?}", image_path);

        let resized = preprocess::resize_for_analysis(image_path, &self.scratch_dir)?;
        let attachment = ImageAttachment::new(resized.path(), "image/png");

        let report = self.agent.analyze(&self.prompt, &[attachment]).await?;

        info!("Analysis complete ({} chars)", report.len());
        Ok(report)
        // `resized` drops here on every exit path, removing the scratch file
    }

    /// User-facing variant: any fault becomes a renderable error string
    /// instead of propagating out of the presentation layer.
    pub async fn analyze(&self, image_path: &Path) -> String {
        match self.run(image_path).await {
            Ok(report) => report,
            Err(e) => {
                error!("Analysis failed: {}", e);
                format!("Analysis error: {}", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn test_config(engine_url: &str, scratch_dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.engine.url = engine_url.to_string();
        config.scratch_dir = Some(scratch_dir.to_string_lossy().to_string());
        config
    }

    fn analyzer_at(engine_url: &str, scratch_dir: &Path) -> ImageAnalyzer {
        let config = test_config(engine_url, scratch_dir);
        ImageAnalyzer::new(&config, &Credential::new("test-key"))
    }

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::new(width, height).save(&path).unwrap();
        path
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_successful_analysis() {
        let mut server = Server::new_async().await;
        // The generate request must carry the diagnostic prompt and the
        // base64 raster as inline data.
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.0-flash-exp:generateContent")
            .match_query(Matcher::Any)
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("Image Type".to_string()),
                Matcher::Regex("inlineData".to_string()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "candidates": [{
                        "content": {"role": "model", "parts": [{"text": "## Findings\n..."}]}
                    }]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let scratch = tempfile::tempdir().unwrap();
        let upload_dir = tempfile::tempdir().unwrap();
        let source = write_png(upload_dir.path(), "scan.png", 1000, 500);

        let analyzer = analyzer_at(&server.url(), scratch.path());
        let report = analyzer.analyze(&source).await;

        assert_eq!(report, "## Findings\n...");
        mock.assert_async().await;
        assert_eq!(file_count(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_error_string() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", Matcher::Any)
            .with_status(500)
            .with_body("backend exploded")
            .create_async()
            .await;

        let scratch = tempfile::tempdir().unwrap();
        let upload_dir = tempfile::tempdir().unwrap();
        let source = write_png(upload_dir.path(), "scan.png", 800, 600);

        let analyzer = analyzer_at(&server.url(), scratch.path());
        let report = analyzer.analyze(&source).await;

        assert!(report.starts_with("Analysis error: "));
        assert_eq!(file_count(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_corrupt_upload_reported_without_model_call() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let scratch = tempfile::tempdir().unwrap();
        let upload_dir = tempfile::tempdir().unwrap();
        let source = upload_dir.path().join("scan.png");
        std::fs::write(&source, b"definitely not a png").unwrap();

        let analyzer = analyzer_at(&server.url(), scratch.path());
        let report = analyzer.analyze(&source).await;

        assert!(report.starts_with("Analysis error: "));
        mock.assert_async().await;
        assert_eq!(file_count(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_typed_error_from_run() {
        let scratch = tempfile::tempdir().unwrap();
        let upload_dir = tempfile::tempdir().unwrap();
        let source = upload_dir.path().join("missing.png");

        let analyzer = analyzer_at("http://unused", scratch.path());
        let err = analyzer.run(&source).await.unwrap_err();

        match err {
            crate::MedscanError::Image(_) | crate::MedscanError::FileSystem(_) => {}
            other => panic!("Expected preprocessing fault, got {:?}", other),
        }
    }
}
