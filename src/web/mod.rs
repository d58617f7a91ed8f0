// SPDX-License-Identifier: MIT

//! Web UI for Medscan
//!
//! Serves the single analysis page and the upload endpoint. The reply to
//! an analysis request is always a renderable JSON body; faults surface as
//! an error string in the report field, never as a failed response.

use axum::{
    extract::{Multipart, State},
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::analysis::ImageAnalyzer;
use crate::config::{AppConfig, Credential};
use crate::gemini::GeminiClient;
use crate::preprocess::SUPPORTED_EXTENSIONS;
use crate::scratch::ScratchFile;
use crate::{MedscanError, Result};

/// Shared application state
pub struct AppState {
    pub analyzer: ImageAnalyzer,
    pub provider: GeminiClient,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, credential: &Credential) -> Self {
        Self {
            analyzer: ImageAnalyzer::new(&config, credential),
            provider: GeminiClient::new(&config.engine, credential),
            config,
        }
    }
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/api/analyze", post(api_analyze))
        .route("/api/health", get(api_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Handlers ===

async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Serialize)]
struct AnalyzeResponse {
    report: String,
}

async fn api_analyze(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Json<AnalyzeResponse> {
    let report = match receive_upload(&state.config, &mut multipart).await {
        Ok(upload) => state.analyzer.analyze(upload.path()).await,
        // Bad uploads get the same renderable treatment as analysis faults
        Err(e) => format!("Analysis error: {}", e),
    };
    Json(AnalyzeResponse { report })
}

#[derive(Serialize)]
struct HealthResponse {
    provider_ok: bool,
    model: String,
}

async fn api_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        provider_ok: state.provider.health_check().await.is_ok(),
        model: state.config.engine.model.clone(),
    })
}

/// Persist the uploaded image to a scratch file named from its declared
/// media subtype. The guard removes the file once analysis finishes.
async fn receive_upload(config: &AppConfig, multipart: &mut Multipart) -> Result<ScratchFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MedscanError::InvalidArgument(format!("malformed upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let subtype = subtype_for_upload(&content_type)?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| MedscanError::InvalidArgument(format!("upload read failed: {}", e)))?;
        if bytes.is_empty() {
            return Err(MedscanError::InvalidArgument("uploaded file is empty".to_string()));
        }

        return ScratchFile::create(&config.scratch_dir(), "medscan_upload", subtype, &bytes);
    }

    Err(MedscanError::InvalidArgument(
        "no file field in upload".to_string(),
    ))
}

/// Validate the declared media type against the supported raster formats
fn subtype_for_upload(content_type: &str) -> Result<&'static str> {
    let subtype = content_type
        .strip_prefix("image/")
        .ok_or_else(|| {
            MedscanError::InvalidArgument(format!(
                "unsupported upload type: {:?}",
                content_type
            ))
        })?
        .to_ascii_lowercase();

    SUPPORTED_EXTENSIONS
        .iter()
        .find(|ext| **ext == subtype)
        .copied()
        .ok_or_else(|| {
            MedscanError::InvalidArgument(format!("unsupported image format: {}", subtype))
        })
}

/// Start the web server
pub async fn start_server(config: AppConfig, credential: &Credential) -> Result<()> {
    let addr = format!("{}:{}", config.web.host, config.web.port);
    let state = Arc::new(AppState::new(config, credential));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Web UI available at http://{}", addr);

    let router = create_router(state);
    axum::serve(listener, router).await?;

    Ok(())
}

// === Page ===

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Medscan - Medical Image Analysis</title>
    <script src="https://cdn.jsdelivr.net/npm/marked/marked.min.js"></script>
    <style>
        :root {
            --bg-primary: #f4f7fa;
            --bg-card: #ffffff;
            --text-primary: #1c2733;
            --text-secondary: #5f7285;
            --accent: #0f6fb8;
            --accent-hover: #0b5a96;
            --warning-bg: #fdf3dc;
            --warning-border: #e4c363;
            --border: #d7e0e8;
        }
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }
        .container { max-width: 860px; margin: 0 auto; padding: 24px; }
        header {
            background: var(--bg-card);
            padding: 18px 24px;
            border-bottom: 1px solid var(--border);
        }
        header .logo { font-size: 1.4em; font-weight: bold; color: var(--accent); }
        header .tagline { color: var(--text-secondary); font-size: 0.95em; }
        .card {
            background: var(--bg-card);
            border: 1px solid var(--border);
            border-radius: 10px;
            padding: 20px;
            margin-bottom: 20px;
        }
        .card h2 { margin-bottom: 12px; color: var(--accent); font-size: 1.1em; }
        .notice {
            background: var(--warning-bg);
            border: 1px solid var(--warning-border);
            border-radius: 8px;
            padding: 12px 16px;
        }
        #preview { max-width: 100%; border-radius: 8px; display: none; margin-top: 12px; }
        button {
            background: var(--accent);
            color: white;
            border: none;
            border-radius: 8px;
            padding: 10px 22px;
            font-size: 1em;
            cursor: pointer;
        }
        button:hover { background: var(--accent-hover); }
        button:disabled { opacity: 0.5; cursor: default; }
        #spinner {
            display: none;
            color: var(--text-secondary);
            margin-top: 12px;
        }
        #spinner::before {
            content: "";
            display: inline-block;
            width: 14px; height: 14px;
            margin-right: 8px;
            border: 2px solid var(--border);
            border-top-color: var(--accent);
            border-radius: 50%;
            vertical-align: -2px;
            animation: spin 0.8s linear infinite;
        }
        @keyframes spin { to { transform: rotate(360deg); } }
        #report { display: none; }
        #report h1, #report h2, #report h3 { margin: 14px 0 6px; }
        #report ul, #report ol { margin: 6px 0 6px 24px; }
        #report a { color: var(--accent); }
    </style>
</head>
<body>
    <header>
        <div class="logo">Medscan</div>
        <div class="tagline">Upload a medical image (X-ray, MRI, CT, Ultrasound, ...) for AI-assisted analysis</div>
    </header>
    <main class="container">
        <div class="card">
            <h2>Upload</h2>
            <input type="file" id="file" accept=".jpg,.jpeg,.png,.bmp,.gif">
            <img id="preview" alt="Uploaded image">
            <div style="margin-top: 14px;">
                <button id="analyze" disabled>Analyze Image</button>
            </div>
            <div id="spinner">Analyzing the image... please wait.</div>
        </div>
        <div class="notice" id="upload-notice">Please upload a medical image to begin analysis.</div>
        <div class="card" id="report-card" style="display: none;">
            <h2>Analysis Report</h2>
            <div id="report"></div>
        </div>
    </main>
    <script>
        const fileInput = document.getElementById('file');
        const preview = document.getElementById('preview');
        const analyzeBtn = document.getElementById('analyze');
        const spinner = document.getElementById('spinner');
        const notice = document.getElementById('upload-notice');
        const reportCard = document.getElementById('report-card');
        const report = document.getElementById('report');

        // Idle -> FileSelected
        fileInput.addEventListener('change', () => {
            const file = fileInput.files[0];
            if (!file) {
                analyzeBtn.disabled = true;
                preview.style.display = 'none';
                notice.style.display = 'block';
                return;
            }
            preview.src = URL.createObjectURL(file);
            preview.style.display = 'block';
            analyzeBtn.disabled = false;
            notice.style.display = 'none';
            reportCard.style.display = 'none';
        });

        // FileSelected -> Analyzing -> ReportDisplayed
        analyzeBtn.addEventListener('click', async () => {
            const file = fileInput.files[0];
            if (!file) return;

            analyzeBtn.disabled = true;
            spinner.style.display = 'block';
            reportCard.style.display = 'none';

            try {
                const body = new FormData();
                body.append('file', file);
                const response = await fetch('/api/analyze', { method: 'POST', body });
                const data = await response.json();
                report.innerHTML = marked.parse(data.report);
            } catch (e) {
                report.textContent = 'Analysis error: ' + e;
            }

            spinner.style.display = 'none';
            reportCard.style.display = 'block';
            analyzeBtn.disabled = false;
        });
    </script>
</body>
</html>"##;
