// SPDX-License-Identifier: MIT

//! Medscan: AI-powered medical image analysis
//!
//! Uploads go through a fixed diagnostic prompt to a hosted multimodal
//! model, with web-search grounding for the research-context section.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use medscan::analysis::ImageAnalyzer;
use medscan::config::Credential;
use medscan::gemini::GeminiClient;
use medscan::web;
use medscan::{AppConfig, Result};

/// Medscan CLI - AI medical image analysis
#[derive(Parser, Debug)]
#[command(name = "medscan")]
#[command(version = "0.2.0")]
#[command(about = "AI-powered medical image analysis with web UI", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web UI (default)
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Open browser automatically
        #[arg(long)]
        open: bool,
    },

    /// Analyze a single image file and print the markdown report
    Analyze {
        /// Image file to analyze
        path: PathBuf,
    },

    /// Show provider status and available models
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Serve { host, port, open }) => run_serve(config, host, port, open).await,
        Some(Commands::Analyze { path }) => run_analyze(config, path).await,
        Some(Commands::Status) => run_status(config).await,
        None => run_serve(config, None, None, false).await,
    }
}

/// Start the web UI
async fn run_serve(
    mut config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
    open: bool,
) -> Result<()> {
    if let Some(host) = host {
        config.web.host = host;
    }
    if let Some(port) = port {
        config.web.port = port;
    }

    // Startup precondition: no credential, no UI
    let credential = Credential::from_env()?;

    let client = GeminiClient::new(&config.engine, &credential);
    info!("Checking provider availability...");
    match client.health_check().await {
        Ok(()) => {
            info!("Provider reachable");
            match client.model_available(&config.engine.model).await {
                Ok(true) => info!("Model '{}' available", config.engine.model),
                Ok(false) => warn!(
                    "Model '{}' not found in provider listing",
                    config.engine.model
                ),
                Err(e) => warn!("Could not list models: {}", e),
            }
        }
        Err(e) => warn!("Provider not reachable yet: {}", e),
    }

    if open {
        let url = format!("http://{}:{}", config.web.host, config.web.port);
        if let Err(e) = open_browser(&url) {
            warn!("Failed to open browser: {}", e);
        }
    }

    web::start_server(config, &credential).await
}

/// One-shot analysis from the command line
async fn run_analyze(config: AppConfig, path: PathBuf) -> Result<()> {
    let credential = Credential::from_env()?;
    let analyzer = ImageAnalyzer::new(&config, &credential);

    let report = analyzer.run(&path).await?;
    println!("{}", report);

    Ok(())
}

/// Provider status check
async fn run_status(config: AppConfig) -> Result<()> {
    let credential = Credential::from_env()?;
    let client = GeminiClient::new(&config.engine, &credential);

    println!("Medscan v0.2.0 Status");
    println!("=====================");

    match client.health_check().await {
        Ok(()) => println!("Provider: Reachable"),
        Err(e) => println!("Provider: Error - {}", e),
    }

    match client.list_models().await {
        Ok(models) => {
            println!("\nAvailable models:");
            for m in &models {
                let marker = if m == &config.engine.model { "→" } else { " " };
                println!("  {} {}", marker, m);
            }
        }
        Err(e) => println!("  Error listing models: {}", e),
    }

    println!("\nConfiguration:");
    println!("  Engine URL: {}", config.engine.url);
    println!("  Model: {}", config.engine.model);
    println!("  Web UI: {}:{}", config.web.host, config.web.port);

    Ok(())
}

fn open_browser(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_is_serve() {
        let cli = Cli::try_parse_from(["medscan"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_serve_command() {
        let cli = Cli::try_parse_from(["medscan", "serve", "--port", "9000", "--open"]).unwrap();
        match cli.command {
            Some(Commands::Serve { port, open, .. }) => {
                assert_eq!(port, Some(9000));
                assert!(open);
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_analyze_command() {
        let cli = Cli::try_parse_from(["medscan", "analyze", "/tmp/scan.png"]).unwrap();
        match cli.command {
            Some(Commands::Analyze { path }) => {
                assert_eq!(path, PathBuf::from("/tmp/scan.png"));
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_cli_global_config_flag() {
        let cli = Cli::try_parse_from(["medscan", "status", "--config", "custom.json"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("custom.json"));
    }
}
