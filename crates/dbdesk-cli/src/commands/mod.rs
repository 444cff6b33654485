pub mod normalize;
pub mod redact;
pub mod serve;
pub mod shortcuts;

use anyhow::{Context, Result};
use dbdesk_config::Config;
use serde_json::Value;
use std::io::Read;
use std::path::Path;

/// Read a JSON document from `file`, or from stdin when no file is given
pub fn read_json_input(file: Option<&Path>) -> Result<Value> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    serde_json::from_str(&text).context("Input is not valid JSON")
}

pub fn show_config() -> Result<()> {
    let config = Config::load()?;
    println!("Config file: {}", Config::config_path().display());
    println!();
    println!("Server:  {}:{}", config.server.host, config.server.port);
    println!("Read-only: {}", config.server.read_only);
    println!("Model:   {}", config.ai.model);
    println!(
        "API key: {} ({})",
        config.ai.api_key_env,
        if std::env::var(&config.ai.api_key_env).is_ok_and(|v| !v.is_empty()) {
            "set"
        } else {
            "not set"
        }
    );
    Ok(())
}
