//! Interactive mode for the server.
//!
//! Prompts for the backend and listen address before starting the server.

use std::path::PathBuf;

use dialoguer::{Confirm, Input};

use crate::ServerError;
use crate::config::AppConfig;

/// Runs the server in interactive mode, prompting for configuration.
///
/// Starts from `config`, asks for a seed CSV (blank for Google Sheets), a
/// bind address, and a port, then delegates to [`super::run_server`].
///
/// # Errors
///
/// Returns [`ServerError`] if the underlying server fails to start.
#[allow(clippy::future_not_send)]
pub async fn run(mut config: AppConfig) -> Result<(), ServerError> {
    println!("Risk Map Server");
    println!();

    let seed: String = Input::new()
        .with_prompt("Seed CSV (blank for Google Sheets)")
        .default(
            config
                .seed_csv
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        )
        .allow_empty(true)
        .interact_text()
        .unwrap_or_default();
    config.seed_csv = Some(seed.trim())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    if config.seed_csv.is_none() {
        let sheet_id: String = Input::new()
            .with_prompt("Spreadsheet id")
            .default(config.sheet_id.clone().unwrap_or_default())
            .allow_empty(true)
            .interact_text()
            .unwrap_or_default();
        config.sheet_id = Some(sheet_id.trim().to_string()).filter(|s| !s.is_empty());
    }

    config.bind_addr = Input::new()
        .with_prompt("Bind address")
        .default(config.bind_addr.clone())
        .interact_text()
        .unwrap_or_else(|_| config.bind_addr.clone());

    config.port = Input::new()
        .with_prompt("Port")
        .default(config.port)
        .interact_text()
        .unwrap_or(config.port);

    if !Confirm::new()
        .with_prompt(format!(
            "Start server on {}:{}?",
            config.bind_addr, config.port
        ))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server(config).await
}
