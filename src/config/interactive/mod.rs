
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password};

use super::{ChatConfig, Config, GeminiConfig};
use crate::chunking::ChunkingConfig;

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 pdf-chat Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Gemini API Configuration").bold().yellow());
    eprintln!("Configure access to the Google Generative Language API.");
    eprintln!();

    configure_gemini(&mut config.gemini)?;

    eprintln!();
    eprintln!("{}", style("Chat Configuration").bold().yellow());
    configure_chat(&mut config.chat)?;

    eprintln!();
    eprintln!("{}", style("Chunking Configuration").bold().yellow());
    configure_chunking(&mut config.chunking)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_gemini_connection(&config)? {
        eprintln!("{}", style("✓ Gemini API key accepted!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not verify the API key").yellow()
        );
        eprintln!("You can continue, but ingestion and chat will fail until a valid key is set.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());

        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Gemini Settings:").bold().yellow());
    let key_display = config
        .gemini
        .api_key
        .as_deref()
        .map_or_else(|| "(not set)".to_string(), mask_api_key);
    eprintln!("  API Key: {}", style(key_display).cyan());
    eprintln!("  Base URL: {}", style(&config.gemini.base_url).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.gemini.embedding_model).cyan()
    );
    eprintln!("  Chat Model: {}", style(&config.gemini.chat_model).cyan());
    eprintln!("  Batch Size: {}", style(config.gemini.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Chat Settings:").bold().yellow());
    eprintln!("  Response Language: {}", style(&config.chat.language).cyan());

    eprintln!();
    eprintln!("{}", style("Chunking Settings:").bold().yellow());
    eprintln!("  Chunk Size: {}", style(config.chunking.chunk_size).cyan());
    eprintln!(
        "  Chunk Overlap: {}",
        style(config.chunking.chunk_overlap).cyan()
    );

    eprintln!();
    eprintln!(
        "Vector store: {}",
        style(config.store_path().display()).dim()
    );
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load_default().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            let base_dir = Config::default_base_dir()?;
            Ok(Config {
                gemini: GeminiConfig::default(),
                chunking: ChunkingConfig::default(),
                chat: ChatConfig::default(),
                base_dir,
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_gemini(gemini: &mut GeminiConfig) -> Result<()> {
    let key_prompt = if gemini.api_key.is_some() {
        "Gemini API key (leave empty to keep current)"
    } else {
        "Gemini API key (leave empty to rely on GEMINI_API_KEY)"
    };

    let api_key = Password::new()
        .with_prompt(key_prompt)
        .allow_empty_password(true)
        .interact()?;

    if !api_key.trim().is_empty() {
        gemini.api_key = Some(api_key.trim().to_string());
    }

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(gemini.embedding_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(gemini.chat_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding requests")
        .default(gemini.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 100 {
                Err("Batch size must be 100 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    gemini.embedding_model = embedding_model;
    gemini.chat_model = chat_model;
    gemini.batch_size = batch_size;

    Ok(())
}

fn configure_chat(chat: &mut ChatConfig) -> Result<()> {
    let language: String = Input::new()
        .with_prompt("Response language")
        .default(chat.language.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Language cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    chat.language = language.trim().to_string();
    Ok(())
}

fn configure_chunking(chunking: &mut ChunkingConfig) -> Result<()> {
    let chunk_size: usize = Input::new()
        .with_prompt("Segment size (characters)")
        .default(chunking.chunk_size)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if !(200..=8192).contains(input) {
                Err("Chunk size must be between 200 and 8192")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let chunk_overlap: usize = Input::new()
        .with_prompt("Segment overlap (characters)")
        .default(chunking.chunk_overlap.min(chunk_size / 2 - 1))
        .validate_with(move |input: &usize| -> Result<(), &str> {
            if *input >= chunk_size / 2 {
                Err("Overlap must be less than half the chunk size")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    chunking.chunk_size = chunk_size;
    chunking.chunk_overlap = chunk_overlap;

    Ok(())
}

/// Checks the credential against the models listing endpoint. Returns true
/// when the key is accepted, false when it is rejected or the service is
/// unreachable.
fn test_gemini_connection(config: &Config) -> Result<bool> {
    let api_key = match config.resolve_api_key(None) {
        Ok(key) => key,
        Err(_) => return Ok(false),
    };

    let url = config.gemini.api_url()?.join("v1beta/models")?;

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(10)))
        .build()
        .into();

    match agent
        .get(url.as_str())
        .header("x-goog-api-key", &api_key)
        .call()
    {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}

fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
