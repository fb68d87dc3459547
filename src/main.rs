use clap::{Parser, Subcommand};
use pdf_chat::Result;
use pdf_chat::commands::{ask, chat, clear, ingest, show_status, summarize};
use pdf_chat::config::{run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdf-chat")]
#[command(about = "Chat with your PDF documents from the terminal")]
#[command(version)]
struct Cli {
    /// Gemini API key (overrides GEMINI_API_KEY and the config file)
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure API access, chat, and chunking settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest a PDF file into the vector store
    Ingest {
        /// Path to the PDF file
        file: PathBuf,
    },
    /// Ask a single question about the ingested documents
    Ask {
        /// The question to answer
        question: String,
    },
    /// Start an interactive chat session
    Chat {
        /// Ingest this PDF before the session starts
        #[arg(long)]
        ingest: Option<PathBuf>,
    },
    /// Summarize everything that has been ingested
    Summarize,
    /// Show the store location and ingested documents
    Status,
    /// Delete all ingested documents
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest { file } => {
            ingest(file, cli.api_key).await?;
        }
        Commands::Ask { question } => {
            ask(question, cli.api_key).await?;
        }
        Commands::Chat { ingest } => {
            chat(ingest, cli.api_key).await?;
        }
        Commands::Summarize => {
            summarize(cli.api_key).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
        Commands::Clear { yes } => {
            clear(yes).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["pdf-chat", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Status);
        }
    }

    #[test]
    fn ingest_command_with_file() {
        let cli = Cli::try_parse_from(["pdf-chat", "ingest", "manual.pdf"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { file } = parsed.command {
                assert_eq!(file, PathBuf::from("manual.pdf"));
            }
        }
    }

    #[test]
    fn ask_command_takes_a_question() {
        let cli = Cli::try_parse_from(["pdf-chat", "ask", "What is chapter 3 about?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { question } = parsed.command {
                assert_eq!(question, "What is chapter 3 about?");
            }
        }
    }

    #[test]
    fn api_key_is_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from(["pdf-chat", "chat", "--api-key", "secret"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.api_key, Some("secret".to_string()));
        }
    }

    #[test]
    fn chat_accepts_an_ingest_file() {
        let cli = Cli::try_parse_from(["pdf-chat", "chat", "--ingest", "notes.pdf"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Chat { ingest } = parsed.command {
                assert_eq!(ingest, Some(PathBuf::from("notes.pdf")));
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["pdf-chat", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn clear_skips_confirmation_with_yes() {
        let cli = Cli::try_parse_from(["pdf-chat", "clear", "--yes"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Clear { yes } = parsed.command {
                assert!(yes);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["pdf-chat", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["pdf-chat", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
