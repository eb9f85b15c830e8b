//! Main module for the VimAssist CLI application (`vimassist`).
//!
//! Parses the command line, loads the settings and the session record, and
//! runs one editor action. Results go to stdout, diagnostics to stderr; the
//! exit status is 0 on success and 1 on failure.
//!
//! # Examples
//!
//! ```sh
//! vimassist init
//! vimassist update-docs ~/notes
//! vimassist ask "Which note covers the release process?"
//! vimassist revise --selected "Teh cat sat." --request "Fix the typo"
//! ```

use clap::Parser;
use once_cell::sync::OnceCell;
use std::{
    error::Error,
    fs,
    io::{self, Read},
    path::Path,
    process::ExitCode,
};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use vim_assist::{
    actions::Assist,
    api::OpenAiClient,
    commands::{Cli, Commands},
    config::{self, VimAssistConfig},
    config_dir, expand_home, pretty,
    reviser::{self, RevisionRequest},
    state::StateStore,
};

static TRACING: OnceCell<()> = OnceCell::new();

/// Environment variable holding the log filter, e.g. `VIMASSIST_LOG=debug`.
const LOG_ENV: &str = "VIMASSIST_LOG";

fn main() -> ExitCode {
    TRACING.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    });

    let cli = Cli::parse();
    let result = tokio::runtime::Runtime::new()
        .map_err(Box::<dyn Error>::from)
        .and_then(|runtime| runtime.block_on(run(cli)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("vimassist: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Load the settings and the record location, then run the parsed command.
///
/// # Errors
///
/// Returns an error if the settings cannot be loaded, if no API key is
/// available for a command that needs one, or if the command itself fails.
async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config_dir()?.join("config.yaml"),
    };
    let state_dir = match &cli.state_dir {
        Some(dir) => dir.clone(),
        None => config_dir()?,
    };
    let store = StateStore::in_dir(&state_dir);
    debug!("Session record at {}", store.path().display());

    match cli.command {
        Commands::Init => init(&config_path, &store),
        Commands::Status => status(&store),
        command => {
            let vim_config = if cli.config.is_some() {
                config::load_config(&config_path)?
            } else {
                config::load_config_or_default(&config_path)?
            };
            perform(command, &vim_config, &store).await
        }
    }
}

/// Run one of the commands that talk to the remote service.
async fn perform(
    command: Commands,
    vim_config: &VimAssistConfig,
    store: &StateStore,
) -> Result<(), Box<dyn Error>> {
    let client = OpenAiClient::new(vim_config)?;
    let assist = Assist::new(&client, vim_config, store);

    match command {
        Commands::UpdateDocs { doc_dir, strategy } => {
            let doc_dir = expand_home(&doc_dir);
            let strategy = strategy.unwrap_or(vim_config.sync_strategy);
            info!("Updating documents from {} ({:?})", doc_dir.display(), strategy);
            let report = assist.update_docs(&doc_dir, strategy).await?;
            println!("{}", pretty::format_sync_report(&report));
        }
        Commands::Ask { message, pretty: markdown } => {
            if message.trim().is_empty() {
                println!();
                return Ok(());
            }
            let answer = assist.ask(&message).await?;
            pretty::print_answer(&answer, markdown)?;
        }
        Commands::ListDocs => {
            for document in assist.list_docs().await? {
                println!("{}", pretty::format_document(&document));
            }
        }
        Commands::Revise {
            selected,
            before,
            after,
            request,
            stdin,
        } => {
            let request = if stdin {
                read_revision_request()?
            } else {
                RevisionRequest {
                    selected_text: selected,
                    text_before: before,
                    text_after: after,
                    instruction: request.unwrap_or_default(),
                }
            };
            if request.instruction.trim().is_empty() {
                println!();
                return Ok(());
            }
            let revision = reviser::try_revise(&client, &vim_config.model, &request).await?;
            println!("{revision}");
        }
        Commands::NewThread => {
            let thread_id = assist.new_thread().await?;
            println!("{thread_id}");
        }
        other => return Err(format!("{other:?} is handled without the service").into()),
    }

    Ok(())
}

/// Print the session record and when it was last saved.
fn status(store: &StateStore) -> Result<(), Box<dyn Error>> {
    let state = store.load_or_create()?;
    let saved = fs::metadata(store.path()).and_then(|m| m.modified()).ok();
    println!("{}", pretty::format_status(&state, store.path(), saved));
    Ok(())
}

/// The revision request as JSON on stdin, the way the editor sends multi-line text.
fn read_revision_request() -> Result<RevisionRequest, Box<dyn Error>> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    let request = serde_json::from_str(&input)
        .map_err(|e| format!("Invalid revision request on stdin: {e}"))?;
    Ok(request)
}

/// Write the default settings file (unless one exists) and an empty session record.
///
/// # Errors
///
/// Returns an error if there is an issue creating the directories or files, or
/// serializing the settings to YAML.
fn init(config_path: &Path, store: &StateStore) -> Result<(), Box<dyn Error>> {
    if config_path.exists() {
        println!("Settings already exist at {}", config_path.display());
    } else {
        if let Some(parent) = config_path.parent() {
            info!("Creating config directory: {}", parent.display());
            fs::create_dir_all(parent)?;
        }
        let config_yaml = serde_yaml::to_string(&VimAssistConfig::default())?;
        fs::write(config_path, config_yaml)?;
        println!("Wrote default settings to {}", config_path.display());
    }

    store.load_or_create()?;
    println!("Session record at {}", store.path().display());
    Ok(())
}
