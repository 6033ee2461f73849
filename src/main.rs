// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use riddlebook::blob::S3BlobStore;
use riddlebook::config::{self, Config};
use riddlebook::identity::{Actor, StaticIdentity};
use riddlebook::logging::init_logging;
use riddlebook::riddle::{validate, RiddleDraft, RiddleSnapshot};
use riddlebook::store::SqliteDocumentStore;
use riddlebook::{RiddleEditor, SaveRequest};
use std::path::Path;
use std::process;
use tracing::{error, info};

type Editor = RiddleEditor<SqliteDocumentStore, S3BlobStore, StaticIdentity>;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.toml",
        global = true
    )]
    config: String,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a riddle draft without writing anything
    Validate {
        /// Draft file (JSON)
        draft: String,

        /// Validate as an edit of this persisted riddle
        #[arg(long, requires = "book")]
        riddle: Option<String>,

        #[arg(long)]
        book: Option<String>,
    },
    /// Create a book
    CreateBook { name: String },
    /// List books, newest first
    Books,
    /// List the riddles of a book, newest first
    Riddles { book: String },
    /// Print a persisted riddle as an editable draft
    Show { book: String, riddle: String },
    /// Save a riddle draft, creating it unless --riddle is given
    Save {
        book: String,

        /// Draft file (JSON); relative media paths resolve against its directory
        draft: String,

        #[arg(long)]
        riddle: Option<String>,
    },
    /// Delete a riddle with its hints and media
    Delete { book: String, riddle: String },
    /// Print the riddle every time it changes
    Watch { book: String, riddle: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(&cli.config)?;
    let _log_guard = init_logging(config.logging.as_ref(), cli.verbose)?;

    info!("Riddlebook v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from: {}", cli.config);

    let result = match cli.command {
        Commands::Validate {
            draft,
            riddle,
            book,
        } => validate_draft(config, &draft, book, riddle).await,
        Commands::CreateBook { name } => create_book(config, &name).await,
        Commands::Books => list_books(config).await,
        Commands::Riddles { book } => list_riddles(config, &book).await,
        Commands::Show { book, riddle } => show_riddle(config, &book, &riddle).await,
        Commands::Save {
            book,
            draft,
            riddle,
        } => save_riddle(config, &book, &draft, riddle).await,
        Commands::Delete { book, riddle } => delete_riddle(config, &book, &riddle).await,
        Commands::Watch { book, riddle } => watch_riddle(config, &book, &riddle).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }
    Ok(())
}

fn initialize_editor(config: &Config) -> Result<Editor> {
    let store = SqliteDocumentStore::new(&config.store.path)?;
    let blobs = S3BlobStore::new(&config.blob)?;
    let identity = match &config.identity.uid {
        Some(uid) => {
            let mut actor = Actor::new(uid.clone());
            if let Some(display_name) = &config.identity.display_name {
                actor = actor.with_display_name(display_name.clone());
            }
            StaticIdentity::signed_in(actor)
        }
        None => StaticIdentity::signed_out(),
    };

    info!("Editor initialized with store {}", config.store.path);
    Ok(RiddleEditor::new(store, blobs, identity))
}

/// Read a draft file and resolve its media paths against the file's directory
async fn read_draft(path: &str) -> Result<RiddleDraft> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read draft {}", path))?;
    let mut draft: RiddleDraft =
        serde_json::from_str(&text).with_context(|| format!("Failed to parse draft {}", path))?;
    if let Some(base_dir) = Path::new(path).parent() {
        draft.resolve_files(base_dir);
    }
    Ok(draft)
}

async fn load_existing(
    editor: &Editor,
    book: &str,
    riddle: Option<&str>,
) -> Result<Option<RiddleSnapshot>> {
    match riddle {
        Some(riddle) => Ok(Some(editor.load_riddle(book, riddle).await?)),
        None => Ok(None),
    }
}

async fn validate_draft(
    config: Config,
    draft_path: &str,
    book: Option<String>,
    riddle: Option<String>,
) -> Result<()> {
    let draft = read_draft(draft_path).await?;
    let existing = match (book, riddle) {
        (Some(book), Some(riddle)) => {
            let editor = initialize_editor(&config)?;
            load_existing(&editor, &book, Some(&riddle)).await?
        }
        _ => None,
    };

    let edit = validate(&draft, existing.as_ref())?;
    println!(
        "Draft is valid: \"{}\" with {} hints",
        edit.name,
        edit.hints.len()
    );
    Ok(())
}

async fn create_book(config: Config, name: &str) -> Result<()> {
    let editor = initialize_editor(&config)?;
    let book = editor.create_book(name).await?;
    println!("{}\t{}", book.id, book.name);
    Ok(())
}

async fn list_books(config: Config) -> Result<()> {
    let editor = initialize_editor(&config)?;
    for book in editor.list_books().await? {
        println!(
            "{}\t{}\t{}",
            book.id,
            book.name,
            book.created_at.unwrap_or_default()
        );
    }
    Ok(())
}

async fn list_riddles(config: Config, book: &str) -> Result<()> {
    let editor = initialize_editor(&config)?;
    for riddle in editor.list_riddles(book).await? {
        println!(
            "{}\t{}\t{}",
            riddle.id,
            riddle.name,
            riddle.updated_at.unwrap_or_default()
        );
    }
    Ok(())
}

async fn show_riddle(config: Config, book: &str, riddle: &str) -> Result<()> {
    let editor = initialize_editor(&config)?;
    let snapshot = editor.load_riddle(book, riddle).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot.to_draft())?);
    Ok(())
}

async fn save_riddle(
    config: Config,
    book: &str,
    draft_path: &str,
    riddle: Option<String>,
) -> Result<()> {
    let editor = initialize_editor(&config)?;
    let draft = read_draft(draft_path).await?;
    let request = match load_existing(&editor, book, riddle.as_deref()).await? {
        Some(previous) => SaveRequest::edit(previous, draft),
        None => SaveRequest::create(book, draft),
    };

    let outcome = editor
        .start_save(request)
        .finish_with(|event| println!("{}", event.label()))
        .await?;
    println!(
        "Saved riddle {}: {} hints created, {} updated, {} deleted, {} unchanged",
        outcome.riddle_id,
        outcome.created.len(),
        outcome.updated.len(),
        outcome.deleted.len(),
        outcome.unchanged.len()
    );
    Ok(())
}

async fn delete_riddle(config: Config, book: &str, riddle: &str) -> Result<()> {
    let editor = initialize_editor(&config)?;
    let outcome = editor.delete_riddle(book, riddle).await?;
    println!(
        "Deleted riddle {} with {} hints and {} media files",
        riddle, outcome.hints_deleted, outcome.blobs_deleted
    );
    Ok(())
}

async fn watch_riddle(config: Config, book: &str, riddle: &str) -> Result<()> {
    let editor = initialize_editor(&config)?;
    let mut watch = editor.watch_riddle(book, riddle).await;
    for e in watch.errors() {
        error!("{}", e);
    }

    while watch.changed().await {
        match watch.snapshot() {
            Some(snapshot) => {
                println!("{}", serde_json::to_string_pretty(&snapshot.to_draft())?)
            }
            None => println!("riddle {} does not exist", riddle),
        }
    }
    Ok(())
}
