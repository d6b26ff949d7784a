//! Folio command-line front end.
//!
//! Usage:
//!   folio list
//!   folio show <note>
//!   folio export <note>
//!   folio edit <note> <script.json> [--title TITLE]
//!   folio config
//!
//! An edit script is a JSON array of steps. Each step is an editor command,
//! optionally with the caret to run it at (block by index):
//!
//! ```json
//! [
//!   {"command": "insert_text", "text": "Shopping", "cursor": {"block": 0, "offset": 0}},
//!   {"command": "toggle_format", "kind": "bold", "cursor": {"block": 0, "offset": 0, "selection_end": 8}},
//!   {"command": "insert_block", "kind": "todoList"},
//!   {"command": "edit_payload", "edit": {"op": "add_item", "text": "milk"}}
//! ]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use folio_doc::{markdown, wire, BlockDocument, Command, CursorState};
use folio_store::{FolioConfig, NoteSession, NoteStorage, SqliteNoteStore};
use folio_types::NoteId;
use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Block-structured notes.
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Edit and inspect Folio notes")]
struct Args {
    /// SQLite database (default: <data dir>/folio/notes.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file in RON (default: <config dir>/folio/config.ron)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List stored notes, newest first
    List,
    /// Print a note as markdown
    Show { note: String },
    /// Print a note's stored record as JSON
    Export { note: String },
    /// Apply a JSON script of editor commands to a note and save it
    Edit {
        note: String,
        script: PathBuf,
        /// Set the note title
        #[arg(long)]
        title: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

/// One scripted editor command.
#[derive(Debug, Deserialize)]
struct Step {
    #[serde(default)]
    cursor: Option<StepCursor>,
    #[serde(flatten)]
    command: Command,
}

/// Caret position by block index.
#[derive(Debug, Deserialize)]
struct StepCursor {
    block: usize,
    #[serde(default)]
    offset: usize,
    #[serde(default)]
    selection_end: Option<usize>,
}

impl StepCursor {
    fn resolve(&self, doc: &BlockDocument) -> Result<CursorState> {
        let Some(block) = doc.blocks().get(self.block) else {
            bail!("cursor block {} out of range ({} blocks)", self.block, doc.block_count());
        };
        Ok(CursorState {
            block_id: block.id,
            offset: self.offset,
            selection_end: self.selection_end,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let config = FolioConfig::load_or_default(config_path.as_deref())
        .context("failed to load config")?;

    if let Cmd::Config = args.command {
        print!("{}", config.to_ron()?);
        return Ok(());
    }

    let db_path = match args.db.clone() {
        Some(path) => path,
        None => default_db_path()?,
    };
    let store = Arc::new(
        SqliteNoteStore::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?,
    );

    match args.command {
        Cmd::List => cmd_list(&store),
        Cmd::Show { note } => cmd_show(store, &note).await,
        Cmd::Export { note } => cmd_export(store, &note).await,
        Cmd::Edit { note, script, title } => {
            cmd_edit(store, &config, &note, &script, title).await
        }
        Cmd::Config => Ok(()),
    }
}

fn default_db_path() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("folio");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(dir.join("notes.db"))
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("folio").join("config.ron"))
}

fn cmd_list(store: &SqliteNoteStore) -> Result<()> {
    for note in store.list()? {
        println!("{}\t{}", note.id, note.title);
    }
    Ok(())
}

async fn cmd_show(store: Arc<SqliteNoteStore>, note: &str) -> Result<()> {
    let note_id = NoteId::parse(note)?;
    let Some(record) = store.load(&note_id).await? else {
        bail!("no note {note_id}");
    };
    let blocks = wire::load_blocks(record.blocks.as_ref(), &record.text);
    println!("# {}\n", record.title);
    print!("{}", markdown::to_markdown(&blocks));
    Ok(())
}

async fn cmd_export(store: Arc<SqliteNoteStore>, note: &str) -> Result<()> {
    let note_id = NoteId::parse(note)?;
    let Some(record) = store.load(&note_id).await? else {
        bail!("no note {note_id}");
    };
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn cmd_edit(
    store: Arc<SqliteNoteStore>,
    config: &FolioConfig,
    note: &str,
    script: &Path,
    title: Option<String>,
) -> Result<()> {
    let note_id = NoteId::parse(note)?;
    let content = std::fs::read_to_string(script)
        .with_context(|| format!("failed to read {}", script.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&content)
        .with_context(|| format!("invalid edit script {}", script.display()))?;

    let mut session = NoteSession::open(store, note_id, config).await?;
    if let Some(title) = title {
        session.set_title(title);
    }

    for (index, step) in steps.into_iter().enumerate() {
        let cursor = step
            .cursor
            .as_ref()
            .map(|c| c.resolve(session.doc()))
            .transpose()
            .with_context(|| format!("step {index}"))?;
        let name = step.command.name();
        let outcome = session.execute(cursor, step.command).await?;
        tracing::debug!(step = index, command = name, changes = outcome.changes.len(), "step applied");
        if !outcome.mutated() && !outcome.save_requested {
            tracing::info!(step = index, command = name, "step changed nothing");
        }
    }

    let outcome = session.save().await?;
    tracing::info!(note = %session.note_id(), ?outcome, blocks = session.doc().block_count(), "edit finished");
    Ok(())
}
