//! Command-line access to node user properties in a SQLite scene file.
//!
//! # Responsibility
//! - Author small scenes (nodes, hierarchy, locks) for pipeline scripts.
//! - Read and write node properties through `PropertyStore`.
//!
//! # Invariants
//! - Exit code 0 on success, 1 on operation failure, 2 on usage error.

use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use userprops_core::{
    default_log_level, init_logging, open_scene_file, DecodeFailurePolicy, ExtendedJsonCodec,
    NodeKind, NodeRef, PropertyKey, PropertyStore, SceneHost, SqliteScene, StoreOptions,
};

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Read and write user properties stored on scene nodes.
#[derive(Parser, Debug)]
#[command(name = "userprops", version)]
struct Cli {
    /// Scene file to open; created when absent.
    scene: PathBuf,

    /// Absolute directory for rolling log files (logging is off when unset).
    #[arg(long, env = "USERPROPS_LOG_DIR", global = true)]
    log_dir: Option<String>,

    /// trace|debug|info|warn|error
    #[arg(long, env = "USERPROPS_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// What to do with a node buffer that cannot be decoded.
    #[arg(
        long,
        env = "USERPROPS_DECODE_FAILURE",
        global = true,
        default_value = "discard",
        value_name = "discard|surface"
    )]
    decode_failure: DecodeFailurePolicy,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// List nodes with their path (or name) and lock state.
    Nodes,
    /// Create a DAG node, optionally under a parent given by name or path.
    AddNode { name: String, parent: Option<String> },
    /// Create a dependency node.
    AddDg { name: String },
    /// Lock a node against structural edits.
    Lock { node: String },
    Unlock { node: String },
    /// Print one property as JSON.
    Get { node: String, key: String },
    /// Store one property given as (extended) JSON.
    Set {
        node: String,
        key: String,
        json: String,
    },
    /// Remove one property.
    Del { node: String, key: String },
    /// Print every property of a node.
    Dump { node: String },
    /// Print the stored buffer as-is.
    Raw { node: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    let conn = open_scene_file(&cli.scene)?;
    let scene = SqliteScene::new(&conn)?;
    let options = StoreOptions {
        decode_failure: cli.decode_failure,
        ..StoreOptions::default()
    };
    info!(
        "event=cli_command module=cli status=start command={:?}",
        cli.command
    );

    match cli.command {
        Command::Nodes => {
            for node in scene.list_nodes()? {
                let address = node.path.unwrap_or_else(|| node.name.clone());
                let lock = if node.locked { " locked" } else { "" };
                println!("{}  {address}{lock}", node.id);
            }
        }
        Command::AddNode { name, parent } => {
            let parent = parent
                .map(|parent| scene.resolve(&NodeRef::parse(&parent)))
                .transpose()?;
            println!("{}", scene.create_node(&name, parent, NodeKind::Dag)?);
        }
        Command::AddDg { name } => {
            println!("{}", scene.create_node(&name, None, NodeKind::Dependency)?);
        }
        Command::Lock { node } => set_locked(&scene, &node, true)?,
        Command::Unlock { node } => set_locked(&scene, &node, false)?,
        Command::Get { node, key } => {
            let store = PropertyStore::open_with_options(&scene, node.as_str(), options)?;
            let value = store.get(PropertyKey::from_json_key(&key))?;
            println!("{}", ExtendedJsonCodec::new().encode_value(value)?);
        }
        Command::Set { node, key, json } => {
            let value = ExtendedJsonCodec::new().decode_value(&json)?;
            let mut store = PropertyStore::open_with_options(&scene, node.as_str(), options)?;
            store.set(PropertyKey::from_json_key(&key), value)?;
        }
        Command::Del { node, key } => {
            let mut store = PropertyStore::open_with_options(&scene, node.as_str(), options)?;
            store.delete(PropertyKey::from_json_key(&key))?;
        }
        Command::Dump { node } => {
            let store = PropertyStore::open_with_options(&scene, node.as_str(), options)?;
            for (key, value) in store.items() {
                println!("{} = {value}", key.to_json_key());
            }
        }
        Command::Raw { node } => {
            let store = PropertyStore::open_with_options(&scene, node.as_str(), options)?;
            println!("{}", store.try_read_buffer()?);
        }
    }
    Ok(())
}

fn set_locked(scene: &SqliteScene<'_>, node: &str, locked: bool) -> CliResult<()> {
    let id = scene.resolve(&NodeRef::parse(node))?;
    scene.set_locked(id, locked)?;
    Ok(())
}
