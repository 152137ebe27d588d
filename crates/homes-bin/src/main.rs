//! Homes - inspect and edit the homes database from the command line.

mod console;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::{ConsoleNotifier, ConsoleTeleporter};
use homes_config_and_utils::{init_logging, init_logging_with_file, Config, Paths};
use homes_core::{HomeTarget, Location, Subject, SubjectId};
use homes_runtime::HomesRuntime;
use homes_service::possible_completions;
use tracing::debug;

/// Homes command-line interface.
#[derive(Parser, Debug)]
#[command(name = "homes")]
#[command(about = "Manage saved player homes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Base directory for runtime files (database, logs, config). Defaults to ~/.homes
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Also write JSON logs to the logs directory
    #[arg(long, global = true)]
    log_file: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a player, or record their new name
    Register { id: SubjectId, name: String },
    /// Save a home
    Set {
        /// Player acting as the owner
        id: SubjectId,
        target: String,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        #[arg(allow_negative_numbers = true)]
        z: f64,
        #[arg(long, default_value = "world")]
        world: String,
        #[arg(long, default_value_t = 0.0)]
        yaw: f32,
        #[arg(long, default_value_t = 0.0)]
        pitch: f32,
        /// Replace an existing home of the same name
        #[arg(long = "override")]
        allow_override: bool,
    },
    /// Print where a home is
    Resolve {
        target: String,
        /// Player whose own homes plain names refer to
        #[arg(long = "as")]
        acting: Option<SubjectId>,
    },
    /// Delete a home
    Delete { id: SubjectId, target: String },
    /// List a player's homes
    List { id: SubjectId },
    /// Print completions for a partially typed home
    Complete {
        argument: String,
        #[arg(long = "as")]
        acting: Option<SubjectId>,
    },
}

/// A subject known only by id. The CLI never needs display names of the
/// acting player.
fn subject(id: SubjectId) -> Subject {
    Subject::new(id, id.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };

    if cli.log_file {
        paths.ensure_dirs()?;
        init_logging_with_file(&cli.log_level, &paths.log_file())?;
    } else {
        init_logging(&cli.log_level);
    }

    let config = Config::load(&paths)?;
    let runtime = HomesRuntime::open(
        &config,
        &paths,
        Arc::new(ConsoleTeleporter),
        Arc::new(ConsoleNotifier),
    )?;
    debug!(base_dir = %paths.base_dir().display(), "Runtime opened");

    match cli.command {
        Commands::Register { id, name } => {
            runtime.on_subject_connect(&Subject::new(id, name));
        }
        Commands::Set {
            id,
            target,
            x,
            y,
            z,
            world,
            yaw,
            pitch,
            allow_override,
        } => {
            let location = Location::new(x, y, z, yaw, pitch, world, "");
            runtime.set_home(&subject(id), Some(&target), location, allow_override);
        }
        Commands::Resolve { target, acting } => {
            let target = HomeTarget::parse(&target)?;
            let acting = acting.map(subject);
            let home = runtime.service().resolve_home(&target, acting.as_ref())?;
            println!("@{} {}: {}", home.home_id, home.name, home.location);
        }
        Commands::Delete { id, target } => {
            runtime.delete_home(&subject(id), Some(&target));
        }
        Commands::List { id } => {
            runtime.list_homes(&subject(id), None);
        }
        Commands::Complete { argument, acting } => {
            for candidate in complete(&runtime, &argument, acting)? {
                println!("{candidate}");
            }
        }
    }

    runtime.flush()?;
    runtime.shutdown();
    Ok(())
}

/// Completion candidates, loaded from storage.
///
/// The runtime only completes from warm caches; a one-shot process never
/// has any, so names are read directly.
fn complete(
    runtime: &HomesRuntime,
    argument: &str,
    acting: Option<SubjectId>,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let service = runtime.service();
    if let Some((owner_name, _)) = argument.split_once(':') {
        let owner = match owner_name.parse::<SubjectId>() {
            Ok(id) => id,
            Err(_) => service.resolve_owner(owner_name)?,
        };
        let names = service
            .list_homes(owner)?
            .into_keys()
            .map(|name| format!("{owner_name}:{name}"));
        return Ok(possible_completions(argument, names));
    }

    match acting {
        Some(id) => Ok(possible_completions(
            argument,
            service.list_homes(id)?.into_keys(),
        )),
        None => Ok(Vec::new()),
    }
}
