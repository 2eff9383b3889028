mod error;
mod manifest;
mod report;

use crate::error::{ErrorKind, Result};
use crate::manifest::Manifest;
use crate::report::{Report, describe};
use clap::{ArgAction, Parser, Subcommand};
use exn::ResultExt;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tome_config::Config;
use tome_library::Relocator;
use tome_storage::backend::ReadOnlyFilesystem;
use tome_storage::{FilesystemHandle, LocalFilesystem};
use tome_watch::{LibraryId, MonitorHandle, NotifyMonitor, PathRegistry};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tome", version, about = "Keep book files where their naming pattern says they belong")]
struct Cli {
    /// Config file (TOML, YAML or JSON); defaults to tome.toml in the user config directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log more (-v for debug, -vv for trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Move every book in a manifest to its target location and save the
    /// updated records back to the manifest
    Relocate {
        #[arg(short, long)]
        manifest: PathBuf,
        /// Report what would move without touching any file
        #[arg(long)]
        dry_run: bool,
        /// Pause the watcher for the whole batch
        #[arg(long)]
        protect: bool,
    },
    /// Print where every book in a manifest would be moved to
    Preview {
        #[arg(short, long)]
        manifest: PathBuf,
    },
    /// Watch library roots and print changes until interrupted
    Watch {
        /// Libraries as ID=ROOT, e.g. 1=/srv/books
        #[arg(required = true)]
        libraries: Vec<LibraryArg>,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct LibraryArg {
    id: LibraryId,
    root: PathBuf,
}

impl FromStr for LibraryArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (id, root) = s.split_once('=').ok_or_else(|| format!("expected ID=ROOT, got {s:?}"))?;
        let id = id
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("invalid library id {id:?}: {e}"))?;
        if root.is_empty() {
            return Err(format!("missing root for library {id}"));
        }
        Ok(Self {
            id: LibraryId(id),
            root: PathBuf::from(root),
        })
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn relocator(config: &Config, dry_run: bool) -> Result<Relocator> {
    let local: FilesystemHandle = Arc::new(LocalFilesystem::default());
    let fs: FilesystemHandle = if dry_run {
        Arc::new(ReadOnlyFilesystem::new(local))
    } else {
        local
    };
    let monitor: MonitorHandle = Arc::new(NotifyMonitor::new().or_raise(|| ErrorKind::Watch)?);
    let mut settings = config.relocation_settings();
    if dry_run {
        settings.pre_move_delay = Duration::ZERO;
        settings.batch_settle_delay = Duration::ZERO;
    }
    Ok(Relocator::new(fs, monitor, settings))
}

async fn relocate(config: &Config, path: &Path, dry_run: bool, protect: bool) -> Result<()> {
    let mut manifest = Manifest::load(path)?;
    let relocator = relocator(config, dry_run)?;
    let requests = manifest.requests();
    let results = if protect {
        relocator.reorganize(requests).await
    } else {
        relocator.move_batch(requests).await
    };

    for result in &results {
        println!("{}", describe(result));
    }
    let report = Report::new(&results);
    print!("{report}");

    if dry_run {
        println!("Dry run: nothing was moved and the manifest is unchanged.");
    } else {
        manifest.apply(results);
        manifest.save(path)?;
    }
    match report.failed() {
        0 => Ok(()),
        failed => exn::bail!(ErrorKind::Failures(failed)),
    }
}

fn preview(config: &Config, path: &Path) -> Result<()> {
    let manifest = Manifest::load(path)?;
    let relocator = relocator(config, true)?;
    for entry in &manifest.books {
        let book = &entry.book;
        let Some(current) = book.full_path() else {
            println!("#{}: (unplaced)", book.id);
            continue;
        };
        let target = match &entry.target_library {
            Some(library) => relocator.target_path(book, library).map(Some),
            None => relocator.preview(book),
        };
        let target = target.or_raise(|| ErrorKind::Preview(book.id))?;
        match target {
            Some(target) if target == current => println!("#{}: {} (in place)", book.id, current.display()),
            Some(target) => println!("#{}: {} -> {}", book.id, current.display(), target.display()),
            None => println!("#{}: (unplaced)", book.id),
        }
    }
    Ok(())
}

async fn watch(libraries: Vec<LibraryArg>) -> Result<()> {
    let monitor = Arc::new(NotifyMonitor::new().or_raise(|| ErrorKind::Watch)?);
    let registry = PathRegistry::new(monitor.clone());
    for library in &libraries {
        let directories = registry
            .register_library_subtree(library.id, &library.root)
            .await
            .or_raise(|| ErrorKind::Watch)?;
        tracing::info!(library_id = %library.id, root = %library.root.display(), directories, "Watching library");
    }
    let mut events = monitor.events().or_raise(|| ErrorKind::Watch)?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            },
            event = events.next() => match event {
                Some(event) => println!("library {}: {:?} {}", event.library_id, event.kind, event.path.display()),
                None => break,
            },
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    match cli.command {
        Command::Relocate {
            manifest,
            dry_run,
            protect,
        } => relocate(&config, &manifest, dry_run, protect).await,
        Command::Preview { manifest } => preview(&config, &manifest),
        Command::Watch { libraries } => watch(libraries).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        },
    }
}
