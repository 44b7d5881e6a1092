mod app;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fluxchunk::browser::Browser;
use fluxchunk::codec::{ChunkType, encode_header};
use fluxchunk::error::Result;
use fluxchunk::storage::{ChunkFile, save_bytes};

use crate::app::app::App;
use crate::app::app_context::AppContext;
use crate::app::screens::tree_screen::TreeScreen;

const LOG_ENV: &str = "FLUXCHUNK_LOG";

#[derive(Parser, Debug)]
#[command(name = "fluxchunk", version, about = "Browse and edit chunk files")]
struct Args {
    /// Chunk file to open.
    path: PathBuf,

    /// Write logs to this file. Logging is off without it.
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Let leaves view the mapped file instead of copying their payloads.
    #[arg(long)]
    realised: bool,

    /// Start a missing file as an empty set.
    #[arg(long)]
    create: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.log.as_deref()) {
        eprintln!("fluxchunk: cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(%e, "exiting");
            eprintln!("fluxchunk: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log: Option<&Path>) -> std::io::Result<()> {
    let Some(path) = log else {
        return Ok(());
    };

    let file = File::create(path)?;
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    if args.create && !args.path.exists() {
        save_bytes(&args.path, &encode_header(ChunkType::Set, 0))?;
        info!(path = %args.path.display(), "created empty chunk file");
    }

    let file = ChunkFile::open(&args.path)?;
    let tree = if args.realised {
        file.build_realised()?
    } else {
        file.build()?
    };

    let ctx = AppContext {
        path: &args.path,
        realised: args.realised,
    };
    let mut app = App::new(Box::new(TreeScreen::new(Browser::new(tree))));

    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal, &ctx);
    ratatui::restore();

    result?;
    Ok(())
}
