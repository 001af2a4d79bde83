use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};

use devpi_testresult::engine::{self, Reporter};
use devpi_testresult::error::Error;
use devpi_testresult::types::{UploadOptions, UploadRequest};
use devpi_testresult_index::{ClientState, DevpiSession, with_session};

#[derive(Parser, Debug)]
#[command(name = "devpi-upload-testresult", version)]
#[command(about = "Upload tox result reports to the matching sdist on a devpi index")]
struct Cli {
    /// Index to get the package from (default: current index).
    ///
    /// Either NAME of an index of the logged in user, USER/NAME on the
    /// current server, or the full URL of an index on another server.
    #[arg(long)]
    index: Option<String>,

    /// Package specification in requirement syntax, e.g. 'demo' or 'demo==1.0'
    pkgspec: String,

    /// Reports written by `tox --result-json`, or directories holding them.
    #[arg(required = true, value_name = "JSON_OR_DIR")]
    json_or_dir: Vec<PathBuf>,

    /// Descend into subdirectories of directory arguments.
    #[arg(short, long)]
    recursive: bool,

    /// Don't post anything, only show what would be posted.
    #[arg(long)]
    dry_run: bool,

    /// More output (repeatable).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Show response bodies of failed posts and session totals.
    #[arg(long)]
    debug: bool,

    /// Directory with the devpi client state (default: $DEVPI_CLIENTDIR or ~/.devpi/client)
    #[arg(long)]
    clientdir: Option<PathBuf>,
}

struct CliReporter;

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbosity = if cli.debug {
        cli.verbose.max(2)
    } else {
        cli.verbose
    };
    let request = UploadRequest {
        pkgspec: cli.pkgspec,
        index: cli.index,
        paths: cli.json_or_dir,
        recursive: cli.recursive,
        options: UploadOptions {
            simulate: cli.dry_run,
            verbosity,
        },
    };

    let state = ClientState::load_default(cli.clientdir.as_deref()).map_err(Error::from)?;
    let session = DevpiSession::open(state)?;

    let mut reporter = CliReporter;
    let (result, stats) = with_session(session, |session| {
        engine::run_upload(session, &request, &mut reporter)
    });
    if request.options.debug() {
        reporter.info(&format!("session closed after {} requests", stats.requests));
    }

    let summary = result?;
    println!("{summary}");
    Ok(())
}
