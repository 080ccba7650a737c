//! inwatch - dump inotify events for one path

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use watcher::{mask, EventMask, Render, RunSummary, ShutdownToken, WatchError, WatcherConfig};

mod render;
mod signal;

use render::{JsonRenderer, TextRenderer};

/// Watch a file or directory and print every inotify event until Ctrl-C
#[derive(Parser)]
#[command(name = "inwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File or directory to watch
    path: PathBuf,

    /// Only report these categories (e.g. created,deleted or IN_MODIFY)
    #[arg(long, value_delimiter = ',', value_parser = parse_category)]
    events: Vec<EventMask>,

    /// Don't dereference PATH if it is a symlink
    #[arg(long)]
    no_follow: bool,

    /// Fail unless PATH is a directory
    #[arg(long)]
    only_dir: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Labelled block per event
    Text,
    /// One JSON object per event
    Json,
}

impl Cli {
    fn config(&self) -> WatcherConfig {
        let mask = if self.events.is_empty() {
            EventMask::ALL_CATEGORIES
        } else {
            self.events.iter().fold(EventMask::empty(), |acc, &bit| acc | bit)
        };

        WatcherConfig {
            mask,
            follow_symlinks: !self.no_follow,
            only_dir: self.only_dir,
        }
    }
}

fn parse_category(name: &str) -> Result<EventMask, String> {
    mask::parse_category(name).ok_or_else(|| {
        let known: Vec<_> = mask::CATEGORIES.iter().map(|c| c.label).collect();
        format!("unknown event category '{}' (expected one of: {})", name, known.join(", "))
    })
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("inwatch: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let shutdown = ShutdownToken::new();
    signal::install(&shutdown).context("Failed to set up shutdown handling")?;

    let config = cli.config();
    let stdout = io::stdout();
    let mut renderer: Box<dyn Render> = match cli.format {
        Format::Text => Box::new(TextRenderer::new(stdout.lock())),
        Format::Json => Box::new(JsonRenderer::new(stdout.lock())),
    };

    let outcome = watcher::run(&cli.path, &config, &shutdown, &mut *renderer);
    let code = report(outcome, &mut *renderer, &mut io::stderr().lock());
    Ok(ExitCode::from(code))
}

/// Print the final status and pick the exit code
///
/// Diagnostics go to `diag` (stderr in production). Failing to write them
/// does not change the exit code.
fn report(
    outcome: Result<RunSummary, WatchError>,
    renderer: &mut dyn Render,
    diag: &mut dyn Write,
) -> u8 {
    let written = match &outcome {
        Ok(summary) => {
            info!("Shutdown requested after {} events", summary.events);
            Ok(())
        }
        Err(e) if e.is_startup() => {
            // The loop never ran, so there is nothing to finish
            let _ = writeln!(diag, "{}", e);
            return 1;
        }
        Err(WatchError::FatalRead(errno)) => writeln!(diag, "Error reading inotify file descriptor")
            .and_then(|()| writeln!(diag, "Errno is '{}' ({})", errno.desc(), *errno as i32)),
        Err(e) => writeln!(diag, "{}", e),
    };
    if let Err(e) = written {
        tracing::warn!("Failed to write diagnostics: {}", e);
    }

    if let Err(e) = renderer.finish() {
        tracing::warn!("Failed to write final line: {}", e);
    }

    match outcome {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use nix::errno::Errno;
    use watcher::record::FrameError;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_config_watches_everything() {
        let cli = Cli::try_parse_from(["inwatch", "/tmp"]).unwrap();
        assert_eq!(cli.config(), WatcherConfig::default());
    }

    #[test]
    fn test_events_restrict_mask() {
        let cli = Cli::try_parse_from([
            "inwatch",
            "--events",
            "created,IN_DELETE",
            "--no-follow",
            "/tmp",
        ])
        .unwrap();

        let config = cli.config();
        assert_eq!(config.mask, EventMask::CREATE | EventMask::DELETE);
        assert!(!config.follow_symlinks);
        assert!(!config.only_dir);
    }

    #[test]
    fn test_unknown_event_is_usage_error() {
        assert!(Cli::try_parse_from(["inwatch", "--events", "exploded", "/tmp"]).is_err());
    }

    #[test]
    fn test_path_is_required() {
        assert!(Cli::try_parse_from(["inwatch"]).is_err());
    }

    /// Run `report` against an in-memory text renderer: (code, stdout, stderr)
    fn report_text(outcome: Result<RunSummary, WatchError>) -> (u8, String, String) {
        let mut renderer = TextRenderer::new(Vec::new());
        let mut diag = Vec::new();
        let code = report(outcome, &mut renderer, &mut diag);

        let stdout = String::from_utf8(renderer.into_inner()).unwrap();
        let stderr = String::from_utf8(diag).unwrap();
        (code, stdout, stderr)
    }

    #[test]
    fn test_report_clean_shutdown() {
        let (code, stdout, stderr) = report_text(Ok(RunSummary::default()));

        assert_eq!(code, 0);
        assert_eq!(stdout, "Ending program...\n");
        assert!(stderr.is_empty());
    }

    #[test]
    fn test_report_fatal_read() {
        let (code, stdout, stderr) = report_text(Err(WatchError::FatalRead(Errno::EIO)));

        assert_eq!(code, 1);
        assert_eq!(stdout, "Ending program...\n");
        assert!(stderr.starts_with("Error reading inotify file descriptor\n"));
        assert!(stderr.contains("Errno is 'I/O error' (5)"), "stderr: {stderr}");
    }

    #[test]
    fn test_report_malformed_stream() {
        let outcome = Err(WatchError::MalformedStream(FrameError::ShortRead { len: 3 }));
        let (code, stdout, stderr) = report_text(outcome);

        assert_eq!(code, 1);
        assert_eq!(stdout, "Ending program...\n");
        assert!(!stderr.is_empty());
    }

    #[test]
    fn test_report_output_failure() {
        let outcome = Err(WatchError::Output(io::Error::from(io::ErrorKind::BrokenPipe)));
        let (code, stdout, _) = report_text(outcome);

        assert_eq!(code, 1);
        assert_eq!(stdout, "Ending program...\n");
    }

    #[test]
    fn test_report_startup_failures_skip_final_line() {
        let not_watchable = WatchError::PathNotWatchable {
            path: PathBuf::from("/missing"),
            source: Errno::ENOENT,
        };
        let (code, stdout, stderr) = report_text(Err(not_watchable));
        assert_eq!(code, 1);
        assert!(stdout.is_empty());
        assert!(stderr.contains("/missing"), "stderr: {stderr}");

        let (code, stdout, stderr) = report_text(Err(WatchError::ChannelUnavailable(Errno::EMFILE)));
        assert_eq!(code, 1);
        assert!(stdout.is_empty());
        assert!(!stderr.is_empty());
    }
}
