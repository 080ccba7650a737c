//! Helpers for driving the `inwatch` binary
//!
//! The watcher runs until it is signalled, so tests spawn it, follow its
//! output line by line, and stop it with SIGINT.

use anyhow::{bail, Context, Result};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Path of the binary under test
pub fn inwatch_binary() -> &'static str {
    env!("CARGO_BIN_EXE_inwatch")
}

/// Run to completion and collect output (for commands that exit on their own)
pub fn run_to_completion(args: &[&str]) -> Result<Finished> {
    let output = Command::new(inwatch_binary())
        .args(args)
        .output()
        .context("Failed to execute inwatch")?;

    Ok(Finished {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Output of a finished process
#[derive(Debug)]
pub struct Finished {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// A running watcher with its output streamed line by line
pub struct Running {
    child: Child,
    stdout: Receiver<String>,
    stderr: Receiver<String>,
    seen_stdout: Vec<String>,
    seen_stderr: Vec<String>,
}

impl Running {
    /// Spawn `inwatch -v <args> <path>`
    pub fn spawn(path: &Path, args: &[&str]) -> Result<Self> {
        let mut child = Command::new(inwatch_binary())
            .arg("-v")
            .args(args)
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn inwatch")?;

        let stdout = lines(child.stdout.take().context("stdout not piped")?);
        let stderr = lines(child.stderr.take().context("stderr not piped")?);

        Ok(Self {
            child,
            stdout,
            stderr,
            seen_stdout: Vec::new(),
            seen_stderr: Vec::new(),
        })
    }

    /// Block until the watch is registered
    pub fn wait_until_watching(&mut self) -> Result<()> {
        let deadline = Instant::now() + TIMEOUT;
        loop {
            let line = next_line(&self.stderr, deadline).context("Watcher never started")?;
            let found = line.contains("Watching");
            self.seen_stderr.push(line);
            if found {
                return Ok(());
            }
        }
    }

    /// Block until a stdout line satisfies `pred`
    pub fn wait_for_stdout(&mut self, pred: impl Fn(&str) -> bool) -> Result<String> {
        let deadline = Instant::now() + TIMEOUT;
        loop {
            let line = next_line(&self.stdout, deadline)
                .with_context(|| format!("Expected line never printed; got {:?}", self.seen_stdout))?;
            self.seen_stdout.push(line.clone());
            if pred(&line) {
                return Ok(line);
            }
        }
    }

    /// Deliver SIGINT, as Ctrl-C would
    pub fn interrupt(&self) -> Result<()> {
        kill(Pid::from_raw(self.child.id() as i32), Signal::SIGINT).context("Failed to send SIGINT")?;
        Ok(())
    }

    /// Wait for exit and drain the rest of the output
    pub fn finish(mut self) -> Result<Finished> {
        let deadline = Instant::now() + TIMEOUT;
        let status = loop {
            if let Some(status) = self.child.try_wait()? {
                break status;
            }
            if Instant::now() > deadline {
                let _ = self.child.kill();
                bail!("inwatch did not exit after SIGINT");
            }
            thread::sleep(Duration::from_millis(20));
        };

        // Writers are gone, so the readers end once their pipes are drained
        self.seen_stdout.extend(self.stdout.iter());
        self.seen_stderr.extend(self.stderr.iter());

        Ok(Finished {
            status,
            stdout: self.seen_stdout.join("\n"),
            stderr: self.seen_stderr.join("\n"),
        })
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn lines(stream: impl Read + Send + 'static) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stream).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn next_line(lines: &Receiver<String>, deadline: Instant) -> Result<String> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    lines
        .recv_timeout(remaining)
        .context("Timed out waiting for output")
}
