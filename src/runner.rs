//! # Process Runner
//!
//! Build commands are launched through the [`ProcessRunner`] trait so the
//! orchestrator's ordering and skip logic can be tested with a fake that
//! records calls instead of spawning processes. [`CommandRunner`] is the real
//! implementation on top of `std::process::Command`.
//!
//! ## Streams
//!
//! The caller decides where a build's standard streams go through
//! [`BuildIo`]. `Inherit` hands the parent's descriptor straight to the child,
//! `Null` discards, and `Reader`/`Writer` connect a pipe that is pumped by a
//! scoped thread while the child runs. Output is forwarded chunk by chunk and
//! flushed after each chunk, never collected first.
//!
//! Input is read ahead by an [`InputStream`], which outlives a single build.
//! Feeding stops as soon as the child exits, so a reader that never reaches
//! end of file cannot hold the run open, and input the child did not take
//! stays queued for the next build.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

const CHUNK_SIZE: usize = 8192;

/// How often a waiting feeder checks whether the child has exited.
const FEED_POLL: Duration = Duration::from_millis(10);

/// Where a build reads its standard input from.
pub enum Input<'a> {
    Inherit,
    Null,
    Reader(&'a mut InputStream),
}

/// Standard input shared by the builds of one run.
///
/// A background thread reads the source into a bounded queue. The thread is
/// detached: if the source never ends, it stays blocked until the process
/// exits.
pub struct InputStream {
    chunks: Receiver<io::Result<Vec<u8>>>,
    pending: Vec<u8>,
    eof: bool,
}

impl InputStream {
    pub fn new<R: Read + Send + 'static>(mut reader: R) -> Self {
        let (tx, chunks) = mpsc::sync_channel(1);
        thread::spawn(move || {
            let mut buf = [0u8; CHUNK_SIZE];
            loop {
                let chunk = match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => Ok(buf[..n].to_vec()),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => Err(e),
                };
                let failed = chunk.is_err();
                if tx.send(chunk).is_err() || failed {
                    break;
                }
            }
        });
        Self {
            chunks,
            pending: Vec::new(),
            eof: false,
        }
    }

    /// Move the next chunk into `pending`, waiting at most [`FEED_POLL`].
    fn fill(&mut self) -> io::Result<()> {
        match self.chunks.recv_timeout(FEED_POLL) {
            Ok(Ok(chunk)) => self.pending = chunk,
            Ok(Err(e)) => {
                self.eof = true;
                return Err(e);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => self.eof = true,
        }
        Ok(())
    }
}

/// Where a build writes standard output or standard error to.
pub enum Output<'a> {
    Inherit,
    Null,
    Writer(&'a mut (dyn Write + Send)),
}

impl Input<'_> {
    fn stdio(&self) -> Stdio {
        match self {
            Input::Inherit => Stdio::inherit(),
            Input::Null => Stdio::null(),
            Input::Reader(_) => Stdio::piped(),
        }
    }
}

impl Output<'_> {
    fn stdio(&self) -> Stdio {
        match self {
            Output::Inherit => Stdio::inherit(),
            Output::Null => Stdio::null(),
            Output::Writer(_) => Stdio::piped(),
        }
    }
}

/// The three standard streams shared by every build in one run.
pub struct BuildIo<'a> {
    pub stdin: Input<'a>,
    pub stdout: Output<'a>,
    pub stderr: Output<'a>,
}

impl<'a> BuildIo<'a> {
    /// Pass the current process's streams through.
    pub fn inherit() -> Self {
        Self {
            stdin: Input::Inherit,
            stdout: Output::Inherit,
            stderr: Output::Inherit,
        }
    }

    /// No input, output discarded.
    pub fn null() -> Self {
        Self {
            stdin: Input::Null,
            stdout: Output::Null,
            stderr: Output::Null,
        }
    }

    pub fn new(stdin: Input<'a>, stdout: Output<'a>, stderr: Output<'a>) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
        }
    }
}

/// One process to run.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    /// Executable to launch.
    pub program: &'a Path,
    /// Working directory of the process.
    pub cwd: &'a Path,
    /// Environment entries added on top of the inherited environment.
    pub env: &'a [(String, String)],
}

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    /// Exit code, `None` if the process was terminated by a signal.
    pub code: Option<i32>,
}

impl RunStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Capability to run one process to completion.
pub trait ProcessRunner {
    /// Run `request` with `io` attached and wait for it to exit.
    ///
    /// An `Err` means the process could not be launched or its streams failed.
    fn run(&self, request: &RunRequest<'_>, io: &mut BuildIo<'_>) -> io::Result<RunStatus>;
}

/// Runs processes with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner;

impl ProcessRunner for CommandRunner {
    fn run(&self, request: &RunRequest<'_>, io: &mut BuildIo<'_>) -> io::Result<RunStatus> {
        let mut child = Command::new(request.program)
            .current_dir(request.cwd)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(io.stdin.stdio())
            .stdout(io.stdout.stdio())
            .stderr(io.stderr.stdio())
            .spawn()?;

        let child_stdin = child.stdin.take();
        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();
        let BuildIo {
            stdin,
            stdout,
            stderr,
        } = io;
        let exited = &AtomicBool::new(false);

        thread::scope(|scope| -> io::Result<RunStatus> {
            let feeder = match (stdin, child_stdin) {
                (Input::Reader(input), Some(pipe)) => {
                    Some(scope.spawn(move || pump_in(&mut **input, pipe, exited)))
                }
                _ => None,
            };
            let out = match (stdout, child_stdout) {
                (Output::Writer(writer), Some(pipe)) => {
                    Some(scope.spawn(move || pump_out(pipe, &mut **writer)))
                }
                _ => None,
            };
            let err = match (stderr, child_stderr) {
                (Output::Writer(writer), Some(pipe)) => {
                    Some(scope.spawn(move || pump_out(pipe, &mut **writer)))
                }
                _ => None,
            };

            let status = child.wait();
            exited.store(true, Ordering::Release);

            for handle in [feeder, out, err].into_iter().flatten() {
                handle
                    .join()
                    .map_err(|_| io::Error::other("stream pump panicked"))??;
            }

            Ok(RunStatus {
                code: status?.code(),
            })
        })
    }
}

/// Feed `input` to the child until the input ends or the child exits.
///
/// Dropping `pipe` on return closes the child's stdin.
fn pump_in(input: &mut InputStream, mut pipe: ChildStdin, exited: &AtomicBool) -> io::Result<()> {
    loop {
        if exited.load(Ordering::Acquire) {
            return Ok(());
        }
        if input.pending.is_empty() {
            if input.eof {
                return Ok(());
            }
            input.fill()?;
            continue;
        }
        match pipe.write(&input.pending) {
            Ok(n) => {
                input.pending.drain(..n);
            }
            // The child exited without reading everything.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

fn pump_out(mut pipe: impl Read, writer: &mut (dyn Write + Send)) -> io::Result<()> {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match pipe.read(&mut buf) {
            Ok(0) => return writer.flush(),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        writer.flush()?;
    }
}
