// SPDX-License-Identifier: MIT

//! The process supervisor state machine.
//!
//! One supervisor per invocation: it spawns the child (Wrapper mode) or
//! consumes standard input (Sink mode), runs one pump per active stream,
//! drives the optional periodic and timeout timers, and reacts to control
//! events delivered over an mpsc channel. Timers and OS signal handlers
//! never touch run state directly; they post a [`ControlEvent`] and the
//! control loop in [`Supervisor::wait`] acts on it.

use std::io::IsTerminal;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::{getpgrp, Pid};
use pingback_adapters::WebhookAdapter;
use pingback_core::{
    local_identity, Clock, Config, EventKind, ExecutionRecord, Mode, StreamCapture, SystemClock,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::emitter::Emitter;
use crate::error::SuperviseError;

/// Grace period between SIGTERM and SIGKILL during shutdown.
const TERM_GRACE: Duration = Duration::from_secs(2);

/// Bounded wait per pump at shutdown; pumps that do not stop in time are
/// abandoned so shutdown can never hang on a worker.
const JOIN_WAIT: Duration = Duration::from_secs(10);

/// Input stream fed to the stdin pump; injectable for tests.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
/// Pass-through destination for Sink mode; injectable for tests.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Supervisor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    NotStarted,
    Running,
    ShuttingDown,
    Terminated,
}

/// Events delivered into the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlEvent {
    /// Forced report requested (external signal); run state is unchanged.
    ForceReport,
    /// Interrupt/termination requested for the supervisor itself.
    Interrupt,
    /// Periodic heartbeat timer fired.
    PeriodicTick,
    /// Timeout deadline expired.
    TimedOut,
    /// Our own output stream is gone; nobody is reading what we forward.
    OutputBroken,
}

/// Clonable handle for posting control events from outside the control loop
/// (OS signal handlers, tests). Sends are fire-and-forget; once the loop has
/// finished they are dropped.
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<ControlEvent>,
}

impl ControlHandle {
    /// Request a Signal-kind report without altering the run.
    pub fn force_report(&self) {
        let _ = self.tx.send(ControlEvent::ForceReport);
    }

    /// Request the interrupt shutdown path.
    pub fn interrupt(&self) {
        let _ = self.tx.send(ControlEvent::Interrupt);
    }
}

/// What woke the control loop up.
enum Wakeup {
    ChildExited(Option<i32>),
    InputFinished,
    Control(ControlEvent),
}

/// Supervises one child command (or the input sink) end-to-end.
pub struct Supervisor<W: WebhookAdapter, C: Clock = SystemClock> {
    args: Vec<String>,
    mode: Mode,
    emitter: Emitter<W>,
    clock: C,
    state: State,
    child: Option<Child>,
    pid: i32,
    exit_code: Option<i32>,
    start_ms: u64,
    end_ms: Option<u64>,
    terminate: Arc<AtomicBool>,
    cancel: CancellationToken,
    stdin_capture: Arc<StreamCapture>,
    stdout_capture: Arc<StreamCapture>,
    stderr_capture: Arc<StreamCapture>,
    pumps: Vec<JoinHandle<()>>,
    timers: Vec<JoinHandle<()>>,
    control_tx: mpsc::UnboundedSender<ControlEvent>,
    control_rx: Option<mpsc::UnboundedReceiver<ControlEvent>>,
    stdin_done: Option<oneshot::Receiver<()>>,
    username: String,
    hostname: String,
}

impl<W: WebhookAdapter, C: Clock> Supervisor<W, C> {
    /// Spawn a supervised run on the process's real standard streams.
    ///
    /// With arguments, runs in Wrapper mode; without, requires a
    /// non-interactive standard input and runs in Sink mode.
    pub fn spawn(
        config: Arc<Config>,
        args: Vec<String>,
        emitter: Emitter<W>,
        clock: C,
    ) -> Result<Self, SuperviseError> {
        let input: Option<BoxedReader> = if std::io::stdin().is_terminal() {
            None
        } else {
            Some(Box::new(tokio::io::stdin()))
        };
        Self::spawn_with_io(config, args, emitter, clock, input, Box::new(tokio::io::stdout()))
    }

    /// Spawn with explicit input and pass-through streams. Used by tests to
    /// drive Sink mode without touching the process's own stdio.
    pub fn spawn_with_io(
        config: Arc<Config>,
        args: Vec<String>,
        emitter: Emitter<W>,
        clock: C,
        input: Option<BoxedReader>,
        passthrough: BoxedWriter,
    ) -> Result<Self, SuperviseError> {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let terminate = Arc::new(AtomicBool::new(false));
        let stdin_capture = Arc::new(StreamCapture::new(config.buffer_size));
        let stdout_capture = Arc::new(StreamCapture::new(config.buffer_size));
        let stderr_capture = Arc::new(StreamCapture::new(config.buffer_size));
        let (username, hostname) = local_identity();
        let start_ms = clock.epoch_ms();

        let mut pumps = Vec::new();
        let mut stdin_done = None;

        let (mode, child, pid) = if let Some(command_name) = args.first() {
            drop(passthrough); // child output goes to our own streams directly

            let mut command = Command::new(command_name);
            command
                .args(&args[1..])
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            let mut child = command.spawn().map_err(|source| SuperviseError::Spawn {
                command: command_name.clone(),
                source,
            })?;
            let pid = child.id().map(|p| p as i32).unwrap_or_default();
            debug!(pid, command = %command_name, "child spawned");

            match (input, child.stdin.take()) {
                (Some(input), Some(child_stdin)) => {
                    let (done_tx, done_rx) = oneshot::channel();
                    pumps.push(spawn_stdin_pump(
                        input,
                        StdinSink::Child(child_stdin),
                        Arc::clone(&stdin_capture),
                        Arc::clone(&terminate),
                        cancel.clone(),
                        done_tx,
                    ));
                    stdin_done = Some(done_rx);
                }
                // No input to bridge: close the child's stdin right away.
                (_, child_stdin) => drop(child_stdin),
            }
            if let Some(stdout) = child.stdout.take() {
                pumps.push(spawn_output_pump(
                    stdout,
                    Arc::clone(&stdout_capture),
                    tokio::io::stdout(),
                    control_tx.clone(),
                    "stdout",
                ));
            }
            if let Some(stderr) = child.stderr.take() {
                pumps.push(spawn_output_pump(
                    stderr,
                    Arc::clone(&stderr_capture),
                    tokio::io::stderr(),
                    control_tx.clone(),
                    "stderr",
                ));
            }

            (Mode::Wrapper, Some(child), pid)
        } else {
            let Some(input) = input else {
                return Err(SuperviseError::NoInput);
            };
            let (done_tx, done_rx) = oneshot::channel();
            pumps.push(spawn_stdin_pump(
                input,
                StdinSink::Passthrough(passthrough),
                Arc::clone(&stdin_capture),
                Arc::clone(&terminate),
                cancel.clone(),
                done_tx,
            ));
            stdin_done = Some(done_rx);
            (Mode::Sink, None, getpgrp().as_raw())
        };

        let mut timers = Vec::new();
        if let Some(period) = config.period {
            timers.push(spawn_periodic_timer(period, control_tx.clone(), cancel.clone()));
        }
        if let Some(deadline) = config.timeout {
            timers.push(spawn_timeout_timer(deadline, control_tx.clone(), cancel.clone()));
        }

        Ok(Self {
            args,
            mode,
            emitter,
            clock,
            state: State::Running,
            child,
            pid,
            exit_code: None,
            start_ms,
            end_ms: None,
            terminate,
            cancel,
            stdin_capture,
            stdout_capture,
            stderr_capture,
            pumps,
            timers,
            control_tx,
            control_rx: Some(control_rx),
            stdin_done,
            username,
            hostname,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Handle for posting control events from signal handlers or tests.
    pub fn control_handle(&self) -> ControlHandle {
        ControlHandle { tx: self.control_tx.clone() }
    }

    /// Point-in-time snapshot of the run for report rendering.
    pub fn record(&self) -> ExecutionRecord {
        ExecutionRecord {
            command: self.args.first().cloned(),
            arguments: self.args.get(1..).unwrap_or_default().to_vec(),
            pid: self.pid,
            mode: self.mode,
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            captured_ms: self.clock.epoch_ms(),
            returncode: self.exit_code,
            stdin_lines: self.stdin_capture.line_count(),
            stdout_lines: self.stdout_capture.line_count(),
            stderr_lines: self.stderr_capture.line_count(),
            stdin_buffer: self.stdin_capture.snapshot(),
            stdout_buffer: self.stdout_capture.snapshot(),
            stderr_buffer: self.stderr_capture.snapshot(),
            username: self.username.clone(),
            hostname: self.hostname.clone(),
        }
    }

    /// Drive the run to completion.
    ///
    /// Blocks until the child exits (Wrapper) or input is exhausted (Sink),
    /// handling control events as they arrive. The normal completion path
    /// runs the shutdown sequence and emits a Final report; timeout and
    /// interrupt are terminal events of their own and suppress Final.
    pub async fn wait(&mut self) -> Result<(), SuperviseError> {
        let Some(mut control_rx) = self.control_rx.take() else {
            return Ok(()); // already waited
        };

        loop {
            match self.next_wakeup(&mut control_rx).await {
                Wakeup::ChildExited(code) => {
                    self.exit_code = code;
                    self.shutdown().await;
                    self.emit(EventKind::Final).await;
                    break;
                }
                Wakeup::InputFinished => {
                    self.exit_code = Some(0);
                    self.shutdown().await;
                    self.emit(EventKind::Final).await;
                    break;
                }
                Wakeup::Control(ControlEvent::ForceReport) => {
                    self.emit(EventKind::Signal).await;
                }
                Wakeup::Control(ControlEvent::PeriodicTick) => {
                    // The timer is cancelled at shutdown; drop any tick that
                    // was already queued.
                    if self.state == State::Running {
                        self.emit(EventKind::Periodic).await;
                    }
                }
                Wakeup::Control(ControlEvent::OutputBroken) => {
                    // Nobody downstream; end the run but report it as a
                    // normal completion.
                    self.shutdown().await;
                    self.emit(EventKind::Final).await;
                    break;
                }
                Wakeup::Control(ControlEvent::TimedOut) => {
                    self.shutdown().await;
                    self.emit(EventKind::Timeout).await;
                    break;
                }
                Wakeup::Control(ControlEvent::Interrupt) => {
                    self.handle_interrupt().await;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Interrupt shutdown path: run the shutdown sequence and emit an
    /// Interrupt report instead of Final.
    pub async fn handle_interrupt(&mut self) {
        self.shutdown().await;
        self.emit(EventKind::Interrupt).await;
    }

    /// Idempotent shutdown sequence.
    ///
    /// Marks the terminate flag, records the end time, cancels both timers
    /// and the stdin pump, terminates the child (SIGTERM, then SIGKILL only
    /// if it is still running after the grace period), and joins the pumps
    /// with a bounded wait.
    pub async fn shutdown(&mut self) {
        if self.state != State::Running {
            return;
        }
        self.state = State::ShuttingDown;
        self.terminate.store(true, Ordering::Relaxed);
        self.end_ms = Some(self.clock.epoch_ms());
        self.cancel.cancel();

        if let Some(mut child) = self.child.take() {
            if self.exit_code.is_none() {
                self.exit_code = terminate_child(&mut child).await;
            }
        }

        for timer in self.timers.drain(..) {
            let _ = timer.await;
        }
        for pump in self.pumps.drain(..) {
            if tokio::time::timeout(JOIN_WAIT, pump).await.is_err() {
                warn!("stream pump did not stop within {JOIN_WAIT:?}; abandoning it");
            }
        }

        self.state = State::Terminated;
        debug!("supervisor terminated");
    }

    async fn next_wakeup(&mut self, control_rx: &mut mpsc::UnboundedReceiver<ControlEvent>) -> Wakeup {
        if let Some(child) = self.child.as_mut() {
            tokio::select! {
                status = child.wait() => {
                    Wakeup::ChildExited(status.ok().and_then(exit_code_of))
                }
                event = control_rx.recv() => match event {
                    Some(event) => Wakeup::Control(event),
                    None => Wakeup::InputFinished,
                },
            }
        } else if let Some(done) = self.stdin_done.as_mut() {
            tokio::select! {
                _ = done => Wakeup::InputFinished,
                event = control_rx.recv() => match event {
                    Some(event) => Wakeup::Control(event),
                    None => Wakeup::InputFinished,
                },
            }
        } else {
            Wakeup::InputFinished
        }
    }

    async fn emit(&self, kind: EventKind) {
        let record = self.record();
        if let Err(err) = self.emitter.emit(kind, &record).await {
            tracing::error!(?kind, %err, "notification emission failed");
        }
    }
}

fn exit_code_of(status: ExitStatus) -> Option<i32> {
    status.code().or_else(|| status.signal().map(|sig| 128 + sig))
}

/// Terminate the child: graceful SIGTERM, escalating to SIGKILL only when
/// the child is demonstrably still running after the grace period.
async fn terminate_child(child: &mut Child) -> Option<i32> {
    match child.try_wait() {
        Ok(Some(status)) => return exit_code_of(status),
        Ok(None) => {}
        Err(err) => {
            debug!(%err, "child status poll failed");
            return None;
        }
    }

    if let Some(pid) = child.id() {
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
    match tokio::time::timeout(TERM_GRACE, child.wait()).await {
        Ok(Ok(status)) => return exit_code_of(status),
        Ok(Err(err)) => {
            debug!(%err, "waiting for child after SIGTERM failed");
            return None;
        }
        Err(_) => {}
    }

    warn!("child ignored SIGTERM; escalating to SIGKILL");
    if child.start_kill().is_ok() {
        if let Ok(Ok(status)) = tokio::time::timeout(TERM_GRACE, child.wait()).await {
            return exit_code_of(status);
        }
    }
    None
}

/// Where the stdin pump forwards each captured line.
enum StdinSink {
    Child(ChildStdin),
    Passthrough(BoxedWriter),
}

impl StdinSink {
    /// Returns false once the downstream is gone; a broken pipe ends the
    /// pump quietly rather than failing the run.
    async fn forward(&mut self, bytes: &[u8]) -> bool {
        let result = match self {
            StdinSink::Child(stdin) => stdin.write_all(bytes).await,
            StdinSink::Passthrough(out) => match out.write_all(bytes).await {
                Ok(()) => out.flush().await,
                err => err,
            },
        };
        result.is_ok()
    }
}

/// Pump our own standard input: capture each line, then forward it to the
/// child (Wrapper) or the pass-through writer (Sink). Exits on EOF, on the
/// terminate flag, or on cancellation; in Wrapper mode the child's stdin
/// handle is dropped on exit to signal end-of-input.
fn spawn_stdin_pump(
    input: BoxedReader,
    mut sink: StdinSink,
    capture: Arc<StreamCapture>,
    terminate: Arc<AtomicBool>,
    cancel: CancellationToken,
    done: oneshot::Sender<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(input);
        let mut line = String::new();
        loop {
            if terminate.load(Ordering::Relaxed) {
                break;
            }
            line.clear();
            let read = tokio::select! {
                _ = cancel.cancelled() => break,
                read = reader.read_line(&mut line) => read,
            };
            match read {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    debug!(%err, "stdin read failed");
                    break;
                }
            }
            capture.record(&line);
            if !sink.forward(line.as_bytes()).await {
                break;
            }
        }
        drop(sink);
        drop(done);
    })
}

/// Pump one child output stream: capture each line and forward it verbatim
/// to our own corresponding stream. Runs until end-of-stream. A broken
/// downstream pipe is not fatal to the pump (capture continues until the
/// child's pipe drains), but it does request an orderly shutdown.
fn spawn_output_pump<R, F>(
    stream: R,
    capture: Arc<StreamCapture>,
    mut forward_to: F,
    tx: mpsc::UnboundedSender<ControlEvent>,
    label: &'static str,
) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
    F: AsyncWrite + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        let mut forwarding = true;
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    debug!(%err, label, "stream read failed");
                    break;
                }
            }
            capture.record(&line);
            if forwarding {
                let wrote = match forward_to.write_all(line.as_bytes()).await {
                    Ok(()) => forward_to.flush().await,
                    err => err,
                };
                if wrote.is_err() {
                    debug!(label, "downstream pipe closed");
                    forwarding = false;
                    let _ = tx.send(ControlEvent::OutputBroken);
                }
            }
        }
    })
}

/// Repeating heartbeat timer; re-arms after each firing unless shutdown has
/// cancelled it.
fn spawn_periodic_timer(
    period: Duration,
    tx: mpsc::UnboundedSender<ControlEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticks.tick() => {
                    if tx.send(ControlEvent::PeriodicTick).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// One-shot timeout timer.
fn spawn_timeout_timer(
    deadline: Duration,
    tx: mpsc::UnboundedSender<ControlEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(deadline) => {
                let _ = tx.send(ControlEvent::TimedOut);
            }
        }
    })
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
