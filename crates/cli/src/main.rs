// SPDX-License-Identifier: MIT

//! `pingback` binary: argument parsing, configuration assembly, signal
//! wiring, and exit-code policy around one supervised run.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pingback_adapters::{HttpWebhookAdapter, StdoutWebhookAdapter, WebhookAdapter};
use pingback_core::{Config, ConfigError, ConfigFile, SystemClock};
use pingback_engine::{ControlHandle, Emitter, SuperviseError, Supervisor};
use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::EnvFilter;

/// Run a command (or consume standard input) and report on it to a chat
/// webhook: a final report when it ends, plus optional periodic, forced,
/// timeout, and interrupt reports along the way.
#[derive(Debug, Parser)]
#[command(name = "pingback", version, about)]
struct Cli {
    /// Webhook URL reports are delivered to.
    #[arg(short, long, value_name = "URL")]
    webhook: Option<String>,

    /// Send plain-text messages instead of rich embeds.
    #[arg(short, long)]
    simple: bool,

    /// Embed accent color, decimal or 0x-prefixed hex.
    #[arg(short, long, value_parser = parse_color)]
    color: Option<u32>,

    /// URL the report title links to.
    #[arg(long, value_name = "URL")]
    title_url: Option<String>,

    /// Image embedded in every report.
    #[arg(long, value_name = "URL")]
    image: Option<String>,

    /// Author name shown on reports.
    #[arg(long, value_name = "NAME")]
    user_name: Option<String>,

    /// Author email; used to derive a gravatar icon when none is given.
    #[arg(long, value_name = "EMAIL")]
    user_email: Option<String>,

    /// Author icon URL.
    #[arg(long, value_name = "URL")]
    user_icon: Option<String>,

    /// URL the author name links to.
    #[arg(long, value_name = "URL")]
    user_url: Option<String>,

    /// Footer text.
    #[arg(long, value_name = "TEXT")]
    footer: Option<String>,

    /// Footer icon URL.
    #[arg(long, value_name = "URL")]
    footer_icon: Option<String>,

    /// Thumbnail for successful final reports.
    #[arg(long, value_name = "URL")]
    icon_success: Option<String>,

    /// Thumbnail for failed final reports.
    #[arg(long, value_name = "URL")]
    icon_failure: Option<String>,

    /// Thumbnail for forced reports.
    #[arg(long, value_name = "URL")]
    icon_warning: Option<String>,

    /// Thumbnail for periodic reports.
    #[arg(long, value_name = "URL")]
    icon_period: Option<String>,

    /// Thumbnail for timeout reports.
    #[arg(long, value_name = "URL")]
    icon_timeout: Option<String>,

    /// Send a periodic report every N seconds while the run is underway.
    #[arg(short = 'p', long = "periodic", value_name = "SECONDS")]
    periodic: Option<u64>,

    /// Terminate the run after N seconds.
    #[arg(short = 't', long = "timeout", value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Lines kept per stream buffer.
    #[arg(long, value_name = "LINES")]
    buffer_size: Option<usize>,

    /// Command to run. Without one, standard input is consumed instead.
    #[arg(trailing_var_arg = true, value_name = "COMMAND")]
    command: Vec<String>,
}

impl Cli {
    /// Command-line options as the highest-precedence configuration layer.
    fn overrides(&self) -> ConfigFile {
        ConfigFile {
            webhook: self.webhook.clone(),
            simple: self.simple.then_some(true),
            color: self.color,
            title_url: self.title_url.clone(),
            image: self.image.clone(),
            user_name: self.user_name.clone(),
            user_email: self.user_email.clone(),
            user_icon: self.user_icon.clone(),
            user_url: self.user_url.clone(),
            footer: self.footer.clone(),
            footer_icon: self.footer_icon.clone(),
            icon_success: self.icon_success.clone(),
            icon_failure: self.icon_failure.clone(),
            icon_warning: self.icon_warning.clone(),
            icon_period: self.icon_period.clone(),
            icon_timeout: self.icon_timeout.clone(),
            periodic: self.periodic,
            timeout: self.timeout,
            buffer_size: self.buffer_size,
        }
    }
}

fn parse_color(raw: &str) -> Result<u32, String> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|_| format!("`{raw}` is not a color (decimal or 0x-prefixed hex)"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PINGBACK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// File layers, then command-line overrides, then derived fields.
fn assemble_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = Config::load()?;
    config.apply(cli.overrides());
    config.derive_user_icon();
    config.validate()?;
    Ok(config)
}

fn supervise(config: Arc<Config>, command: Vec<String>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    let result = runtime.block_on(async {
        if std::env::var_os("PINGBACK_TESTING").is_some() {
            run(config, command, StdoutWebhookAdapter).await
        } else {
            let webhook = HttpWebhookAdapter::new().context("failed to build HTTP client")?;
            run(config, command, webhook).await
        }
    });
    // Reads from our own stdin run on blocking-pool threads that cannot be
    // cancelled; a pipe held open past the run must not pin the process at
    // exit, so the runtime is discarded rather than joined.
    runtime.shutdown_background();
    result
}

async fn run<W: WebhookAdapter>(
    config: Arc<Config>,
    command: Vec<String>,
    webhook: W,
) -> anyhow::Result<()> {
    let emitter = Emitter::new(Arc::clone(&config), webhook);
    let mut supervisor = Supervisor::spawn(config, command, emitter, SystemClock)?;
    wire_signals(supervisor.control_handle());
    supervisor.wait().await?;
    Ok(())
}

/// SIGUSR1 forces an extra report; SIGINT and SIGTERM interrupt the run. The
/// handlers only post control events; the supervisor's control loop does the
/// rest.
fn wire_signals(handle: ControlHandle) {
    let forced = handle.clone();
    tokio::spawn(async move {
        let Ok(mut usr1) = signal(SignalKind::user_defined1()) else {
            return;
        };
        while usr1.recv().await.is_some() {
            forced.force_report();
        }
    });

    tokio::spawn(async move {
        let Ok(mut term) = signal(SignalKind::terminate()) else {
            return;
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
        handle.interrupt();
    });
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let config = match assemble_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("pingback: {err}");
            return ExitCode::from(3);
        }
    };

    // A failing child is reported, not an error: supervision itself exits 0.
    match supervise(Arc::new(config), cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("pingback: {err:#}");
            if err.is::<SuperviseError>() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
