use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::AsyncBufReadExt;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use typist::analysis::{PauseAnalysisOptions, PauseHints};
use typist::bridge::HelperBridge;
use typist::controller::{SessionController, StartOptions};
use typist::delay;
use typist::estimate;
use typist::events::{SessionEvent, StatusSnapshot};
use typist::paragraph::{break_channel, count_paragraphs, BreakReceiver, BreakRequest};
use typist::session::{RunReport, SessionHandle};
use typist::settings::{Settings, SettingsPatch};
use typist::sink::{resolve_sink, SinkTarget};
use typist::verify;

const DEFAULT_LLM_MODEL: &str = typist::analysis::openrouter::DEFAULT_MODEL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SinkTargetArg {
    Auto,
    Console,
    Buffer,
}

impl SinkTargetArg {
    fn to_library(self) -> SinkTarget {
        match self {
            SinkTargetArg::Auto => SinkTarget::Auto,
            SinkTargetArg::Console => SinkTarget::Console,
            SinkTargetArg::Buffer => SinkTarget::Buffer,
        }
    }
}

#[derive(Debug, Args, Clone)]
struct SettingsArgs {
    /// Typing speed in words per minute.
    #[arg(long, default_value_t = 60)]
    wpm: u32,

    /// Random speed variation around the base delay, in percent (0-100).
    #[arg(long, default_value_t = 20)]
    variance: u8,

    /// Typo probability per character, in percent (0-100).
    #[arg(long, default_value_t = 5)]
    mistake_rate: u8,

    /// Ask for continuation approval every N paragraphs (0 disables).
    #[arg(long, default_value_t = 2)]
    paragraph_breaks: usize,

    /// Disable the extra hesitation after sentence punctuation.
    #[arg(long)]
    no_thinking_pause: bool,

    /// Disable typo injection and the corrections that follow.
    #[arg(long)]
    no_self_correction: bool,
}

impl SettingsArgs {
    fn to_settings(&self) -> Settings {
        Settings {
            wpm: self.wpm,
            variance: self.variance,
            mistake_rate: self.mistake_rate,
            thinking_pause: !self.no_thinking_pause,
            self_correction: !self.no_self_correction,
            paragraph_breaks: self.paragraph_breaks,
        }
    }
}

#[derive(Debug, Args, Clone)]
struct LlmArgs {
    /// Enable LLM pause analysis via OpenRouter.
    ///
    /// Requires `--features llm`. Failures fall back to rule-based delays.
    #[arg(long)]
    llm: bool,

    /// OpenRouter model name.
    #[arg(long, default_value_t = DEFAULT_LLM_MODEL.to_string(), requires = "llm")]
    llm_model: String,

    /// Maximum number of hesitation points to request.
    #[arg(long, default_value_t = 40, requires = "llm")]
    llm_max_hints: usize,
}

#[derive(Debug, Parser)]
#[command(name = "typist")]
#[command(about = "Human-like typing simulator for terminals and automation helpers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Type a text into the selected target
    Run {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Typing target.
        ///
        /// - auto: console when stdout is a terminal, otherwise an error
        /// - console: force console output even when stdout is redirected
        /// - buffer: type into an in-memory buffer (silent run)
        #[arg(long, value_enum, default_value_t = SinkTargetArg::Auto)]
        target: SinkTargetArg,

        /// Countdown seconds before typing starts
        #[arg(long, default_value_t = 3)]
        countdown: u64,

        /// Optional RNG seed (for debugging)
        #[arg(long)]
        seed: Option<u64>,

        /// Delegate the run to an automation helper at this base URL.
        #[arg(long, value_name = "URL")]
        helper: Option<String>,

        /// Print a JSON run report to stdout when the session ends
        #[arg(long)]
        report: bool,

        #[command(flatten)]
        settings: SettingsArgs,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Rehearse a text in memory and report the expected pace
    Preview {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Optional RNG seed (for debugging)
        #[arg(long)]
        seed: Option<u64>,

        /// Print the full rehearsal as JSON to stdout
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Check whether an automation helper is reachable
    Probe {
        /// Helper base URL
        #[arg(long, value_name = "URL", default_value_t = typist::bridge::DEFAULT_HELPER_URL.to_string())]
        helper: String,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == std::ffi::OsStr::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

async fn countdown_before_typing(countdown: u64) {
    if countdown == 0 {
        return;
    }
    eprintln!("Starting in {countdown}s... (Ctrl+C aborts)");
    for remaining in (1..=countdown).rev() {
        eprintln!("{remaining}...");
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

async fn maybe_analyze_pauses(text: &str, llm: &LlmArgs) -> PauseHints {
    if !llm.llm {
        return PauseHints::none();
    }

    let options = PauseAnalysisOptions {
        max_hints: llm.llm_max_hints,
    };

    match fetch_pause_hints(text, &llm.llm_model, options).await {
        Ok(hints) => {
            eprintln!("Pause analysis: {} hesitation points.", hints.len());
            hints
        }
        Err(err) => {
            eprintln!("Pause analysis unavailable ({err:#}). Falling back to rule-based delays.");
            PauseHints::none()
        }
    }
}

async fn fetch_pause_hints(
    text: &str,
    model: &str,
    options: PauseAnalysisOptions,
) -> Result<PauseHints> {
    use typist::analysis::openrouter::OpenRouterPauseAnalysisClient;

    let client = OpenRouterPauseAnalysisClient::from_env()?.with_model(model.to_string());
    client.analyze_pauses(text, options).await
}

fn remaining_secs(settings: &Settings, snapshot: &StatusSnapshot) -> f64 {
    let remaining = snapshot.total_length.saturating_sub(snapshot.cursor_position);
    delay::base_delay_ms(settings.wpm) * remaining as f64 / 1000.0
}

/// 1-based ordinal of the paragraph being typed, clamped for display.
fn paragraph_ordinal(snapshot: &StatusSnapshot) -> usize {
    (snapshot.current_paragraph + 1).min(snapshot.total_paragraphs.max(1))
}

fn print_event(handle: &SessionHandle, event: &SessionEvent) {
    match event {
        SessionEvent::Progress { snapshot } => {
            let eta = remaining_secs(&handle.settings(), snapshot);
            eprintln!(
                "[{:>3}%] {}/{} chars, paragraph {}/{}, ~{eta:.0}s left",
                snapshot.percentage,
                snapshot.cursor_position,
                snapshot.total_length,
                paragraph_ordinal(snapshot),
                snapshot.total_paragraphs.max(1),
            );
        }
        SessionEvent::Completed { snapshot } => {
            eprintln!("[100%] all {} characters typed.", snapshot.total_length);
        }
        SessionEvent::RecoveryRequired { snapshot } => {
            eprintln!(
                "Target focus lost at {}/{} chars; type `resume` to continue.",
                snapshot.cursor_position, snapshot.total_length
            );
        }
        SessionEvent::CorrectionNotice { position } => {
            debug!(position, "typo injected and corrected");
        }
    }
}

fn apply_patch(handle: &SessionHandle, patch: SettingsPatch) {
    if let Err(e) = handle.update_settings(&patch) {
        eprintln!("{e}");
    }
}

fn dispatch_command(handle: &SessionHandle, line: &str) {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return;
    };
    match command {
        "pause" => handle.pause(),
        "resume" => handle.resume(),
        "restart" => handle.restart(),
        "stop" => handle.stop(),
        "status" => {
            let snapshot = handle.snapshot();
            eprintln!(
                "{}: {}/{} chars ({}%), paragraph {}/{}",
                snapshot.status,
                snapshot.cursor_position,
                snapshot.total_length,
                snapshot.percentage,
                paragraph_ordinal(&snapshot),
                snapshot.total_paragraphs.max(1),
            );
        }
        "wpm" => match parts.next().map(str::parse::<u32>) {
            Some(Ok(wpm)) => apply_patch(
                handle,
                SettingsPatch {
                    wpm: Some(wpm),
                    ..Default::default()
                },
            ),
            _ => eprintln!("usage: wpm <words-per-minute>"),
        },
        "rate" => match parts.next().map(str::parse::<u8>) {
            Some(Ok(rate)) => apply_patch(
                handle,
                SettingsPatch {
                    mistake_rate: Some(rate),
                    ..Default::default()
                },
            ),
            _ => eprintln!("usage: rate <percent>"),
        },
        other => eprintln!(
            "unknown command: {other} (pause, resume, restart, stop, status, wpm N, rate N)"
        ),
    }
}

/// Reads operator input while a session runs. Every line is either the
/// answer to an outstanding break prompt or a control command.
async fn command_loop(handle: SessionHandle, mut breaks: BreakReceiver) {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut pending: Option<BreakRequest> = None;

    loop {
        tokio::select! {
            request = breaks.recv() => {
                let Some(request) = request else { break };
                eprintln!(
                    "Paragraph {}/{} done ({}% typed). Continue? [y/N]",
                    request.current_paragraph, request.total_paragraphs, request.percentage
                );
                pending = Some(request);
            }
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let line = line.trim().to_ascii_lowercase();
                if let Some(request) = pending.take() {
                    request.respond(matches!(line.as_str(), "y" | "yes"));
                    continue;
                }
                dispatch_command(&handle, &line);
            }
        }
    }
}

fn print_outcome(report: &RunReport) {
    let snapshot = &report.final_snapshot;
    eprintln!(
        "\nSession {}: {}/{} characters ({}%), {} corrections, {:.1}s elapsed",
        snapshot.status,
        snapshot.cursor_position,
        snapshot.total_length,
        snapshot.percentage,
        report.mistakes_injected,
        report.elapsed.as_secs_f64(),
    );
}

#[allow(clippy::too_many_arguments)]
async fn run_local(
    text: String,
    settings: Settings,
    target: SinkTarget,
    countdown: u64,
    seed: Option<u64>,
    interactive: bool,
    report: bool,
    llm: &LlmArgs,
) -> Result<()> {
    // Fail fast before the countdown if no typing target is available.
    let sink = resolve_sink(target)?;

    eprintln!(
        "Typing {} characters across {} paragraphs into {}.",
        text.chars().count(),
        count_paragraphs(&text),
        sink.describe()
    );

    let pause_hints = maybe_analyze_pauses(&text, llm).await;

    countdown_before_typing(countdown).await;

    let (mut controller, mut events) = SessionController::new();
    let (break_tx, break_rx) = break_channel();
    let handle = controller.start(
        text,
        settings,
        sink,
        StartOptions {
            seed,
            break_requests: interactive.then_some(break_tx),
            focus_signals: None,
            pause_hints,
        },
    )?;

    // First Ctrl+C asks the session to stop; a second one force-exits.
    {
        let handle = handle.clone();
        ctrlc::set_handler(move || {
            if handle.status().is_terminal() {
                std::process::exit(130);
            }
            eprintln!("\nStopping after the current keystroke...");
            handle.stop();
        })
        .context("failed to install Ctrl+C handler")?;
    }

    let commands = interactive.then(|| tokio::spawn(command_loop(handle.clone(), break_rx)));

    let printer_handle = handle.clone();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&printer_handle, &event);
        }
    });

    let outcome = controller.wait().await;

    // Dropping the controller closes the event channel so the printer drains.
    drop(controller);
    if let Some(task) = commands {
        task.abort();
    }
    let _ = printer.await;

    if let Some(run_report) = outcome? {
        print_outcome(&run_report);
        if report {
            let json = serde_json::to_string_pretty(&run_report)
                .context("failed to serialize run report")?;
            println!("{json}");
        }
    }
    Ok(())
}

async fn run_with_helper(
    base_url: &str,
    text: String,
    settings: Settings,
    countdown: u64,
) -> Result<()> {
    let bridge = HelperBridge::new(base_url)?;
    let status = bridge
        .status()
        .await
        .with_context(|| format!("helper at {} is unreachable", bridge.base_url()))?;
    if !status.is_online() {
        bail!(
            "helper at {} reported status '{}'",
            bridge.base_url(),
            status.status
        );
    }
    if status.is_typing {
        bail!("helper at {} is already typing", bridge.base_url());
    }
    let version = status.version.as_deref().unwrap_or("unknown");
    eprintln!("Helper online at {} (version {version}).", bridge.base_url());

    countdown_before_typing(countdown).await;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
        })
        .context("failed to install Ctrl+C handler")?;
    }

    bridge.start_typing(&text, &settings).await?;
    eprintln!("Typing delegated to the helper; Ctrl+C forwards a stop.");

    let mut failures = 0u32;
    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        if stop.swap(false, Ordering::SeqCst) {
            eprintln!("\nStopping the helper...");
            bridge.stop_typing().await?;
        }
        match bridge.status().await {
            Ok(status) => {
                failures = 0;
                if !status.is_typing {
                    break;
                }
            }
            Err(e) => {
                failures += 1;
                if failures >= 3 {
                    return Err(e).context("helper stopped responding");
                }
                warn!(error = %e, "helper status poll failed");
            }
        }
    }

    eprintln!("Helper finished.");
    Ok(())
}

fn preview(text: &str, settings: &Settings, seed: Option<u64>, json: bool) -> Result<()> {
    let mut rng = rng_from_seed(seed);
    let rehearsal = estimate::rehearse(text, settings, &mut rng)?;

    if !verify::matches(text, &rehearsal.typed) {
        let position = verify::first_divergence(text, &rehearsal.typed);
        bail!("rehearsal drifted from the source text at position {position:?}; this is a bug in the correction replay");
    }

    eprintln!(
        "Rehearsed: {} chars, {} paragraphs, {} corrections, ~{:.1} min at {} WPM",
        rehearsal.chars,
        rehearsal.paragraphs,
        rehearsal.mistakes,
        rehearsal.estimated_ms as f64 / 1000.0 / 60.0,
        settings.wpm
    );

    if json {
        let out = serde_json::to_string_pretty(&rehearsal)
            .context("failed to serialize rehearsal")?;
        println!("{out}");
    }

    Ok(())
}

async fn probe(helper: &str) -> Result<()> {
    let bridge = HelperBridge::new(helper)?;
    match bridge.status().await {
        Ok(status) if status.is_online() => {
            let version = status.version.as_deref().unwrap_or("unknown");
            let uptime = status
                .uptime_seconds
                .map(|s| format!(", up {s:.0}s"))
                .unwrap_or_default();
            let busy = if status.is_typing {
                ", currently typing"
            } else {
                ""
            };
            println!(
                "Helper at {} is online (version {version}{uptime}{busy}).",
                bridge.base_url()
            );
            Ok(())
        }
        Ok(status) => {
            println!(
                "Helper at {} reported status '{}'.",
                bridge.base_url(),
                status.status
            );
            std::process::exit(1);
        }
        Err(e) => {
            println!("Helper at {} is offline ({e}).", bridge.base_url());
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            input,
            target,
            countdown,
            seed,
            helper,
            report,
            settings,
            llm,
        } => {
            let text = read_input(&input)?;
            let from_stdin = input.as_os_str() == std::ffi::OsStr::new("-");
            let settings = settings.to_settings();
            settings.validate()?;

            if let Some(helper) = helper {
                if llm.llm {
                    bail!("--llm applies to local typing only and cannot be combined with --helper");
                }
                return run_with_helper(&helper, text, settings, countdown).await;
            }

            if from_stdin && settings.paragraph_breaks > 0 {
                eprintln!(
                    "Reading the text from stdin leaves no channel for break prompts; \
                     the first configured break will stop the session. \
                     Pass --paragraph-breaks 0 to type straight through."
                );
            }

            run_local(
                text,
                settings,
                target.to_library(),
                countdown,
                seed,
                !from_stdin,
                report,
                &llm,
            )
            .await
        }
        Command::Preview {
            input,
            seed,
            json,
            settings,
        } => {
            let text = read_input(&input)?;
            let settings = settings.to_settings();
            preview(&text, &settings, seed, json)
        }
        Command::Probe { helper } => probe(&helper).await,
    }
}
