use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use crate::config::AppConfig;
use crate::controller::WipeController;
use crate::core_logic::{StopReason, WipeReport, WipeStatus};
use crate::io_controller::{EventSink, ProgressUpdate};

#[derive(Parser, Debug)]
#[command(
    name = "wipefree",
    about = "Fill a volume's free space with zeros to overwrite deleted data",
    version
)]
pub struct Cli {
    /// Directory on the volume to wipe
    pub base_dir: PathBuf,

    /// Name of the filler file created inside BASE_DIR
    #[arg(short = 'n', long, default_value = "wipe.bin")]
    pub file_name: String,

    /// Bytes per write; overrides the config file
    #[arg(short, long)]
    pub block_size: Option<usize>,

    /// TOML file with block_size / progress_interval_ms
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Overwrite an existing filler file without asking
    #[arg(short, long)]
    pub force: bool,

    /// Print progress and the final report as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonEvent<'a> {
    Progress(&'a ProgressUpdate),
    Done(&'a WipeReport),
}

struct ConsoleSink {
    json: bool,
}

impl ConsoleSink {
    fn print_json(&self, event: JsonEvent<'_>) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("[ERROR] Unable to encode event: {}", e),
        }
    }
}

impl EventSink for ConsoleSink {
    fn progress(&self, update: ProgressUpdate) {
        if self.json {
            self.print_json(JsonEvent::Progress(&update));
            return;
        }
        let time_left = update
            .time_left
            .map(fmt_hms)
            .unwrap_or_else(|| "--:--:--".to_string());
        println!(
            "[PROGRESS] Written {}, {}, elapsed {}, left {}",
            fmt_bytes(update.total_bytes as f64),
            fmt_rate(update.throughput_bps),
            fmt_hms(update.elapsed),
            time_left
        );
    }

    fn done(&self, report: &WipeReport) {
        if self.json {
            self.print_json(JsonEvent::Done(report));
            return;
        }
        let summary = format!(
            "{} in {}",
            fmt_bytes(report.total_bytes_written as f64),
            fmt_hms(report.elapsed)
        );
        match &report.status {
            WipeStatus::Completed(StopReason::Exhausted) => {
                println!("[RESULT] Done! Free space filled: {}", summary)
            }
            WipeStatus::Completed(StopReason::UserStopped) => {
                println!("[RESULT] Stopped by user: {}", summary)
            }
            WipeStatus::Failed(message) => println!("[ERROR] Wipe failed: {}", message),
        }
    }
}

fn fmt_bytes(bytes: f64) -> String {
    const GB: f64 = 1_073_741_824.0;
    const MB: f64 = 1_048_576.0;
    const KB: f64 = 1_024.0;
    if bytes >= GB {
        format!("{:.2} GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes / KB)
    } else {
        format!("{:.0} B", bytes)
    }
}

fn fmt_rate(bytes_per_sec: f64) -> String {
    fmt_bytes(bytes_per_sec) + "/s"
}

fn fmt_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(block_size) = cli.block_size {
        config.block_size = block_size;
    }
    config.validate().context("invalid settings")?;
    Ok(config)
}

fn confirm_overwrite(path: &Path) -> Result<bool> {
    eprint!(
        "[WARN] {} exists and will be overwritten. Continue? [y/N]: ",
        path.display()
    );
    io::stderr()
        .flush()
        .context("Failed to prompt for confirmation.")?;
    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .context("Failed to read confirmation.")?;
    let response = response.trim().to_ascii_lowercase();
    Ok(response == "y" || response == "yes")
}

/// Any line on stdin asks the running job to stop.
fn watch_stdin() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        if let Ok(n) = io::stdin().lock().read_line(&mut line) {
            if n > 0 {
                let _ = tx.send(());
            }
        }
    });
    rx
}

pub fn run_cli(cli: Cli) -> i32 {
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            return 2;
        }
    };

    let target = match WipeController::resolve_target(&cli.base_dir, &cli.file_name) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            return 2;
        }
    };

    if target.is_dir() {
        eprintln!("[ERROR] Target path is a directory: {}", target.display());
        return 2;
    }

    if target.exists() && !cli.force {
        match confirm_overwrite(&target) {
            Ok(true) => {}
            Ok(false) => {
                eprintln!("[INFO] Aborted by user.");
                return 1;
            }
            Err(e) => {
                eprintln!("[ERROR] {:#}", e);
                return 2;
            }
        }
    }

    let mut controller = WipeController::new(config);
    let sink = Arc::new(ConsoleSink { json: cli.json });
    if let Err(e) = controller.start_path(&target, sink) {
        eprintln!("[ERROR] {}", e);
        return 2;
    }

    if !cli.json {
        eprintln!("[INFO] Writing {}. Press Enter to stop.", target.display());
    }
    let stop_requests = watch_stdin();
    while controller.is_running() {
        match stop_requests.recv_timeout(Duration::from_millis(100)) {
            Ok(()) => controller.cancel(),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {}
        }
    }

    match controller.wait() {
        Some(report) if report.status.is_failed() => 2,
        Some(_) => 0,
        None => 2,
    }
}
