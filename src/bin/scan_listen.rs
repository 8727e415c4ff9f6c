//! scan-listen: print barcode scans read from the terminal.
//!
//! Puts the terminal in raw mode, focuses a single text field, and prints
//! every scan the listener detects. Ordinary typing lands in the field and is
//! echoed on Enter. Ctrl+C exits.

use std::cell::Cell;
use std::io::{stdout, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::info;

use spark_scan::scanner::{listen, ScannerOptions, Silent, TerminalBell};
use spark_scan::state::{focus, input, keyboard, ElementKind};

#[derive(Parser, Debug)]
#[command(name = "scan-listen", version, about = "Detect barcode scanner input in the terminal")]
struct Cli {
    /// Scanner options file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum characters for a scan
    #[arg(long)]
    min_length: Option<usize>,

    /// Maximum gap between scanner keystrokes, in milliseconds
    #[arg(long)]
    max_delay_ms: Option<u64>,

    /// Do not ring the terminal bell on a scan
    #[arg(long)]
    quiet: bool,
}

/// Restores cooked mode however we leave.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        enable_raw_mode().context("enable raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut options = match &cli.config {
        Some(path) => ScannerOptions::load(path)
            .with_context(|| format!("load scanner config {}", path.display()))?,
        None => ScannerOptions::default(),
    };
    if let Some(min_length) = cli.min_length {
        options = options.with_min_length(min_length);
    }
    if let Some(ms) = cli.max_delay_ms {
        options = options.with_max_delay(Duration::from_millis(ms));
    }
    options.validate().context("invalid scanner options")?;

    info!(
        min_length = options.min_length,
        max_delay_ms = options.max_delay.as_millis() as u64,
        "listening for scans"
    );

    let field = focus::register_element(ElementKind::TextInput, None);
    focus::focus(field);

    let on_scan = |code: &str| {
        print!("scan: {code}\r\n");
        let _ = stdout().flush();
    };
    let handle = if cli.quiet {
        listen(options, on_scan, Silent)?
    } else {
        listen(options, on_scan, TerminalBell)?
    };

    let running = Rc::new(Cell::new(true));
    let running_clone = running.clone();
    let quit = keyboard::on(move |event| {
        if event.modifiers.ctrl && event.key == "c" {
            running_clone.set(false);
            true
        } else {
            false
        }
    });
    let submit = keyboard::on_key("Enter", move || {
        let typed = focus::get_value(field);
        if !typed.is_empty() {
            print!("typed: {typed}\r\n");
            let _ = stdout().flush();
            focus::clear_value(field);
        }
        true
    });

    let _raw = RawModeGuard::enable()?;
    while running.get() {
        if let Some(event) = input::poll_event(Duration::from_millis(50)).context("read terminal input")? {
            input::route_event(event);
        }
    }

    submit();
    quit();
    handle.stop();
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
