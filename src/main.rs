use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use sysinfo::System;

use overlay_watch::config::AppConfig;
use overlay_watch::error::AppResult;
use overlay_watch::{
    channel_sink, to_logical_rect, AlertDispatcher, EngineConfig, FrameSource, MatchEngine,
    ScreenCapture, TargetImage, TemplateMatcher,
};

const LOG_TARGET_STARTUP: &str = "overlay_watch::startup";

const USAGE: &str = "usage: overlay-watch [--check] [IMAGE]";

struct Args {
    image: Option<PathBuf>,
    check: bool,
}

impl Args {
    fn parse(args: impl Iterator<Item = String>) -> AppResult<Self> {
        let mut parsed = Args {
            image: None,
            check: false,
        };

        for arg in args {
            match arg.as_str() {
                "--check" => parsed.check = true,
                "-h" | "--help" => {
                    println!("{USAGE}");
                    std::process::exit(0);
                }
                flag if flag.starts_with('-') => bail!("unknown option {flag}\n{USAGE}"),
                _ if parsed.image.is_some() => bail!("only one target image may be given\n{USAGE}"),
                path => parsed.image = Some(PathBuf::from(path)),
            }
        }
        Ok(parsed)
    }
}

/// Initialize tracing with file rotation
///
/// Logs are written to `<config dir>/OverlayWatch/logs/overlay-watch.YYYY-MM-DD.log`.
/// Debug builds also log to the console.
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = AppConfig::logs_dir().unwrap_or_else(|_| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "overlay-watch.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!("Log directory: {}", log_dir.display());
}

fn log_runtime_environment() {
    let version = env!("CARGO_PKG_VERSION");
    let os_name = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| "Unknown OS".to_string());
    let kernel = System::kernel_version().unwrap_or_else(|| "Unknown Kernel".to_string());

    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Starting Overlay Watch v{} on ({})",
        version,
        std::env::consts::ARCH
    );
    tracing::info!(target: LOG_TARGET_STARTUP, "Operating System: {} (kernel {})", os_name, kernel);
    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Matcher threads: {}",
        rayon::current_num_threads()
    );
}

fn main() -> AppResult<()> {
    let args = Args::parse(std::env::args().skip(1))?;

    initialize_tracing();
    log_runtime_environment();

    let mut config = AppConfig::load();

    let Some(image_path) = args.image.or_else(|| config.last_image.clone()) else {
        bail!("no target image given and none remembered from a previous run\n{USAGE}");
    };
    let target = TargetImage::open(&image_path)
        .with_context(|| format!("Failed to load target image {}", image_path.display()))?;

    let capture = ScreenCapture::new();
    let scale_factor = capture
        .scale_factor()
        .context("Failed to query primary display (is screen recording permitted?)")?;
    let engine_config = config
        .engine_config(scale_factor)
        .context("Invalid settings in config file")?;

    if args.check {
        return run_check(capture, &target, &engine_config);
    }

    if config.last_image.as_ref() != Some(&image_path) {
        config.last_image = Some(image_path.clone());
        if let Err(err) = config.save() {
            tracing::warn!("Could not remember target image: {err}");
        }
    }

    let (tx, rx) = channel_sink();
    let engine = MatchEngine::with_config(Box::new(capture), Arc::new(tx), engine_config);
    engine
        .start(target, engine_config)
        .context("Failed to start match loop")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))
            .context("Failed to install Ctrl+C handler")?;
    }

    println!(
        "Watching for {} (threshold {:.0}%). Press Ctrl+C to stop.",
        image_path.display(),
        engine_config.threshold_confidence * 100.0
    );

    let mut dispatcher = AlertDispatcher::from_config(&config);
    let handled = dispatcher.run(&rx, &shutdown);

    engine.stop();
    tracing::info!("Shut down after {handled} events");
    Ok(())
}

/// Capture once, report the best match and exit.
fn run_check(
    mut capture: ScreenCapture,
    target: &TargetImage,
    config: &EngineConfig,
) -> AppResult<()> {
    let frame = capture.grab_full_screen().context("Screen capture failed")?;
    let result = TemplateMatcher::new().match_template(&frame, target)?;
    let rect = to_logical_rect(&result, config.scale_factor, config.border_width)?;

    let verdict = if result.confidence >= config.threshold_confidence {
        "MATCH"
    } else {
        "no match"
    };
    println!(
        "{verdict}: {:.1}% at ({}, {}) {}x{} (logical, border included)",
        result.confidence * 100.0,
        rect.x,
        rect.y,
        rect.width,
        rect.height
    );
    Ok(())
}
