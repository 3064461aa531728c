use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frame_timecode::config::{AppConfig, ConfigStore, OverlayConfig, ParseConfig};
use frame_timecode::record::LogRecord;
use frame_timecode::timecode::{FrameOutcome, LocationFollower, TimecodeOverlay, TimecodeParser};
use frame_timecode::video::format::PixelFormat;
use frame_timecode::video::{ClockTime, RawFrameReader, RawFrameWriter, Yuv420pBuffer};

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

/// frame-timecode command line arguments
#[derive(Parser, Debug)]
#[command(name = "frame-timecode")]
#[command(version, about = "Burn timecodes into raw video frames and measure latency", long_about = None)]
struct CliArgs {
    /// JSON configuration file, re-read while running when it changes
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Increase verbosity (-v for verbose, -vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stamp frames with timecode bands (sender side)
    Overlay(RunArgs),
    /// Read timecode bands and log latency (receiver side)
    Parse(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Raw planar input, `-` for stdin
    #[arg(short = 'i', long, value_name = "FILE")]
    input: PathBuf,

    /// Pass frames through to this file, `-` for stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Record log location (overrides config)
    #[arg(long, value_name = "PATH")]
    location: Option<PathBuf>,

    /// Frame width (overrides config)
    #[arg(long)]
    width: Option<u32>,

    /// Frame height (overrides config)
    #[arg(long)]
    height: Option<u32>,

    /// Frame rate used to derive timestamps (overrides config)
    #[arg(long)]
    fps: Option<u32>,

    /// Pixel format, I420 or YV12 (overrides config)
    #[arg(long, value_name = "FORMAT")]
    format: Option<PixelFormat>,

    /// Latency reported by the surrounding pipeline, in milliseconds
    #[arg(long, value_name = "MS")]
    pipeline_latency_ms: Option<u64>,

    /// Deliver frames without timestamps; every frame is passed through
    #[arg(long)]
    no_pts: bool,
}

/// Frame counters for the run summary
#[derive(Debug, Default)]
struct RunStats {
    frames: u64,
    processed: u64,
    skipped: u64,
}

impl RunStats {
    fn count<R>(&mut self, outcome: &FrameOutcome<R>) {
        self.frames += 1;
        if outcome.is_processed() {
            self.processed += 1;
        } else {
            self.skipped += 1;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    init_logging(args.log_level, args.verbose, args.log_json);

    tracing::info!("Starting frame-timecode v{}", env!("CARGO_PKG_VERSION"));

    let store = args
        .config
        .as_deref()
        .map(ConfigStore::new)
        .transpose()
        .context("Failed to load configuration")?;
    let mut config = store.as_ref().map(|s| (*s.get()).clone()).unwrap_or_default();

    let run = match &args.command {
        Command::Overlay(run) | Command::Parse(run) => run,
    };
    apply_overrides(&mut config, run);

    let stats = match args.command {
        Command::Overlay(ref run) => {
            let overlay_config = OverlayConfig {
                location: run.location.clone().unwrap_or_else(|| config.overlay.location.clone()),
            };
            let mut overlay = TimecodeOverlay::from_config(&overlay_config)
                .with_span(tracing::info_span!("overlay", input = %run.input.display()));
            tracing::info!(
                "Stamping frames, epoch offset {} s, logging to {}",
                overlay.epoch_offset(),
                overlay_config.location.display()
            );
            let follower = LocationFollower::new(
                overlay.control(),
                config.overlay.location.clone(),
                overlay_config.location,
            );
            run_loop(&config, run, store.as_ref(), follower, |c| &c.overlay.location, |buffer, pts| {
                overlay.process_frame(&mut buffer.as_frame_mut(pts))
            })?
        }
        Command::Parse(ref run) => {
            let parse_config = ParseConfig {
                location: run.location.clone().unwrap_or_else(|| config.parse.location.clone()),
            };
            let mut parser = TimecodeParser::from_config(&parse_config)
                .with_span(tracing::info_span!("parse", input = %run.input.display()));
            tracing::info!("Reading timecodes, logging to {}", parse_config.location.display());
            let follower = LocationFollower::new(
                parser.control(),
                config.parse.location.clone(),
                parse_config.location,
            );
            run_loop(&config, run, store.as_ref(), follower, |c| &c.parse.location, |buffer, pts| {
                parser.process_frame(&buffer.as_frame(pts))
            })?
        }
    };

    tracing::info!(
        "Done: {} frames, {} processed, {} passed through",
        stats.frames,
        stats.processed,
        stats.skipped
    );
    Ok(())
}

/// Apply command line overrides to the loaded configuration
fn apply_overrides(config: &mut AppConfig, run: &RunArgs) {
    if let Some(width) = run.width {
        config.video.width = width;
    }
    if let Some(height) = run.height {
        config.video.height = height;
    }
    if let Some(fps) = run.fps {
        config.video.fps = fps;
    }
    if let Some(format) = run.format {
        config.video.format = format;
    }
}

/// Feed every input frame through `process` and pass it on
///
/// About once per second of video the config file is checked and a changed
/// log location is handed to `follower`, which also retries a location
/// that failed to open.
fn run_loop<R, L, F>(
    config: &AppConfig,
    run: &RunArgs,
    store: Option<&ConfigStore>,
    mut follower: LocationFollower<R>,
    location_of: L,
    mut process: F,
) -> anyhow::Result<RunStats>
where
    R: LogRecord,
    L: Fn(&AppConfig) -> &PathBuf,
    F: FnMut(&mut Yuv420pBuffer, ClockTime) -> FrameOutcome<R>,
{
    let control = follower.control();
    if let Some(ms) = run.pipeline_latency_ms {
        control.set_pipeline_latency(Some(Duration::from_millis(ms)));
    }

    let layout = config.video.layout();
    tracing::info!(
        "Input {} {} @ {} fps, {} bytes per frame",
        config.video.format,
        config.video.resolution(),
        config.video.fps,
        layout.buffer_size()
    );

    let mut reader = RawFrameReader::new(open_input(&run.input)?, layout, config.video.fps);
    if run.no_pts {
        reader = reader.without_timestamps();
    }
    let mut writer = run.output.as_deref().map(open_output).transpose()?.map(RawFrameWriter::new);

    let reload_interval = u64::from(config.video.fps.max(1));
    let mut stats = RunStats::default();

    while let Some((mut buffer, pts)) = reader.next_frame()? {
        let outcome = process(&mut buffer, pts);
        stats.count(&outcome);

        if let Some(writer) = writer.as_mut() {
            writer.write_frame(&buffer)?;
        }

        if stats.frames % reload_interval == 0 {
            let updated = match store.map(ConfigStore::reload_if_changed).transpose() {
                Ok(updated) => updated.flatten(),
                Err(e) => {
                    tracing::warn!("Ignoring config change: {}", e);
                    None
                }
            };
            match updated {
                Some(updated) => follower.observe(location_of(&*updated)),
                None => follower.retry(),
            };
        }
    }

    if let Some(mut writer) = writer {
        writer.flush()?;
    }
    Ok(stats)
}

fn open_input(path: &Path) -> anyhow::Result<Box<dyn Read>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin().lock())));
    }
    let file = File::open(path).with_context(|| format!("Failed to open input {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: &Path) -> anyhow::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }
    let file = File::create(path).with_context(|| format!("Failed to create output {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Initialize logging with tracing
fn init_logging(level: LogLevel, verbose_count: u8, json: bool) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Verbose,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "frame_timecode=error",
        LogLevel::Warn => "frame_timecode=warn",
        LogLevel::Info => "frame_timecode=info",
        LogLevel::Verbose => "frame_timecode=debug,frame_timecode::timecode::decoder=info",
        LogLevel::Debug => "frame_timecode=debug",
        LogLevel::Trace => "frame_timecode=trace",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    // Frames may go to stdout, so logs always go to stderr
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().with_writer(io::stderr));
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr));

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}
