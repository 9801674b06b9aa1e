use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framegrab::{
    Coordinator, ExtractorFactory, FfmpegExtractor, FfmpegLogLevel, FrameExtractor,
    GrabController, GrabError, GrabOptions, GrabReport, GrabState, ImageFormat, SessionEvent,
    Size, StripMode, TimeRange, VideoRange, probe_video,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tokio_stream::StreamExt;

const CLI_AFTER_HELP: &str = "Examples:\n  framegrab grab input.mp4 --out grabs\n  framegrab grab input.mp4 --out grabs --period 10 --format png --strip-mode gradient --progress\n  framegrab grab input.mp4 --out grabs --start 00:01:00 --end 00:02:00 --json\n  framegrab completions zsh > _framegrab";

#[derive(Debug, Parser)]
#[command(
    name = "framegrab",
    version,
    about = "Grab frames from a video and build color strips and summary grids",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long)]
    progress: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, debug).
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Grab frames and build the strip and summary images.
    #[command(
        about = "Grab frames from a video",
        after_help = "Examples:\n  framegrab grab input.mp4 --out grabs --period 5\n  framegrab grab input.mp4 --out grabs --config preferences.json --open"
    )]
    Grab {
        /// Input video path.
        input: PathBuf,
        /// Export directory.
        #[arg(long)]
        out: PathBuf,
        /// Time between grabs (seconds, MM:SS or HH:MM:SS).
        #[arg(long)]
        period: Option<String>,
        /// Frame and strip format (jpeg, png, tiff, bmp).
        #[arg(long)]
        format: Option<String>,
        /// Maximum number of colors in the strip.
        #[arg(long)]
        colors: Option<usize>,
        /// Strip width in pixels.
        #[arg(long)]
        strip_width: Option<u32>,
        /// Strip height in pixels.
        #[arg(long)]
        strip_height: Option<u32>,
        /// Strip layout (linear, gradient).
        #[arg(long)]
        strip_mode: Option<String>,
        /// Grab from this time onwards.
        #[arg(long)]
        start: Option<String>,
        /// Grab up to this time.
        #[arg(long)]
        end: Option<String>,
        /// Font used for the summary header and labels.
        #[arg(long)]
        font: Option<PathBuf>,
        /// JSON preferences file; flags override its values.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print the export directory once the grab completes.
        #[arg(long)]
        open: bool,
        /// Print the result as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_timecode(value: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        return Ok(Duration::try_from_secs_f64(seconds.max(0.0))?);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(format!("invalid time format: {trimmed}").into());
    }

    let (hours, minutes, seconds_str) = if parts.len() == 3 {
        (parts[0].parse::<u64>()?, parts[1].parse::<u64>()?, parts[2])
    } else {
        (0_u64, parts[0].parse::<u64>()?, parts[1])
    };

    let seconds = seconds_str.parse::<f64>()?;
    let total_seconds = (hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds;
    Ok(Duration::try_from_secs_f64(total_seconds.max(0.0))?)
}

/// Reports host requests on the terminal.
struct TerminalCoordinator;

impl Coordinator for TerminalCoordinator {
    fn present_error(&self, error: &GrabError) {
        eprintln!("{} {}", "error:".red().bold(), error.to_string().red());
        if let Some(reason) = error.failure_reason() {
            eprintln!("       {reason}");
        }
    }

    fn request_export_directory(&self, title: &str) {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("choose an export directory for {title} with --out").yellow()
        );
    }

    fn open_directory(&self, directory: &Path) {
        println!("{} {}", "open:".cyan().bold(), directory.display());
    }
}

struct GrabArguments {
    input: PathBuf,
    out: PathBuf,
    period: Option<String>,
    format: Option<String>,
    colors: Option<usize>,
    strip_width: Option<u32>,
    strip_height: Option<u32>,
    strip_mode: Option<String>,
    start: Option<String>,
    end: Option<String>,
    font: Option<PathBuf>,
    config: Option<PathBuf>,
    open: bool,
    json: bool,
}

fn build_options(arguments: &GrabArguments) -> Result<GrabOptions, Box<dyn std::error::Error>> {
    let mut options = match &arguments.config {
        Some(path) => GrabOptions::from_path(path)?,
        None => GrabOptions::new(),
    };

    if let Some(period) = &arguments.period {
        options = options.with_period(parse_timecode(period)?);
    }
    if let Some(format) = &arguments.format {
        options = options.with_format(format.parse::<ImageFormat>()?);
    }
    if let Some(colors) = arguments.colors {
        options = options.with_color_count(colors);
    }
    if arguments.strip_width.is_some() || arguments.strip_height.is_some() {
        let size = Size::new(
            arguments.strip_width.unwrap_or(options.strip_size.width),
            arguments.strip_height.unwrap_or(options.strip_size.height),
        );
        options = options.with_strip_size(size);
    }
    if let Some(mode) = &arguments.strip_mode {
        options = options.with_strip_mode(mode.parse::<StripMode>()?);
    }
    if let Some(font) = &arguments.font {
        options = options.with_font_path(font);
    }
    if arguments.open {
        options = options.with_open_directory_after_completion(true);
    }
    Ok(options)
}

async fn grab(
    arguments: GrabArguments,
    global: &GlobalOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = build_options(&arguments)?;
    let period = options.period;

    let mut video = probe_video(&arguments.input)?.with_export_directory(&arguments.out);
    if arguments.start.is_some() || arguments.end.is_some() {
        let start = match &arguments.start {
            Some(value) => parse_timecode(value)?,
            None => Duration::ZERO,
        };
        let end = match &arguments.end {
            Some(value) => parse_timecode(value)?,
            None => video.duration,
        };
        video = video.with_range(VideoRange::Excerpt(TimeRange::new(start, end)?));
    }

    if global.verbose {
        eprintln!(
            "grabbing {} ({}x{}, {:?}) every {:?}",
            video.title, video.resolution.width, video.resolution.height, video.duration, period
        );
    }

    let factory: Arc<dyn ExtractorFactory> =
        Arc::new(|| Box::new(FfmpegExtractor::new()) as Box<dyn FrameExtractor>);
    let coordinator: Arc<dyn Coordinator> = Arc::new(TerminalCoordinator);
    let controller = GrabController::spawn(video, options, factory)?.with_coordinator(&coordinator);

    let mut events = controller.events();
    controller.start_grab(period).await?;

    let progress_bar = if global.progress {
        let pb = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        pb.set_style(style.progress_chars("##-"));
        Some(pb)
    } else {
        None
    };

    let mut report: Option<GrabReport> = None;
    let mut last_error: Option<String> = None;
    while let Some(event) = events.next().await {
        match event {
            SessionEvent::Progress { progress, .. } => {
                if let Some(pb) = &progress_bar {
                    pb.set_length(progress.total());
                    pb.set_position(progress.current());
                }
            }
            SessionEvent::Timecode(timecode) => {
                if let Some(pb) = &progress_bar {
                    pb.set_message(framegrab::timecode::format_clock(timecode));
                }
                if global.verbose {
                    eprintln!("grabbed {}", framegrab::timecode::format_clock(timecode));
                }
            }
            SessionEvent::StateChanged(GrabState::Calculating) => {
                if let Some(pb) = &progress_bar {
                    pb.set_message("calculating");
                }
            }
            SessionEvent::StripCreated(path) if global.verbose => {
                eprintln!("strip written to {}", path.display());
            }
            SessionEvent::SummaryCreated(path) if global.verbose => {
                eprintln!("summary written to {}", path.display());
            }
            SessionEvent::Error(error) => last_error = Some(error.to_string()),
            SessionEvent::GrabFinished(finished) => {
                report = Some(finished);
                break;
            }
            SessionEvent::StateChanged(GrabState::Canceled) => break,
            _ => {}
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message("done");
    }
    controller.shutdown().await?;

    let Some(report) = report else {
        return Err(last_error
            .unwrap_or_else(|| "grab was canceled".to_string())
            .into());
    };

    if arguments.json {
        let payload = json!({
            "report": report,
            "errors": last_error,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "{} {}",
            "success:".green().bold(),
            format!(
                "Grabbed {} frame(s) of {} in {:.1}s",
                report.shots, report.title, report.elapsed_seconds
            )
            .green()
        );
        if let Some(strip) = &report.strip {
            println!("Strip: {}", strip.display());
        }
        if let Some(summary) = &report.summary {
            println!("Summary: {}", summary.display());
        }
        if let Some(error) = last_error {
            eprintln!("{} {}", "warning:".yellow().bold(), error.yellow());
        }
    }
    Ok(())
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed = level.parse::<FfmpegLogLevel>()?;
        framegrab::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Grab {
            input,
            out,
            period,
            format,
            colors,
            strip_width,
            strip_height,
            strip_mode,
            start,
            end,
            font,
            config,
            open,
            json,
        } => {
            let arguments = GrabArguments {
                input,
                out,
                period,
                format,
                colors,
                strip_width,
                strip_height,
                strip_mode,
                start,
                end,
                font,
                config,
                open,
                json,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(grab(arguments, &cli.global))?;
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framegrab", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use framegrab::{ImageFormat, StripMode};

    use super::{GrabArguments, build_options, parse_timecode};

    fn arguments() -> GrabArguments {
        GrabArguments {
            input: PathBuf::from("input.mp4"),
            out: PathBuf::from("grabs"),
            period: None,
            format: None,
            colors: None,
            strip_width: None,
            strip_height: None,
            strip_mode: None,
            start: None,
            end: None,
            font: None,
            config: None,
            open: false,
            json: false,
        }
    }

    #[test]
    fn parse_timecode_formats() {
        let seconds = parse_timecode("75").unwrap();
        assert_eq!(seconds.as_secs(), 75);

        let mm_ss = parse_timecode("01:15").unwrap();
        assert_eq!(mm_ss.as_secs(), 75);

        let hh_mm_ss = parse_timecode("00:01:15.5").unwrap();
        assert_eq!(hh_mm_ss.as_secs(), 75);

        assert!(parse_timecode("").is_err());
        assert!(parse_timecode("1:2:3:4").is_err());
    }

    #[test]
    fn out_of_range_times_are_errors() {
        assert!(parse_timecode("inf").is_err());
        assert!(parse_timecode("1e400").is_err());
        assert!(parse_timecode("1e30").is_err());
        assert!(parse_timecode("00:00:1e30").is_err());

        let mut arguments = arguments();
        arguments.period = Some("inf".to_string());
        assert!(build_options(&arguments).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let mut arguments = arguments();
        arguments.period = Some("10".to_string());
        arguments.format = Some("png".to_string());
        arguments.strip_width = Some(640);
        arguments.strip_mode = Some("gradient".to_string());
        arguments.open = true;

        let options = build_options(&arguments).unwrap();
        assert_eq!(options.period.as_secs(), 10);
        assert_eq!(options.format, ImageFormat::Png);
        assert_eq!(options.strip_size.width, 640);
        assert_eq!(options.strip_size.height, 128);
        assert_eq!(options.strip_mode, StripMode::Gradient);
        assert!(options.open_directory_after_completion);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let mut arguments = arguments();
        arguments.format = Some("webm".to_string());
        assert!(build_options(&arguments).is_err());
    }
}
