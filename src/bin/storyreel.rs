use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "storyreel", version)]
struct Cli {
    /// JSON config file (generation defaults, fonts, output dir, logging).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a project into a video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Print the planned schedule as JSON.
    Plan(PlanArgs),
    /// Render a single scheduled frame as a PNG.
    Frame(FrameArgs),
}

#[derive(Args, Debug)]
struct ProjectArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frames per second.
    #[arg(long)]
    fps: Option<u32>,

    /// Cross-fade length in seconds.
    #[arg(long)]
    transition: Option<f64>,

    /// Use the decorative caption typeface.
    #[arg(long)]
    decorative_font: bool,

    /// Output width in pixels.
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Output height in pixels.
    #[arg(long, requires = "width")]
    height: Option<u32>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Directory the artifact is written into.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Output container.
    #[arg(long, value_enum)]
    format: Option<FormatChoice>,

    /// Background soundtrack (any format ffmpeg can decode).
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Push frames as fast as they render instead of in real time.
    #[arg(long)]
    unpaced: bool,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    project: ProjectArgs,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Webm,
    Mp4,
}

impl From<FormatChoice> for storyreel::ContainerFormat {
    fn from(c: FormatChoice) -> Self {
        match c {
            FormatChoice::Webm => Self::Webm,
            FormatChoice::Mp4 => Self::Mp4,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => storyreel::AppConfig::from_path(path)?,
        None => storyreel::AppConfig::default(),
    };
    init_logging(&config.logging);

    match cli.cmd {
        Command::Render(args) => cmd_render(args, config),
        Command::Plan(args) => cmd_plan(args, config),
        Command::Frame(args) => cmd_frame(args, config),
    }
}

fn init_logging(config: &storyreel::LoggingConfig) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish()).ok();
    } else {
        tracing::subscriber::set_global_default(builder.with_target(true).finish()).ok();
    }
}

fn load(
    args: &ProjectArgs,
    config: &storyreel::AppConfig,
) -> anyhow::Result<(storyreel::Project, storyreel::GenerateOptions)> {
    let project = storyreel::Project::from_path(&args.in_path)
        .with_context(|| format!("load project '{}'", args.in_path.display()))?;

    let mut opts = config.generate.clone();
    if let Some(fps) = args.fps {
        opts.frame_rate = fps;
    }
    if let Some(t) = args.transition {
        opts.transition_secs = t;
    }
    if args.decorative_font {
        opts.use_decorative_font = true;
    }
    if let (Some(width), Some(height)) = (args.width, args.height) {
        opts.canvas = storyreel::Canvas::new(width, height)?;
    }
    opts.title = project.title.clone();
    opts.validate()?;
    Ok((project, opts))
}

fn generator(config: &storyreel::AppConfig) -> anyhow::Result<storyreel::Generator> {
    let fonts = config.fonts.load()?;
    if fonts.is_empty() {
        tracing::warn!("no caption font found; configure one under `fonts` in --config");
    }
    Ok(storyreel::Generator::new(fonts))
}

fn cmd_render(args: RenderArgs, config: storyreel::AppConfig) -> anyhow::Result<()> {
    let (project, mut opts) = load(&args.project, &config)?;
    if let Some(format) = args.format {
        opts.format = format.into();
    }
    if args.unpaced {
        opts.pacing = storyreel::Pacing::Unpaced;
    }
    let audio = args
        .audio
        .as_deref()
        .map(storyreel::AudioResource::from_path)
        .transpose()?;

    let out_dir = args.out_dir.unwrap_or(config.output_dir.clone());
    let out_dir = if out_dir.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out_dir
    };
    let mut encoder = storyreel::FfmpegSession::new(storyreel::FfmpegSessionOpts {
        format: opts.format,
        bg_rgba: opts.background_rgba,
        ..storyreel::FfmpegSessionOpts::new(&out_dir)
    });

    let reel = generator(&config)?;
    let mut hooks = storyreel::NoopHooks;
    let mut status = storyreel::TracingStatus;
    let mut clock = storyreel::SystemClock::start();
    let cancel = storyreel::CancelToken::new();
    let report = reel.generate(
        &project.stories,
        audio.as_ref(),
        &opts,
        storyreel::GenerateIo {
            hooks: &mut hooks,
            status: &mut status,
            encoder: &mut encoder,
            clock: &mut clock,
            cancel: &cancel,
        },
    )?;

    if let storyreel::ArtifactData::File(path) = &report.artifact.data {
        eprintln!(
            "wrote {} ({} frames, {:.2}s)",
            path.display(),
            report.frames_pushed,
            report.artifact.duration_secs
        );
    }
    Ok(())
}

fn cmd_plan(args: PlanArgs, config: storyreel::AppConfig) -> anyhow::Result<()> {
    let (project, opts) = load(&args.project, &config)?;
    let summary = storyreel::Generator::default().plan_summary(&project.stories, &opts)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("serialize schedule summary")?
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs, config: storyreel::AppConfig) -> anyhow::Result<()> {
    let (project, opts) = load(&args.project, &config)?;
    let frame = generator(&config)?.preview_frame(
        &project.stories,
        &opts,
        storyreel::FrameIndex(args.frame),
    )?;
    let rgba = frame.to_opaque_rgba8(opts.background_rgba)?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    write_png(&args.out, &rgba, frame.width, frame.height)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn write_png(path: &Path, rgba: &[u8], width: u32, height: u32) -> anyhow::Result<()> {
    image::save_buffer_with_format(
        path,
        rgba,
        width,
        height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))
}
