use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use glint::{
    Engine, EngineConfig, LocaleBinding, OutputFormat, RenderArgs, RenderOptions, Scaling,
    SvgTemplate,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "glint", version)]
struct Cli {
    /// Engine config JSON. Missing sections use defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an SVG template with JSON props into an image.
    Render(RenderCmd),
    /// Print the palette derived from an image URL.
    Colors(ColorsCmd),
}

#[derive(Parser, Debug)]
struct RenderCmd {
    /// SVG template with `{{placeholders}}`.
    #[arg(long)]
    template: PathBuf,

    /// Props JSON object.
    #[arg(long)]
    props: Option<PathBuf>,

    /// Locale JSON (`{"locale": "en", "strings": {...}}`).
    #[arg(long)]
    locale: Option<PathBuf>,

    /// Output path. The format follows `--format`, else the extension.
    #[arg(long)]
    out: PathBuf,

    /// Output format override.
    #[arg(long, value_enum)]
    format: Option<FormatChoice>,

    /// Device pixel ratio (>= 1).
    #[arg(long, default_value_t = 2.0)]
    image_scale: f32,

    /// Emoji size multiplier (0.5..=3).
    #[arg(long, default_value_t = 1.0)]
    emoji_scale: f32,

    /// Draw layout debug outlines.
    #[arg(long)]
    debug: bool,

    /// Print the palette used as JSON.
    #[arg(long)]
    print_colors: bool,
}

#[derive(Parser, Debug)]
struct ColorsCmd {
    /// Image URL.
    #[arg(long)]
    url: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Png,
    Jpeg,
    Webp,
}

impl From<FormatChoice> for OutputFormat {
    fn from(c: FormatChoice) -> Self {
        match c {
            FormatChoice::Png => OutputFormat::Png,
            FormatChoice::Jpeg => OutputFormat::Jpeg,
            FormatChoice::Webp => OutputFormat::Webp,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("glint=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start tokio runtime")?;

    match cli.cmd {
        Command::Render(args) => {
            if let Some(format) = args
                .format
                .map(OutputFormat::from)
                .or_else(|| format_from_path(&args.out))
            {
                config.encode.format = format;
            }
            runtime.block_on(cmd_render(config, args))
        }
        Command::Colors(args) => runtime.block_on(cmd_colors(config, args)),
    }
}

fn format_from_path(path: &Path) -> Option<OutputFormat> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(OutputFormat::from_extension)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parse {what} JSON"))
}

async fn cmd_render(config: EngineConfig, args: RenderCmd) -> anyhow::Result<()> {
    let template = SvgTemplate::from_file(&args.template)?;
    let props: serde_json::Value = match &args.props {
        Some(path) => read_json(path, "props")?,
        None => serde_json::Value::Object(Default::default()),
    };
    let locale: LocaleBinding = match &args.locale {
        Some(path) => read_json(path, "locale")?,
        None => LocaleBinding::default(),
    };

    let engine = Engine::new(config)?;
    let request = RenderArgs::new(Arc::new(template), props)
        .with_scaling(Scaling {
            image_scale: args.image_scale,
            emoji_scale: args.emoji_scale,
            debug: args.debug,
        })
        .with_locale(locale);

    let out = engine
        .render(request, RenderOptions::unthrottled())
        .await?;
    std::fs::write(&args.out, &out.bytes)
        .with_context(|| format!("write output '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}x{}, {} bytes)",
        args.out.display(),
        out.dimensions.width,
        out.dimensions.height,
        out.bytes.len()
    );
    if args.print_colors {
        println!("{}", serde_json::to_string_pretty(&out.colors)?);
    }
    Ok(())
}

async fn cmd_colors(config: EngineConfig, args: ColorsCmd) -> anyhow::Result<()> {
    let engine = Engine::new(config)?;
    let colors = engine.process_image_colors(&args.url).await;
    println!("{}", serde_json::to_string_pretty(&colors)?);
    let m = engine.cache_metrics();
    tracing::debug!(hits = m.hits, misses = m.misses, "color cache");
    Ok(())
}
