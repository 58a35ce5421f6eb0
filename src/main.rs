use anyhow::Context;
use captcha_segmenter::classifier::{INPUT_HEIGHT, INPUT_WIDTH};
use captcha_segmenter::dataset::extract_dataset;
use captcha_segmenter::engines;
use captcha_segmenter::observer::DebugCanvas;
use captcha_segmenter::params::parse_assignment;
use captcha_segmenter::segmentation::steps::crop::resample_nearest;
use captcha_segmenter::segmentation::{OutputSize, Segmenter};
use clap::{Args, Parser, Subcommand};
use image::GrayImage;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod server;

#[derive(Parser, Debug)]
#[command(name = "captcha-segmenter")]
#[command(about = "Captcha character segmentation and solving")]
#[command(version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Segment (and solve, with a model) a single captcha image
    Solve(SolveArgs),
    /// Run the HTTP solving server
    Serve(ServeArgs),
    /// Build a labeled character dataset from answer-named captcha files
    Dataset(DatasetArgs),
}

/// Segmentation parameter overrides shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Override a segmentation parameter, e.g. `-p floodfill_threshold=30`
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub params: Vec<(String, i64)>,

    /// JSON file with segmentation parameters
    #[arg(long)]
    pub params_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SolveArgs {
    /// Captcha image to segment
    pub image: PathBuf,

    /// Resample every character to WIDTHxHEIGHT
    #[arg(long)]
    pub output_size: Option<OutputSize>,

    /// Write every character as PNG into this directory
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Write a debug sheet of the intermediate stages
    #[arg(long)]
    pub debug_image: Option<PathBuf>,

    /// Directory with the classifier model and labels map
    #[arg(long, env = "CAPTCHA_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Save the source image as `<answer>.png` into this directory
    #[arg(long)]
    pub save_results: Option<PathBuf>,

    #[command(flatten)]
    pub params: ParamArgs,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host address to bind to
    #[arg(long, env = "CAPTCHA_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "CAPTCHA_PORT", default_value = "8090")]
    pub port: u16,

    /// Maximum request body size in bytes (default: 10MB)
    #[arg(long, env = "CAPTCHA_MAX_BODY_SIZE", default_value = "10485760")]
    pub max_body_size: usize,

    /// Save every solved captcha as `<answer>.png` into this directory
    #[arg(long)]
    pub save_results: Option<PathBuf>,

    /// Directory with the classifier model and labels map
    #[arg(long, env = "CAPTCHA_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    #[command(flatten)]
    pub params: ParamArgs,
}

#[derive(Args, Debug)]
pub struct DatasetArgs {
    /// Directory of captcha images named after their answers
    pub input_dir: PathBuf,

    /// Directory receiving `<label>/<name>_<index>.png` and the labels map
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub params: ParamArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Command::Solve(args) => solve(args),
        Command::Serve(args) => serve(args).await,
        Command::Dataset(args) => {
            let params = args.params.resolve()?;
            let summary = extract_dataset(&args.input_dir, &args.output_dir, &params)?;
            println!(
                "{} samples, {} labels from {} of {} files",
                summary.samples,
                summary.labels.len(),
                summary.files_used,
                summary.files_seen
            );
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let classifier = match &args.model_dir {
        Some(dir) => Some(engines::load(dir)?),
        None => None,
    };
    let config = config::Config::try_from(args)?;

    tracing::info!(
        "Starting captcha-segmenter v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Binding to {}:{}", config.host, config.port);

    server::run(config, classifier).await
}

fn solve(args: SolveArgs) -> anyhow::Result<()> {
    let params = args.params.resolve()?;
    let image = image::open(&args.image)
        .with_context(|| format!("Unable to open {}", args.image.display()))?
        .to_rgb8();

    let segmenter = Segmenter::new(params);
    let segmentation = match &args.debug_image {
        Some(path) => {
            let (width, height) = image.dimensions();
            let mut canvas = DebugCanvas::new(width, height);
            let segmentation = segmenter.segment_observed(&image, args.output_size, &mut canvas)?;
            canvas
                .save(path)
                .with_context(|| format!("Unable to write {}", path.display()))?;
            tracing::info!("Debug image written to {}", path.display());
            segmentation
        }
        None => segmenter.segment(&image, args.output_size)?,
    };

    println!("{} characters", segmentation.characters.len());
    for (index, character) in segmentation.characters.iter().enumerate() {
        let rect = character.rect;
        println!(
            "  #{}: x={} y={} {}x{}",
            index, rect.x, rect.y, rect.width, rect.height
        );
    }

    if let Some(dir) = &args.out_dir {
        std::fs::create_dir_all(dir)?;
        for (index, character) in segmentation.characters.iter().enumerate() {
            let path = dir.join(format!("{}.png", index));
            character
                .image
                .save(&path)
                .with_context(|| format!("Unable to write {}", path.display()))?;
        }
    }

    let Some(model_dir) = &args.model_dir else {
        return Ok(());
    };
    let classifier = engines::load(model_dir)?;

    let input = OutputSize::new(INPUT_WIDTH, INPUT_HEIGHT);
    let characters: Vec<GrayImage> = segmentation
        .characters
        .iter()
        .map(|c| {
            if c.image.dimensions() == (input.width, input.height) {
                c.image.clone()
            } else {
                resample_nearest(&c.image, input)
            }
        })
        .collect();
    let answer = classifier.predict(&characters)?.concat();
    println!("{}", answer);

    if let (Some(dir), false) = (&args.save_results, answer.is_empty()) {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.png", answer));
        image
            .save(&path)
            .with_context(|| format!("Unable to write {}", path.display()))?;
        tracing::info!("Saved as {}", path.display());
    }

    Ok(())
}
