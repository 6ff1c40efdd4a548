use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use postgen_core::{FormatId, ImageSource, PostgenConfig, RenderInput};
use postgen_deliver::{
    CommandShare, DeliveryOutcome, DeliveryPipeline, DirectorySink, LogNotifier, NoShare,
    Session, ShareTarget, TokioDelay,
};
use postgen_render::{AssetCache, AssetLoader, Compositor, Typeface};

#[derive(Parser)]
#[command(
    name = "postgen",
    version,
    about = "postgen: templated social-media post images",
    long_about = "Composite a photo, a headline and optional body text onto fixed templates,\nthen share the slides or save them one by one."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every slide of a format and deliver the result
    Render {
        /// Format id: simple, double, breaking_exn, breaking_exd
        #[arg(short, long)]
        format: String,

        /// Headline text
        #[arg(short, long, default_value = "")]
        title: String,

        /// Body text (used by formats with a description slide)
        #[arg(short, long, default_value = "")]
        body: String,

        /// Background photo
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Config file (default: postgen.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory, overrides delivery.output_dir
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Skip the share command and save files directly
        #[arg(long)]
        no_share: bool,
    },

    /// List the available formats and their slides
    Formats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render {
            format,
            title,
            body,
            image,
            config,
            out,
            no_share,
        } => run_async(cmd_render(RenderArgs {
            format,
            title,
            body,
            image,
            config,
            out,
            no_share,
        })),
        Commands::Formats { json } => cmd_formats(json),
    }
}

fn run_async<F>(future: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;
    runtime.block_on(future)
}

struct RenderArgs {
    format: String,
    title: String,
    body: String,
    image: Option<PathBuf>,
    config: Option<PathBuf>,
    out: Option<PathBuf>,
    no_share: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<PostgenConfig> {
    match path {
        Some(path) => PostgenConfig::load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => {
            let default = PathBuf::from("postgen.toml");
            if default.exists() {
                PostgenConfig::load_from_file(&default).context("failed to load postgen.toml")
            } else {
                Ok(PostgenConfig::default())
            }
        }
    }
}

async fn cmd_render(args: RenderArgs) -> Result<()> {
    let format: FormatId = args.format.parse()?;
    let mut config = load_config(args.config.as_ref())?;
    if let Some(out) = args.out {
        config.delivery.output_dir = out;
    }

    let mut input = RenderInput::new(format)
        .with_title(args.title)
        .with_body(args.body);
    if let Some(path) = args.image {
        anyhow::ensure!(path.exists(), "image not found: {}", path.display());
        input = input.with_background(ImageSource::Path(path));
    }

    let typeface = Typeface::load(&config.text);
    let loader = AssetLoader::new(&config.assets, Arc::new(AssetCache::new()))?;
    let compositor = Compositor::new(&config, loader, typeface);

    let share: Box<dyn ShareTarget> = match CommandShare::from_config(&config.delivery)? {
        Some(share) if !args.no_share => Box::new(share),
        _ => Box::new(NoShare),
    };
    let pipeline = DeliveryPipeline::new(
        share,
        Box::new(DirectorySink::new(&config.delivery.output_dir)),
        Box::new(TokioDelay),
        Box::new(LogNotifier),
    )
    .with_interval(config.delivery.download_interval())
    .with_share_text(config.delivery.share_text.clone());

    let session = Session::new(compositor, pipeline);
    let report = session.generate(&input).await?;

    match &report.outcome {
        DeliveryOutcome::Shared => println!("Shared {} file(s)", report.delivered.len()),
        DeliveryOutcome::ShareCancelled => println!("Share cancelled"),
        DeliveryOutcome::Downloaded { count } => {
            println!("Saved {} file(s) to {}", count, config.delivery.output_dir.display());
            for name in &report.delivered {
                println!("   {}", name);
            }
        }
        DeliveryOutcome::Empty => println!("Nothing to deliver"),
        DeliveryOutcome::Failed { message } => anyhow::bail!("delivery failed: {}", message),
    }
    Ok(())
}

fn cmd_formats(json: bool) -> Result<()> {
    if json {
        let formats: Vec<serde_json::Value> = FormatId::ALL
            .iter()
            .map(|format| {
                serde_json::json!({
                    "id": format.as_str(),
                    "label": format.label(),
                    "slides": format.slides(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&formats)?);
        return Ok(());
    }

    for format in FormatId::ALL {
        println!("{:<14} {}", format.as_str(), format.label());
        for (i, slide) in format.slides().iter().enumerate() {
            println!("   {}. {:<28} suffix {}", i + 1, slide.template, slide.suffix);
        }
    }
    Ok(())
}
