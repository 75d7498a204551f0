use std::path::PathBuf;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use qrcraft::config::GeneratorConfig;
use qrcraft::params::RequestParams;
use qrcraft::pipeline::Generator;

/// qrcraft - QR code images with logo overlays and an on-disk cache
#[derive(Parser, Debug)]
#[command(name = "qrcraft")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "QRCRAFT_CONFIG")]
    config: Option<PathBuf>,

    /// Storage root, overrides the configuration file
    #[arg(long, env = "QRCRAFT_STORAGE")]
    storage: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate (or fetch from cache) a QR image
    Generate(GenerateArgs),
    /// Print artifact counts per partition as JSON
    Stats,
    /// Delete generic artifacts older than the given number of days
    Evict {
        #[arg(long)]
        days: Option<u64>,
    },
}

#[derive(ClapArgs, Debug)]
struct GenerateArgs {
    /// Text to encode
    #[arg(long)]
    data: String,

    /// Where to write the PNG
    #[arg(short, long, default_value = "qrcode.png")]
    output: PathBuf,

    #[arg(long)]
    color: Option<String>,

    #[arg(long)]
    bg_color: Option<String>,

    #[arg(long)]
    size: Option<String>,

    #[arg(long)]
    logo_url: Option<String>,

    #[arg(long)]
    logo_size: Option<String>,

    #[arg(long = "ec", alias = "error-correction-level")]
    error_correction_level: Option<String>,

    #[arg(long)]
    logo_bg_color: Option<String>,

    #[arg(long)]
    logo_padding: Option<String>,
}

impl From<GenerateArgs> for RequestParams {
    fn from(args: GenerateArgs) -> Self {
        RequestParams {
            data: Some(args.data),
            logo_url: args.logo_url,
            color: args.color,
            bg_color: args.bg_color,
            size: args.size,
            logo_size: args.logo_size,
            error_correction_level: args.error_correction_level,
            logo_bg_color: args.logo_bg_color,
            logo_padding: args.logo_padding,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    qrcraft::logging::init_subscriber(args.json_logs)?;

    let mut config = match &args.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(root) = args.storage {
        config.storage.root = root;
    }
    tracing::info!(storage = %config.storage.root.display(), "Configuration loaded");

    let generator = Generator::from_config(&config)?;

    match args.command {
        Command::Generate(gen_args) => {
            let output = gen_args.output.clone();
            let params = RequestParams::from(gen_args);
            let generated = match generator.generate(&params).await {
                Ok(g) => g,
                Err(e) => {
                    let body = serde_json::to_string(&e.to_body())?;
                    eprintln!("{body}");
                    std::process::exit(if e.http_status() == 400 { 2 } else { 1 });
                }
            };
            tokio::fs::write(&output, &generated.bytes)
                .await
                .with_context(|| format!("failed to write {}", output.display()))?;
            for (name, value) in generated.response_headers() {
                println!("{name}: {value}");
            }
        }
        Command::Stats => {
            let stats = generator.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Evict { days } => {
            let days = days.unwrap_or(config.storage.eviction_days);
            let deleted = generator.evict_older_than_days(days).await?;
            println!("{}", serde_json::json!({ "deletedCount": deleted, "maxAgeDays": days }));
        }
    }
    Ok(())
}
