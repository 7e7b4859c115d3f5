use clap::{Parser, Subcommand};
use invoice_ocr::config::{parse_languages, Config};
use invoice_ocr::detector::DetectorConfig;
use invoice_ocr::preprocessing::PreprocessConfig;
use invoice_ocr::{build_extractor, report, server};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "invoice-ocr")]
#[command(about = "Extract text from photographs of handwritten invoices")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Languages to recognize, comma-separated (e.g., "en")
    #[arg(long, global = true, env = "OCR_LANGUAGES", default_value = "en")]
    pub languages: String,

    /// Directory for preprocessed_* debug images (default: working directory)
    #[arg(long, global = true, env = "OCR_DEBUG_DIR")]
    pub debug_dir: Option<PathBuf>,

    /// Do not write preprocessed_* debug images
    #[arg(long, global = true, env = "OCR_NO_DEBUG_ARTIFACT")]
    pub no_debug_artifact: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract text from one image and print a report
    Extract {
        /// Path to the invoice image
        #[arg(default_value = "invoice.jpg")]
        image: PathBuf,

        /// Feed the raw image to the detector
        #[arg(long)]
        no_preprocess: bool,

        /// Print the result as JSON instead of the report
        #[arg(long)]
        json: bool,
    },
    /// Run the HTTP API
    Serve {
        /// Host address to bind to
        #[arg(long, env = "OCR_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, env = "OCR_PORT", default_value = "9292")]
        port: u16,

        /// Maximum upload size in bytes (default: 50MB)
        #[arg(long, env = "OCR_MAX_FILE_SIZE", default_value = "52428800")]
        max_file_size: usize,
    },
}

impl Args {
    fn config(&self) -> Config {
        let debug_dir = if self.no_debug_artifact {
            None
        } else {
            Some(self.debug_dir.clone().unwrap_or_else(|| PathBuf::from(".")))
        };

        let mut config = Config {
            debug_dir,
            detector: DetectorConfig {
                languages: parse_languages(&self.languages),
                ..DetectorConfig::default()
            },
            preprocess: PreprocessConfig::default(),
            ..Config::default()
        };

        if let Command::Serve {
            host,
            port,
            max_file_size,
        } = &self.command
        {
            config.host = host.clone();
            config.port = *port;
            config.max_file_size = *max_file_size;
        }

        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = args.config();

    match args.command {
        Command::Extract {
            image,
            no_preprocess,
            json,
        } => {
            let extractor = build_extractor(&config);
            let result =
                tokio::task::spawn_blocking(move || extractor.extract_text(&image, !no_preprocess))
                    .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", report::render(&result));
            }

            if !result.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Serve { .. } => {
            tracing::info!("Starting invoice-ocr v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!("Binding to {}:{}", config.host, config.port);
            server::run(config).await
        }
    }
}
