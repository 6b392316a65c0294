use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod analyze;

/// Detect riders, helmet use and triple riding in traffic images
#[derive(Parser, Debug)]
#[command(name = "helmetwatch", version)]
pub struct Args {
    /// Images to analyze
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Pipeline configuration (TOML)
    #[arg(long, env = "HELMETWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// General-object YOLO model (ONNX) producing person and motorcycle boxes
    #[arg(long, env = "HELMETWATCH_OBJECT_MODEL")]
    pub object_model: Option<PathBuf>,

    /// Helmet/no-helmet YOLO model (ONNX)
    #[arg(long, env = "HELMETWATCH_HEAD_MODEL")]
    pub head_model: Option<PathBuf>,

    /// Class labels of the head model, in class id order
    #[arg(long, value_delimiter = ',', default_value = "helmet,no_helmet")]
    pub head_labels: Vec<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "helmetwatch={0},helmetwatch_cv={0}",
            args.log_level
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match analyze::run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("helmetwatch failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
