use anyhow::Context;
use clap::Parser;
use deid::{
    apply_env_overrides, load_config, run_batch, write_outputs, AutoSelect, DeidConfig,
    DetectOptions, FindingSelector, IngestOptions, PromptSelect, ServiceSettings, Services,
};
use deid_core::RedactionMode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "deid", version, about = "Detect and redact personal data in documents")]
struct Args {
    /// Images, PDFs, DOCX, XLSX, TXT or MD files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON config file
    #[arg(short, long, default_value = "deid.json")]
    config: PathBuf,

    /// Redaction mode: blur or black
    #[arg(short, long)]
    mode: Option<RedactionMode>,

    /// Skip named-entity detection
    #[arg(long)]
    no_ner: bool,

    /// Skip face detection
    #[arg(long)]
    no_faces: bool,

    /// Skip signature detection
    #[arg(long)]
    no_signatures: bool,

    /// Confirm each finding before redacting it
    #[arg(long)]
    review: bool,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Keep images at full resolution (slower OCR)
    #[arg(long)]
    full_quality: bool,
}

impl Args {
    fn apply(&self, config: &mut DeidConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if self.no_ner {
            config.enable_ner = false;
        }
        if self.no_faces {
            config.enable_faces = false;
        }
        if self.no_signatures {
            config.enable_signatures = false;
        }
        if self.review {
            config.auto_redact = false;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.display().to_string();
        }
        if self.full_quality {
            config.fast_mode = false;
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = load_config(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    apply_env_overrides(&mut config);
    args.apply(&mut config);

    tracing::info!(
        mode = %config.mode,
        inputs = args.inputs.len(),
        "deid v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let services = Services::new(ServiceSettings::from(&config));
    let detect_options = DetectOptions::from(&config);
    let ingest_options = IngestOptions::from(&config);

    let stdin = std::io::stdin();
    let mut selector: Box<dyn FindingSelector> = if config.auto_redact {
        Box::new(AutoSelect)
    } else {
        Box::new(PromptSelect::new(stdin.lock(), std::io::stderr()))
    };

    let batch = run_batch(
        &services,
        &detect_options,
        &ingest_options,
        selector.as_mut(),
        config.mode,
        &args.inputs,
    );

    let paths = write_outputs(
        &PathBuf::from(&config.output_dir),
        &batch.pages,
        &batch.entries,
        chrono::Local::now(),
    )?;

    for skipped in &batch.skipped {
        tracing::warn!(file = %skipped.file, "skipped: {}", skipped.reason);
    }
    if let Some(pdf) = &paths.pdf {
        println!("Redacted PDF: {}", pdf.display());
    }
    println!("Redaction log: {}", paths.log.display());
    println!(
        "{} pages redacted, {} files skipped",
        batch.pages.len(),
        batch.skipped.len()
    );

    if batch.pages.is_empty() && !batch.skipped.is_empty() {
        anyhow::bail!("no input could be processed");
    }
    Ok(())
}
