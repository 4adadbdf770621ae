//! Native entry point: replay serialized strokes into a PNG.

#[cfg(feature = "native")]
mod cli {
    use std::path::PathBuf;

    use clap::Parser;
    use inkpage_app::Engine;
    use inkpage_core::{EngineConfig, InkError};
    use thiserror::Error;

    #[derive(Parser, Debug)]
    #[command(version, about = "Render InkPage strokes to a PNG", long_about = None)]
    pub struct Args {
        /// Serialized strokes (JSON array or object with a `strokes` array).
        input: PathBuf,
        /// Where to write the PNG.
        #[arg(short, long, default_value = "inkpage.png")]
        output: PathBuf,
        /// Surface width in pixels.
        #[arg(long, default_value_t = 1024)]
        width: u32,
        /// Surface height in pixels.
        #[arg(long, default_value_t = 768)]
        height: u32,
        /// Engine configuration (JSON).
        #[arg(long)]
        config: Option<PathBuf>,
    }

    #[derive(Debug, Error)]
    pub enum CliError {
        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),
        #[error(transparent)]
        Ink(#[from] InkError),
        #[error("Nothing to render on a {0}x{1} surface")]
        NoSurface(u32, u32),
    }

    pub fn run(args: Args) -> Result<(), CliError> {
        let config = match &args.config {
            Some(path) => EngineConfig::from_json(&std::fs::read_to_string(path)?)?,
            None => EngineConfig::default(),
        };

        let json = std::fs::read_to_string(&args.input)?;
        let mut engine = Engine::new(args.width, args.height, config);
        let report = engine.import_strokes(&json);
        log::info!(
            "Loaded {} strokes from {} ({} skipped)",
            report.imported,
            args.input.display(),
            report.skipped
        );

        let png = engine
            .snapshot_png()
            .ok_or(CliError::NoSurface(args.width, args.height))?;
        std::fs::write(&args.output, &png)?;
        log::info!("Wrote {} ({} bytes)", args.output.display(), png.len());
        Ok(())
    }
}

#[cfg(feature = "native")]
fn main() {
    use clap::Parser;

    env_logger::init();

    let args = cli::Args::parse();
    if let Err(e) = cli::run(args) {
        log::error!("{e}");
        eprintln!("inkpage: {e}");
        std::process::exit(1);
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
