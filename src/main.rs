use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;

use rastervec::{Pipeline, Registry};

const DEFAULT_INPUT: &str = "data/input/test_drawing.png";
const DEFAULT_OUTPUT: &str = "data/output";

#[derive(Parser)]
#[command(name = "rastervec")]
#[command(about = "Detect line segments in raster drawings and export them as DXF")]
struct Cli {
    /// Detector to use (e.g. lsd_classic, deeplsd)
    #[arg(short, long, value_name = "KEY")]
    detector: Option<String>,

    /// List available detectors
    #[arg(short, long)]
    list: bool,

    /// Run all available detectors and compare their counts
    #[arg(short, long)]
    all: bool,

    /// Input image path
    #[arg(short, long, value_name = "IMAGE", default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Output base directory; results land in <DIR>/<detector>/result.dxf
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Configuration preset, applied to every detector that defines it
    #[arg(long, value_name = "NAME")]
    preset: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Cli::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let registry = match &args.preset {
        Some(name) => Registry::with_preset(name)?,
        None => Registry::with_builtin_detectors()?,
    };
    let pipeline = Pipeline::new(registry, &args.input, &args.output);

    if args.list {
        println!("Available detectors:");
        let registry = pipeline.registry();
        for key in registry.list_available() {
            let detector = registry.get(key)?;
            println!("  - {key}: {}", detector.name());
        }
        return Ok(ExitCode::SUCCESS);
    }

    if !args.all && args.detector.is_none() {
        Cli::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    }

    if !args.input.exists() {
        eprintln!("Error: Input file not found: {}", args.input.display());
        eprintln!("Please place your image in data/input/ or pass --input.");
        return Ok(ExitCode::FAILURE);
    }

    if args.all {
        let report = pipeline.run_all();
        println!("\n{}", "=".repeat(60));
        println!("Comparison Results");
        println!("{}", "=".repeat(60));
        print!("{report}");
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(key) = args.detector.as_deref() {
        if let Err(e) = pipeline.run_detector(key) {
            eprintln!("Error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(ExitCode::SUCCESS)
}
