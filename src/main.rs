use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use watermark_removal::config;
use watermark_removal::diagnostics::LogDiagnostics;
use watermark_removal::method::Method;
use watermark_removal::process_batch;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: watermark_removal [--method <selector>] [--output-dir <dir>] <file>...");
        eprintln!("  Remove watermark artifacts from .docx, .pdf, .png, .jpg or .jpeg files.");
        eprintln!("  Methods: {}", Method::selectors().join(", "));
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("watermark_removal {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Parse flags and collect input paths.
    let mut method_arg: Option<String> = None;
    let mut output_dir: Option<PathBuf> = None;
    let mut inputs: Vec<PathBuf> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--method" => match iter.next() {
                Some(value) => method_arg = Some(value.clone()),
                None => {
                    eprintln!("ERROR: --method requires a value");
                    return ExitCode::FAILURE;
                }
            },
            "--output-dir" => match iter.next() {
                Some(value) => output_dir = Some(PathBuf::from(value)),
                None => {
                    eprintln!("ERROR: --output-dir requires a value");
                    return ExitCode::FAILURE;
                }
            },
            other => inputs.push(PathBuf::from(other)),
        }
    }

    if inputs.is_empty() {
        eprintln!("ERROR: no input files given");
        return ExitCode::FAILURE;
    }

    // Load settings from the current directory, then apply the CLI override.
    let mut settings = match config::load_settings_in(Path::new(".")) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: Failed to load settings: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(selector) = method_arg {
        settings.method = selector;
    }

    let options = match settings.to_options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    let diagnostics = LogDiagnostics;
    let results = process_batch(&inputs, output_dir.as_deref(), &options, &diagnostics);

    let mut has_error = false;
    for (input, result) in inputs.iter().zip(results.iter()) {
        match result {
            Ok(output_path) => {
                eprintln!("OK: {} -> {}", input.display(), output_path.display());
            }
            Err(e) => {
                eprintln!("ERROR: {}: {e}", input.display());
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
