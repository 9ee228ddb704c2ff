//! Logging initialization

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Initialize logging based on debug flag
///
/// With `debug`, everything down to debug level goes to a temporary log file
/// so stdout stays clean for query output; the file path is returned.
/// Otherwise warnings and errors go to stderr, adjustable with `RUST_LOG`.
pub fn init_logging(debug: bool) -> Option<PathBuf> {
    if debug {
        let temp_file = tempfile::Builder::new()
            .prefix("kubeprov-")
            .suffix(".log")
            .tempfile()
            .map(|f| {
                let path = f.path().to_path_buf();
                // Keep the file on disk after the handle is gone
                std::mem::forget(f);
                path
            })
            .unwrap_or_else(|_| {
                std::env::temp_dir().join(format!("kubeprov-{}.log", std::process::id()))
            });

        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&temp_file);

        match file {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_writer(file)
                    .with_env_filter(
                        EnvFilter::try_from_default_env()
                            .unwrap_or_else(|_| EnvFilter::new("debug")),
                    )
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .init();
                return Some(temp_file);
            }
            Err(e) => eprintln!(
                "Cannot open log file {} ({}), logging to stderr",
                temp_file.display(),
                e
            ),
        }
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();
    None
}
