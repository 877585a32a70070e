//! Debug log status, export, and clearing.

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use chrono::Utc;

use crate::cli::settings::helpers::format_bool;
use crate::cli::{LogCommands, Paths};
use crate::core::config::data::path_display;

pub fn run(paths: &Paths, command: LogCommands) -> Result<(), Box<dyn Error>> {
    let settings = paths.load_settings()?;
    let recorder = paths.load_recorder(&settings)?;

    match command {
        LogCommands::Status => {
            println!("🪵 Debug log: {}", format_bool(recorder.is_enabled()));
            println!("   File: {}", path_display(paths.store.debug_log_path()));
            println!("   Size: {}", recorder.size_summary());
            println!("   Retention: {} days", settings.log_retention_days);
        }
        LogCommands::Export { path } => {
            let path = path.unwrap_or_else(default_export_path);
            fs::write(&path, recorder.export_text())?;
            println!(
                "✅ Exported {} entries to {}",
                recorder.len(),
                path_display(&path)
            );
        }
        LogCommands::Clear => {
            recorder.clear();
            println!("✅ Debug log cleared");
        }
    }
    Ok(())
}

fn default_export_path() -> PathBuf {
    let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ");
    PathBuf::from(format!("debug_log_{stamp}.txt"))
}
