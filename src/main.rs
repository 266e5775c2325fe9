use chrono::Local;
use env_logger::Env;
mod constants;
mod countdown;
mod prefs;
mod wallpaper;

use countdown::countdown_mode::CountdownMode;
use prefs::preference_store::{PreferenceStore, parse_target_date};
use wallpaper::wallpaper_engine::WallpaperEngine;

fn flag_value(args: &[String], names: &[&str]) -> Option<String> {
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|pos| args.get(pos + 1).cloned())
}

fn ensure_parent_dir(path: &str) -> std::io::Result<()> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn print_modes() {
    println!("Available modes:");
    for mode in CountdownMode::ALL {
        println!("  {:<16} {}", mode.as_str(), mode.display_name());
    }
}

/// Applies any `--set-*` flags. Returns whether at least one was given.
fn apply_settings(
    args: &[String],
    prefs: &PreferenceStore,
) -> Result<bool, Box<dyn std::error::Error>> {
    let title = flag_value(args, &["--set-title"]);
    let date = flag_value(args, &["--set-date"]);
    let mode = flag_value(args, &["--set-mode"]);

    if title.is_none() && date.is_none() && mode.is_none() {
        return Ok(false);
    }

    // Validate everything before writing anything.
    let date = match date {
        Some(raw) => Some(parse_target_date(&raw).ok_or_else(|| {
            format!("Invalid date {:?}, expected YYYY-MM-DDTHH:MM[:SS]", raw)
        })?),
        None => None,
    };
    let mode = match mode {
        Some(raw) => Some(raw.parse::<CountdownMode>()?),
        None => None,
    };

    if let Some(title) = title {
        prefs.save_title(&title)?;
        println!("Title set to: {}", title);
    }
    if let Some(date) = date {
        prefs.save_target_date(date)?;
        println!("Target set to: {}", date.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(mode) = mode {
        prefs.save_mode(mode)?;
        println!("Mode set to: {}", mode);
    }
    log::info!("Saved preferences to {}", prefs.path().display());
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let verbose = args.contains(&"--verbose".to_string()) || args.contains(&"-v".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(if verbose {
        "debug"
    } else {
        "info"
    }))
    .init();

    if args.contains(&"--list-modes".to_string()) {
        print_modes();
        return Ok(());
    }

    let prefs_path = flag_value(&args, &["--prefs"])
        .unwrap_or_else(|| constants::data_file(constants::PREFS_FILE));
    let prefs = PreferenceStore::open(&prefs_path)?;
    log::debug!("Using preferences at {}", prefs_path);

    if apply_settings(&args, &prefs)? {
        return Ok(());
    }

    if args.contains(&"--once".to_string()) {
        let engine = WallpaperEngine::new(&prefs, None);
        let frame = engine.frame(Local::now().naive_local());
        if args.contains(&"--json".to_string()) {
            println!("{}", serde_json::to_string(&frame)?);
        } else {
            println!("{}", frame.title);
            println!("{}", frame.text);
        }
        return Ok(());
    }

    let log_file = flag_value(&args, &["--log", "-l"])
        .or_else(|| Some(constants::data_file(constants::LOG_FILE)));

    // Create log directory if needed
    if let Some(ref path) = log_file {
        ensure_parent_dir(path)?;
    }

    let mode = prefs.mode();
    println!("⏳ Countdown Wallpaper");
    println!("======================================================");
    println!("Title: {}", prefs.title());
    println!("Mode: {}", mode);
    if mode == CountdownMode::FullCountdown {
        println!(
            "Target: {}",
            prefs
                .target_date(Local::now().naive_local())
                .format("%Y-%m-%d %H:%M:%S")
        );
    }
    if let Some(ref path) = log_file {
        println!("Logging to: {}", path);
    }
    println!("Redrawing every second... Press Ctrl+C to stop\n");

    let mut engine = WallpaperEngine::new(&prefs, log_file);
    engine.run().await
}
