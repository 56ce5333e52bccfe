//! One-off scan of the configured folders

use anyhow::Result;
use cheevo_cli::{config, daemon, Monitor};
use cheevo_core::EntityId;
use cheevo_watcher::{find_matching_files, PathFilter};
use owo_colors::OwoColorize;

/// List every achievement file with its app id and unlock counts
pub async fn run() -> Result<()> {
    let settings = config::load()?;
    let monitor = daemon::build_monitor(&settings)?;
    let options = settings.watcher_options();
    let filter = PathFilter::new(&options.whitelist, &options.ignore);

    let mut total = 0usize;
    for folder in daemon::existing_folders(&settings) {
        println!("{}", folder.display().to_string().bold());

        let files = find_matching_files(&folder, &filter)?;
        if files.is_empty() {
            println!("  {}", "(no achievement files)".dimmed());
        }

        for file in files {
            total += 1;
            let rel = file.strip_prefix(&folder).unwrap_or(&file).display().to_string();
            print_file(&monitor, &file, &rel).await;
        }
        println!();
    }

    println!("{} achievement files", total);
    Ok(())
}

async fn print_file(monitor: &Monitor, file: &std::path::Path, rel: &str) {
    let Some(entity) = monitor.resolve(file) else {
        println!("  {} {}", rel, "(no app id)".dimmed());
        return;
    };

    match monitor.read_snapshot(file).await {
        Ok(snapshot) => println!(
            "  {} {} {}/{} unlocked",
            app_label(&entity).yellow(),
            rel,
            snapshot.unlocked_count(),
            snapshot.len()
        ),
        Err(e) => println!(
            "  {} {} {}",
            app_label(&entity).yellow(),
            rel,
            format!("({e})").red()
        ),
    }
}

fn app_label(entity: &EntityId) -> String {
    format!("[{}]", entity)
}
