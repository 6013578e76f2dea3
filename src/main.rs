use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use declutter::core::clip::ClipEmbedder;
use declutter::core::grouping::DEFAULT_SIMILARITY_THRESHOLD;
use declutter::core::provider::{EmbeddingProvider, LazyEmbedder};
use declutter::{scan, AppState, Session};
use dialoguer::{Confirm, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(
    name = "declutter",
    version,
    about = "Group look-alike photos, score them, keep the best"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a directory and list similarity groups
    Scan {
        /// Directory to analyze
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Cosine similarity needed to join a group
        #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f32,
        /// Emit the result as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Auto-select the best of each group and export the keepers
    Cull {
        /// Directory to analyze
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Directory to copy keepers into (default: `<dir>/keepers`)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f32,
        /// Only show what would be exported
        #[arg(long)]
        dry_run: bool,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Interactively adjust the selection with undo/redo, then export
    Review {
        /// Directory to analyze
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Directory to copy the final selection into
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            path,
            threshold,
            json,
        } => {
            let (_session, state) = analyze_directory(&path, threshold).await?;
            if json {
                let report = serde_json::json!({
                    "groups": &state.groups,
                    "uniquePhotos": &state.unique_photos,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&state);
            }
        }

        Commands::Cull {
            path,
            output,
            threshold,
            dry_run,
            yes,
        } => {
            let (session, state) = analyze_directory(&path, threshold).await?;
            print_report(&state);

            let output = output.unwrap_or_else(|| path.join("keepers"));
            println!(
                "\n▶ {} photo(s) selected for export to {}",
                state.selected_photos.len(),
                output.display()
            );

            if dry_run {
                for id in &state.selected_photos {
                    if let Some(photo) = state.photos.iter().find(|p| &p.id == id) {
                        println!("   📦 [dry-run] COPY {}", photo.path.display());
                    }
                }
                println!("\n⚠️  Dry-run only; no files were copied.");
                return Ok(());
            }

            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Export the selected photos?")
                    .default(true)
                    .interact()
                    .context("confirmation prompt failed")?;
                if !confirmed {
                    println!("Aborted.");
                    return Ok(());
                }
            }

            let exported = session.export_selected(&output).await?;
            println!("\n✅ Exported {} photo(s) to {}", exported.len(), output.display());
        }

        Commands::Review {
            path,
            output,
            threshold,
        } => {
            let (session, _state) = analyze_directory(&path, threshold).await?;
            let output = output.unwrap_or_else(|| path.join("keepers"));
            review_loop(&session, &output).await?;
        }
    }

    Ok(())
}

/// Discovers images under `path`, runs the analysis pipeline with a
/// progress bar, and returns the session plus the ingested state.
async fn analyze_directory(path: &Path, threshold: f32) -> Result<(Session, Arc<AppState>)> {
    let images = scan::discover_images(path);
    if images.is_empty() {
        bail!("no images found under {}", path.display());
    }
    println!("▶ Analyzing {} image(s) in {}…", images.len(), path.display());

    let embedder = Arc::new(LazyEmbedder::new(|| {
        let provider = ClipEmbedder::new()?;
        Ok(Arc::new(provider) as Arc<dyn EmbeddingProvider>)
    }));
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let session = Session::new(embedder)
        .with_threshold(threshold)
        .with_progress_sender(progress_tx);

    let bar = ProgressBar::new(images.len() as u64);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40.green} {pos}/{len} {msg}",
    )?);
    // ProgressBar clones share state; the task updates, we finish.
    let task_bar = bar.clone();
    let bar_updates = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            task_bar.set_position(progress.files_processed as u64);
            task_bar.set_message(progress.current_file);
        }
    });

    let state = session.import(&images).await;
    bar_updates.abort();
    bar.finish_and_clear();

    Ok((session, state))
}

fn print_report(state: &AppState) {
    println!(
        "Found {} group(s) and {} unique photo(s):",
        state.groups.len(),
        state.unique_photos.len()
    );

    for (i, group) in state.groups.iter().enumerate() {
        println!(
            "\n✨ Group {} ({} photos, similarity ≥ {:.2}):",
            i + 1,
            group.photos.len(),
            group.similarity
        );
        for (rank, photo) in group.photos.iter().enumerate() {
            let marker = if rank == 0 { "🏆 keep" } else { "   cull" };
            println!(
                "   {} → {} (quality {})",
                marker, photo.file_name, photo.quality
            );
        }
    }

    if !state.unique_photos.is_empty() {
        println!("\n📷 Unique:");
        for photo in &state.unique_photos {
            println!("   ▶ {} (quality {})", photo.file_name, photo.quality);
        }
    }
}

async fn review_loop(session: &Session, output: &Path) -> Result<()> {
    loop {
        let state = session.state().await;
        println!(
            "\n{} photo(s), {} selected, {} group(s)",
            state.photos.len(),
            state.selected_photos.len(),
            state.groups.len()
        );

        let actions = [
            "Toggle a photo",
            "Select a whole group",
            "Deselect a whole group",
            "Select all",
            "Deselect all",
            "Undo",
            "Redo",
            "Export selection and quit",
            "Quit without exporting",
        ];
        let choice = Select::new()
            .with_prompt("Action")
            .items(&actions)
            .default(0)
            .interact()
            .context("selection prompt failed")?;

        match choice {
            0 => {
                let labels: Vec<String> = state
                    .photos
                    .iter()
                    .map(|p| {
                        let mark = if p.selected { "[x]" } else { "[ ]" };
                        format!("{} {} (quality {})", mark, p.file_name, p.quality)
                    })
                    .collect();
                let picked = Select::new()
                    .with_prompt("Photo")
                    .items(&labels)
                    .default(0)
                    .interact()?;
                session.toggle_select(&state.photos[picked].id).await;
            }
            1 | 2 => {
                if state.groups.is_empty() {
                    println!("No groups to operate on.");
                    continue;
                }
                let labels: Vec<String> = state
                    .groups
                    .iter()
                    .map(|g| format!("{} ({} photos)", g.photos[0].file_name, g.photos.len()))
                    .collect();
                let picked = Select::new()
                    .with_prompt("Group")
                    .items(&labels)
                    .default(0)
                    .interact()?;
                let group_id = &state.groups[picked].id;
                if choice == 1 {
                    session.select_all_in_group(group_id).await;
                } else {
                    session.deselect_all_in_group(group_id).await;
                }
            }
            3 => {
                session.select_all().await;
            }
            4 => {
                session.deselect_all().await;
            }
            5 => {
                session.undo().await;
            }
            6 => {
                session.redo().await;
            }
            7 => {
                let exported = session.export_selected(output).await?;
                println!("✅ Exported {} photo(s) to {}", exported.len(), output.display());
                return Ok(());
            }
            _ => return Ok(()),
        }
    }
}
