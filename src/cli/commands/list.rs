//! List command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::store::{SqliteStore, VideoStore};
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    preflight::check(Operation::Browse)?;

    let store = SqliteStore::new(&settings.sqlite_path())?;

    let videos = store.list_videos().await?;

    if videos.is_empty() {
        Output::info("No videos ingested yet. Use 'hark ingest <url>' to add content.");
        return Ok(());
    }

    Output::header(&format!("Ingested Videos ({})", videos.len()));
    println!();

    for video in &videos {
        Output::video_info(
            &video.title,
            &video.video_id,
            &video.transcript_source,
            video.chunk_count,
        );
    }

    let total_chunks: u32 = videos.iter().map(|v| v.chunk_count).sum();
    println!();
    Output::kv("Total videos", &videos.len().to_string());
    Output::kv("Total chunks", &total_chunks.to_string());

    Ok(())
}
