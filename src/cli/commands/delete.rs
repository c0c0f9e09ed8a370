//! Delete command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::store::{SqliteStore, VideoStore};
use anyhow::Result;

/// Run the delete command.
pub async fn run_delete(video_id: &str, settings: Settings) -> Result<()> {
    preflight::check(Operation::Browse)?;

    let store = SqliteStore::new(&settings.sqlite_path())?;

    match store.find_by_video_id(video_id).await? {
        Some(video) => {
            store.delete_video(video.id).await?;
            Output::success(&format!(
                "Deleted '{}' ({} chunks)",
                video.title, video.chunk_count
            ));
            Ok(())
        }
        None => {
            Output::warning(&format!("No ingested video with id '{}'", video_id));
            Ok(())
        }
    }
}
