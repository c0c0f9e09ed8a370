//! Video identification and metadata lookup.

mod details;
mod id;

pub use details::{DetailsProvider, OembedDetailsProvider, VideoDetails, PLACEHOLDER_TITLE};
pub use id::VideoId;
