//! Configuration management for Hark.

mod settings;

pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, Settings, SourceSettings,
    StoreSettings, TranscriptionSettings,
};
