//! Doctor command implementation.
//!
//! Reports which transcript sources can run in this environment and
//! whether required configuration is present.

use crate::cli::preflight::tool_available;
use crate::cli::Output;
use crate::config::Settings;
use crate::openai::is_api_key_configured;
use anyhow::Result;
use console::style;

fn report(ok: bool, label: &str, detail: &str) {
    let mark = if ok {
        style("ok").green().bold()
    } else {
        style("missing").red().bold()
    };
    println!("  [{}] {} - {}", mark, style(label).bold(), detail);
}

/// Run the doctor command.
pub fn run_doctor(settings: &Settings) -> Result<()> {
    Output::header("Environment");

    report(
        is_api_key_configured(),
        "OPENAI_API_KEY",
        "required for embeddings and the speech-to-text fallback",
    );
    report(
        settings.sources.resolve_api_key().is_some(),
        "TRANSCRIPT_API_KEY",
        "enables the hosted transcript API (first source tried)",
    );
    report(
        tool_available("yt-dlp"),
        "yt-dlp",
        "enables subtitle extraction and the audio fallback",
    );
    report(
        tool_available("ffmpeg"),
        "ffmpeg",
        "used to normalize and segment downloaded audio",
    );
    report(
        tool_available("ffprobe"),
        "ffprobe",
        "used to measure audio duration before segmenting",
    );

    Output::header("Configuration");
    Output::kv("Config file", &Settings::default_config_path().display().to_string());
    Output::kv("Database", &settings.sqlite_path().display().to_string());
    Output::kv("Temp dir", &settings.temp_dir().display().to_string());
    Output::kv(
        "Audio fallback",
        if settings.sources.allow_audio_fallback { "enabled" } else { "disabled" },
    );
    Output::kv("Embedding model", &settings.embedding.model);
    Output::kv(
        "Rate limit",
        &format!("{} requests/minute", settings.embedding.requests_per_minute),
    );

    println!();
    if !is_api_key_configured() {
        Output::warning("Set OPENAI_API_KEY before running 'hark ingest'.");
    } else {
        Output::success("Ready to ingest.");
    }

    Ok(())
}
