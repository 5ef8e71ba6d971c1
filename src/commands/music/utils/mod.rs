use std::time::Duration;

// Export music utilities
pub mod autoplay_manager;
pub mod button_controls;
pub mod embedded_messages;
pub mod event_handlers;
pub mod guild_player;
pub mod music_manager;
pub mod notifications;
pub mod playback_sink;
pub mod queue_manager;
pub mod stream_source;
pub mod voice;

const PROGRESS_BAR_LENGTH: usize = 10;

/// Format a duration into a human-readable string (e.g., "3:45" or "1:23:45")
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Format a track length, showing "Live" for unbounded streams
pub fn format_track_duration(duration: Option<Duration>) -> String {
    duration
        .map(format_duration)
        .unwrap_or_else(|| "Live".to_string())
}

/// Render playback progress, e.g. `▶ ███─────── 30%`
pub fn progress_bar(elapsed: Duration, total: Option<Duration>) -> String {
    let Some(total) = total.filter(|total| !total.is_zero()) else {
        return "🔴 LIVE".to_string();
    };

    let ratio = (elapsed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0);
    let filled = (ratio * PROGRESS_BAR_LENGTH as f64).round() as usize;
    let empty = PROGRESS_BAR_LENGTH - filled;

    format!(
        "▶ {}{} {}%",
        "█".repeat(filled),
        "─".repeat(empty),
        (ratio * 100.0).round() as u32
    )
}
