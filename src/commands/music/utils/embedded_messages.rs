use poise::{CreateReply, serenity_prelude as serenity};
use serenity::all::{CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter};

use super::notifications::{DepartReason, MusicEventKind};
use super::button_controls::queue_page_buttons;
use super::queue_manager::QueueSnapshot;
use super::{format_duration, format_track_duration, music_manager::MusicError, progress_bar};
use crate::commands::music::audio_sources::Track;

const COLOR_REQUESTED: u32 = 0x1db954;
const COLOR_AUTOPLAY: u32 = 0x9b59b6;
const COLOR_INFO: u32 = 0x00ff00;
const COLOR_ERROR: u32 = 0xff0000;

/// Upcoming tracks listed per queue page
pub const QUEUE_PAGE_SIZE: usize = 5;

fn track_link(track: &Track) -> String {
    format!("[{}]({})", track.title, track.url)
}

fn error_reply(description: impl Into<String>) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("❌ Error")
            .description(description)
            .color(COLOR_ERROR),
    )
}

/// Create an embed for when a song starts playing
pub fn now_playing(track: &Track) -> CreateEmbed {
    let (author, color) = if track.is_autoplay {
        ("🎵 Now Playing • Autoplay", COLOR_AUTOPLAY)
    } else {
        ("🎵 Now Playing", COLOR_REQUESTED)
    };

    let mut embed = CreateEmbed::new()
        .author(CreateEmbedAuthor::new(author))
        .description(format!("**{}**", track_link(track)))
        .field(
            "Duration",
            format!("`{}`", format_track_duration(track.duration)),
            true,
        )
        .field("Requested by", track.requester_label(), true)
        .color(color);

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    embed
}

/// Create an embed for when a song is added to the queue
pub fn added_to_queue(track: &Track, position: usize) -> CreateEmbed {
    CreateEmbed::new()
        .title("🎵 Added to Queue")
        .description(track_link(track))
        .field(
            "Duration",
            format!("`{}`", format_track_duration(track.duration)),
            true,
        )
        .field("Position", format!("`#{}`", position), true)
        .color(COLOR_INFO)
}

/// Create an embed for when autoplay refills the queue
pub fn autoplay_added(seed: &Track, added: &[Track], history_reset: bool) -> CreateEmbed {
    let mut description = format!("Queue ran out, adding tracks related to **{}**\n", seed.title);
    for track in added {
        description.push_str(&format!("• {}\n", track_link(track)));
    }

    let mut embed = CreateEmbed::new()
        .title("🔄 Autoplay")
        .description(description)
        .color(COLOR_AUTOPLAY);
    if history_reset {
        embed = embed.footer(serenity::all::CreateEmbedFooter::new(
            "Ran out of new recommendations, repeats allowed again",
        ));
    }
    embed
}

/// Create an embed for when the bot leaves a guild on its own or on request
pub fn departed(reason: DepartReason) -> CreateEmbed {
    let description = match reason {
        DepartReason::Inactivity => "Nothing left to play, leaving the voice channel",
        DepartReason::NoListeners => "Everyone left, so I did too",
        DepartReason::Requested => "Disconnected and cleared the queue",
    };

    CreateEmbed::new()
        .title("👋 Left Voice Channel")
        .description(description)
        .color(COLOR_INFO)
}

/// The embed posted for a player event, if it has one
pub fn event_embed(kind: &MusicEventKind) -> Option<CreateEmbed> {
    match kind {
        MusicEventKind::NowPlaying(track) => Some(now_playing(track)),
        MusicEventKind::Enqueued { track, position } => Some(added_to_queue(track, *position)),
        MusicEventKind::AutoplayTriggered {
            seed,
            added,
            history_reset,
        } => Some(autoplay_added(seed, added, *history_reset)),
        MusicEventKind::Departed(reason) => Some(departed(*reason)),
        MusicEventKind::Skipped(_)
        | MusicEventKind::Stopped
        | MusicEventKind::Paused
        | MusicEventKind::Resumed => None,
    }
}

/// Number of queue pages needed for `upcoming` tracks, never zero
pub fn queue_page_count(upcoming: usize) -> usize {
    upcoming.div_ceil(QUEUE_PAGE_SIZE).max(1)
}

/// The tracks shown on `page` (0-based, clamped to the last page) together
/// with the queue index of the first one
pub fn queue_page_slice(upcoming: &[Track], page: usize) -> (usize, &[Track]) {
    let page = page.min(queue_page_count(upcoming.len()) - 1);
    let start = page * QUEUE_PAGE_SIZE;
    let end = (start + QUEUE_PAGE_SIZE).min(upcoming.len());
    (start, &upcoming[start..end])
}

pub fn queue_page_label(page: usize, pages: usize) -> String {
    format!("Page {}/{}", page + 1, pages)
}

/// Build the description for one page of the queue embed
pub fn queue_description(snapshot: &QueueSnapshot, page: usize) -> String {
    let mut description = String::new();

    if let Some(track) = snapshot.now_playing() {
        description.push_str("**🎵 Now Playing**\n");
        description.push_str(&format!("**{}**", track_link(track)));
        if track.is_autoplay {
            description.push_str(" 🔄");
        }
        description.push('\n');

        let elapsed = snapshot.elapsed.unwrap_or_default();
        description.push_str(&progress_bar(elapsed, track.duration));
        description.push_str(&format!(
            " `{}/{}`\n\n",
            format_duration(elapsed),
            format_track_duration(track.duration)
        ));
    } else {
        description.push_str("**🔇 Nothing playing**\n\n");
    }

    let upcoming = snapshot.upcoming();
    if upcoming.is_empty() {
        description.push_str("**📭 Queue is empty**");
        return description;
    }

    description.push_str(&format!("**📋 Up Next - {} tracks**\n", upcoming.len()));
    let (start, tracks) = queue_page_slice(upcoming, page);
    for (offset, track) in tracks.iter().enumerate() {
        description.push_str(&format!(
            "`{}.` {} `{}`",
            start + offset + 1,
            track_link(track),
            format_track_duration(track.duration)
        ));
        if track.is_autoplay {
            description.push_str(" 🔄");
        }
        description.push('\n');
    }

    description
}

/// Create the embed for one page of the music queue
pub fn queue_embed(snapshot: &QueueSnapshot, page: usize) -> CreateEmbed {
    let pages = queue_page_count(snapshot.upcoming().len());
    let page = page.min(pages - 1);

    let mut embed = CreateEmbed::new()
        .title("🎵 Music Queue")
        .description(queue_description(snapshot, page))
        .footer(CreateEmbedFooter::new(format!(
            "{} • Total songs: {}",
            queue_page_label(page, pages),
            snapshot.pending.len()
        )))
        .color(COLOR_INFO);

    if let Some(thumbnail) = snapshot.now_playing().and_then(|t| t.thumbnail.as_ref()) {
        embed = embed.thumbnail(thumbnail);
    }
    embed
}

/// Create the queue reply, with page buttons when it spans several pages
pub fn music_queue(snapshot: &QueueSnapshot, page: usize) -> CreateReply {
    let pages = queue_page_count(snapshot.upcoming().len());
    let reply = CreateReply::default().embed(queue_embed(snapshot, page));
    if pages > 1 {
        reply.components(queue_page_buttons(page, pages))
    } else {
        reply
    }
}

/// The queue reply once paging has expired
pub fn expired_music_queue(snapshot: &QueueSnapshot, page: usize) -> CreateReply {
    CreateReply::default()
        .embed(queue_embed(snapshot, page))
        .components(Vec::new())
}

/// Create an embed for when a track starts right away
pub fn started(track: &Track) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("▶️ Starting")
            .description(track_link(track))
            .color(COLOR_REQUESTED),
    )
}

/// Create an embed for when a track is queued behind others
pub fn queued(track: &Track, position: usize) -> CreateReply {
    CreateReply::default().embed(added_to_queue(track, position))
}

/// Create an embed for when the requested track could not be streamed
pub fn unplayable(track: &Track) -> CreateReply {
    error_reply(format!("Couldn't stream {}", track_link(track)))
}

/// Create an embed for when a search returns nothing
pub fn not_found(query: &str) -> CreateReply {
    error_reply(format!("No results for `{}`", query))
}

/// Create an embed for when a user is not connected to a voice channel
pub fn user_not_in_voice_channel(err: MusicError) -> CreateReply {
    error_reply(format!("You need to be in a voice channel: {}", err)).ephemeral(true)
}

/// Create an embed for when the bot fails to join a voice channel
pub fn failed_to_join_voice_channel(err: MusicError) -> CreateReply {
    error_reply(format!("Failed to join voice channel: {}", err))
}

/// Create an embed for when the bot fails to add a track to the queue
pub fn failed_to_add_to_queue(err: MusicError) -> CreateReply {
    error_reply(format!("Failed to add track to queue: {}", err))
}

/// Create an embed for when a track is paused
pub fn paused() -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⏸️ Paused")
            .description("Playback paused")
            .color(COLOR_INFO),
    )
}

/// Create an embed for when a track is resumed
pub fn resumed() -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("▶️ Resumed")
            .description("Playback resumed")
            .color(COLOR_INFO),
    )
}

/// Create an embed for when nothing is playing
pub fn no_track_playing() -> CreateReply {
    error_reply("No track is currently playing")
}

/// Create an embed for when nothing is paused
pub fn nothing_paused() -> CreateReply {
    error_reply("Nothing is paused")
}

/// Create an embed for when the guild has no queue
pub fn no_queue() -> CreateReply {
    error_reply("Nothing is queued, use `play` to start")
}

/// Create an embed for when a track is skipped
pub fn skipped(track: &Track) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⏭️ Skipped")
            .description(format!("Skipped {}", track_link(track)))
            .color(COLOR_INFO),
    )
}

/// Create an embed for when the bot stops playing music
pub fn stopped() -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⏹️ Stopped")
            .description("Playback stopped and queue cleared")
            .color(COLOR_INFO),
    )
}

/// Create an embed for when the bot leaves a voice channel on request
pub fn left_voice_channel() -> CreateReply {
    CreateReply::default().embed(departed(DepartReason::Requested))
}

/// Create an embed for when the bot fails to leave a voice channel
pub fn failed_to_leave_voice_channel(err: MusicError) -> CreateReply {
    error_reply(format!("Failed to leave voice channel: {}", err))
}
