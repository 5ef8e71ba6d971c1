use super::*;
use crate::commands::music::utils::embedded_messages;
use tracing::info;

/// Skip the currently playing song
#[poise::command(
    slash_command,
    prefix_command,
    aliases("s"),
    guild_only,
    category = "Music"
)]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    let guild_id = command_guild(ctx)?;

    let reply = match ctx.data().music.skip(guild_id).await {
        Ok(Some(track)) => embedded_messages::skipped(&track),
        Ok(None) | Err(MusicError::NoActiveQueue) => embedded_messages::no_track_playing(),
        Err(err) => return Err(err.into()),
    };
    ctx.send(reply).await?;

    Ok(())
}

/// Stop the music and clear the queue
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    let guild_id = command_guild(ctx)?;

    let reply = match ctx.data().music.stop(guild_id).await {
        Ok(()) => {
            info!("Stopped playback in guild {}", guild_id);
            embedded_messages::stopped()
        }
        Err(MusicError::NoActiveQueue) => embedded_messages::no_queue(),
        Err(err) => return Err(err.into()),
    };
    ctx.send(reply).await?;

    Ok(())
}
