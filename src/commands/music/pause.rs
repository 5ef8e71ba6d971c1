use super::*;
use crate::commands::music::utils::embedded_messages;

/// Pause the current song
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let guild_id = command_guild(ctx)?;

    let reply = match ctx.data().music.pause(guild_id).await {
        Ok(()) => embedded_messages::paused(),
        Err(MusicError::PreconditionMismatch { .. } | MusicError::NoActiveQueue) => {
            embedded_messages::no_track_playing()
        }
        Err(err) => return Err(err.into()),
    };
    ctx.send(reply).await?;

    Ok(())
}

/// Resume the paused song
#[poise::command(
    slash_command,
    prefix_command,
    aliases("r"),
    guild_only,
    category = "Music"
)]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    let guild_id = command_guild(ctx)?;

    let reply = match ctx.data().music.resume(guild_id).await {
        Ok(()) => embedded_messages::resumed(),
        Err(MusicError::PreconditionMismatch { .. } | MusicError::NoActiveQueue) => {
            embedded_messages::nothing_paused()
        }
        Err(err) => return Err(err.into()),
    };
    ctx.send(reply).await?;

    Ok(())
}
