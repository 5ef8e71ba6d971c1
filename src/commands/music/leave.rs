use super::*;
use crate::commands::music::utils::{embedded_messages, voice};
use tracing::info;

/// Leave the voice channel
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn leave(ctx: Context<'_>) -> CommandResult {
    let guild_id = command_guild(ctx)?;

    match ctx.data().music.leave(guild_id).await {
        // The player posts its own departure notice.
        Ok(()) => {
            info!("Left guild {} on request", guild_id);
            ctx.send(
                poise::CreateReply::default()
                    .content("👋")
                    .ephemeral(true),
            )
            .await?;
        }
        // No player, but the bot may still sit in the channel.
        Err(MusicError::NoActiveQueue) => {
            let reply = match voice::leave_channel(ctx.serenity_context(), guild_id).await {
                Ok(()) => embedded_messages::left_voice_channel(),
                Err(err) => embedded_messages::failed_to_leave_voice_channel(err),
            };
            ctx.data().notice_channels.remove(&guild_id);
            ctx.send(reply).await?;
        }
        Err(err) => {
            ctx.send(embedded_messages::failed_to_leave_voice_channel(err))
                .await?;
        }
    }

    Ok(())
}
