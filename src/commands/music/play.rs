use super::*;
use crate::commands::music::audio_sources::Requester;
use crate::commands::music::utils::{embedded_messages, guild_player::EnqueueOutcome, voice};
use tracing::info;

/// Play a song from YouTube or a direct URL
#[poise::command(
    slash_command,
    prefix_command,
    aliases("p"),
    guild_only,
    category = "Music"
)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"]
    #[rest]
    query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);
    let guild_id = command_guild(ctx)?;

    // Get the user's voice channel
    let channel_id =
        match voice::get_user_voice_channel(ctx.serenity_context(), guild_id, ctx.author().id) {
            Ok(channel_id) => channel_id,
            Err(err) => {
                ctx.send(embedded_messages::user_not_in_voice_channel(err))
                    .await?;
                return Ok(());
            }
        };

    // Defer the response since resolving might take time
    ctx.defer().await?;

    if let Err(err) = voice::ensure_joined(ctx.serenity_context(), guild_id, channel_id).await {
        ctx.send(embedded_messages::failed_to_join_voice_channel(err))
            .await?;
        return Ok(());
    }

    let Some(track) = ctx.data().resolver.resolve(&query).await else {
        info!("No track found for query: {}", query);
        ctx.send(embedded_messages::not_found(&query)).await?;
        return Ok(());
    };

    let author = ctx.author();
    let track = track.with_requester(Requester {
        id: author.id.get(),
        name: author.name.clone(),
    });

    let reply = match ctx.data().music.enqueue(guild_id, track.clone()).await {
        Ok(EnqueueOutcome::Started) => embedded_messages::started(&track),
        Ok(EnqueueOutcome::Queued { position }) => embedded_messages::queued(&track, position),
        Ok(EnqueueOutcome::Unplayable) => embedded_messages::unplayable(&track),
        Err(err) => embedded_messages::failed_to_add_to_queue(err),
    };
    ctx.send(reply).await?;

    Ok(())
}
