use super::*;
use crate::commands::music::utils::{button_controls, embedded_messages};
use poise::serenity_prelude as serenity;
use serenity::all::{
    ComponentInteractionCollector, CreateInteractionResponse, CreateInteractionResponseMessage,
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// How long the page buttons stay active after the queue is shown
const QUEUE_PAGING_WINDOW: Duration = Duration::from_secs(60);

/// Show the current queue
#[poise::command(
    slash_command,
    prefix_command,
    aliases("list", "l"),
    guild_only,
    category = "Music"
)]
pub async fn queue(ctx: Context<'_>) -> CommandResult {
    let guild_id = command_guild(ctx)?;

    let mut snapshot = match ctx.data().music.snapshot(guild_id).await {
        Ok(snapshot) => snapshot,
        Err(MusicError::NoActiveQueue) => {
            ctx.send(embedded_messages::no_queue()).await?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let mut page = 0;
    let handle = ctx
        .send(embedded_messages::music_queue(&snapshot, page))
        .await?;
    if embedded_messages::queue_page_count(snapshot.upcoming().len()) <= 1 {
        return Ok(());
    }

    let message_id = handle.message().await?.id;
    let deadline = Instant::now() + QUEUE_PAGING_WINDOW;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let Some(press) = ComponentInteractionCollector::new(ctx.serenity_context())
            .message_id(message_id)
            .timeout(remaining)
            .await
        else {
            break;
        };

        if press.user.id != ctx.author().id {
            press
                .create_response(
                    ctx.serenity_context(),
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("Only the person who asked for the queue can turn its pages.")
                            .ephemeral(true),
                    ),
                )
                .await?;
            continue;
        }

        if let Ok(fresh) = ctx.data().music.snapshot(guild_id).await {
            snapshot = fresh;
        }
        let pages = embedded_messages::queue_page_count(snapshot.upcoming().len());
        page = button_controls::turn_queue_page(page, pages, &press.data.custom_id);
        debug!("Guild {} queue turned to page {}/{}", guild_id, page + 1, pages);

        press
            .create_response(
                ctx.serenity_context(),
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new()
                        .embed(embedded_messages::queue_embed(&snapshot, page))
                        .components(button_controls::queue_page_buttons(page, pages)),
                ),
            )
            .await?;
    }

    handle
        .edit(ctx, embedded_messages::expired_music_queue(&snapshot, page))
        .await?;

    Ok(())
}
