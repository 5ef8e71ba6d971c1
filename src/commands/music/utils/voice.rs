//! Voice-channel helpers built on the serenity cache and songbird.

use poise::serenity_prelude as serenity;
use serenity::client::Context;
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::prelude::Mutex as SerenityMutex;
use songbird::{Call, Songbird};
use std::sync::Arc;
use tracing::{error, info};

use super::music_manager::{MusicError, MusicResult};

/// Get the Songbird voice client from the context
pub async fn get_songbird(ctx: &Context) -> MusicResult<Arc<Songbird>> {
    songbird::get(ctx).await.ok_or(MusicError::NoVoiceManager)
}

/// Get the voice channel ID that the user is currently in
pub fn get_user_voice_channel(
    ctx: &Context,
    guild_id: GuildId,
    user_id: UserId,
) -> MusicResult<ChannelId> {
    let guild = ctx.cache.guild(guild_id).ok_or(MusicError::NotInGuild)?;

    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
        .ok_or(MusicError::UserNotInVoiceChannel)
}

/// Join the user's voice channel unless the bot already has a call in the guild
pub async fn ensure_joined(
    ctx: &Context,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> MusicResult<Arc<SerenityMutex<Call>>> {
    let songbird = get_songbird(ctx).await?;
    if let Some(call) = songbird.get(guild_id) {
        return Ok(call);
    }

    match songbird.join(guild_id, channel_id).await {
        Ok(call) => {
            info!("Joined voice channel {} in guild {}", channel_id, guild_id);
            Ok(call)
        }
        Err(err) => {
            error!(
                "Failed to join voice channel {} for guild {}: {}",
                channel_id, guild_id, err
            );
            Err(MusicError::JoinError(err.to_string()))
        }
    }
}

/// Leave the voice channel without going through a player
pub async fn leave_channel(ctx: &Context, guild_id: GuildId) -> MusicResult<()> {
    let songbird = get_songbird(ctx).await?;
    if songbird.get(guild_id).is_none() {
        return Err(MusicError::NotConnected);
    }

    songbird
        .remove(guild_id)
        .await
        .map_err(|e| MusicError::JoinError(e.to_string()))
}

/// Count the occupants of `channel_id` that are not bots.
///
/// `occupants` yields each voice member's channel and whether it is a bot.
pub fn count_listeners(
    channel_id: ChannelId,
    occupants: impl IntoIterator<Item = (Option<ChannelId>, bool)>,
) -> usize {
    occupants
        .into_iter()
        .filter(|(channel, is_bot)| *channel == Some(channel_id) && !is_bot)
        .count()
}

/// Listeners sharing a voice channel with the bot. A bot that is not in any
/// voice channel has none.
pub fn listeners_in(
    bot_channel: Option<ChannelId>,
    occupants: impl IntoIterator<Item = (Option<ChannelId>, bool)>,
) -> usize {
    bot_channel.map_or(0, |channel_id| count_listeners(channel_id, occupants))
}

/// Listeners left with the bot in `guild_id`, or `None` when the guild is not
/// cached.
pub fn listeners_with_bot(ctx: &Context, guild_id: GuildId) -> Option<usize> {
    let bot_id = ctx.cache.current_user().id;
    let guild = ctx.cache.guild(guild_id)?;
    let bot_channel = guild
        .voice_states
        .get(&bot_id)
        .and_then(|state| state.channel_id);

    let occupants = guild.voice_states.iter().map(|(user_id, state)| {
        let is_bot = *user_id == bot_id
            || state
                .member
                .as_ref()
                .map(|member| member.user.bot)
                .or_else(|| guild.members.get(user_id).map(|member| member.user.bot))
                .unwrap_or(false);
        (state.channel_id, is_bot)
    });

    Some(listeners_in(bot_channel, occupants))
}
