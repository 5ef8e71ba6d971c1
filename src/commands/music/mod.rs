pub mod leave;
pub mod pause;
pub mod play;
pub mod queue;
pub mod skip;

pub mod audio_sources;
pub mod utils;

use crate::{CommandResult, Context, Error};
use poise::serenity_prelude::GuildId;
use utils::music_manager::MusicError;

/// The guild a command was invoked in, remembering its channel for player
/// notifications.
fn command_guild(ctx: Context<'_>) -> Result<GuildId, Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or_else(|| Box::new(MusicError::NotInGuild) as Error)?;
    ctx.data()
        .notice_channels
        .insert(guild_id, ctx.channel_id());
    Ok(guild_id)
}
