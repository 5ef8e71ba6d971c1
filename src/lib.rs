use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;

pub mod commands;
pub mod config;
pub mod events;

use commands::music::audio_sources::TrackResolver;
use commands::music::utils::music_manager::MusicManager;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub music: Arc<MusicManager>,
    pub resolver: Arc<dyn TrackResolver>,
    /// Text channel each guild's last music command came from
    pub notice_channels: Arc<DashMap<GuildId, ChannelId>>,
}

#[poise::command(slash_command, prefix_command, aliases("h"), category = "General")]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
pub async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

/// Every command the bot registers
pub fn all_commands() -> Vec<poise::Command<Data, Error>> {
    use commands::music::{leave::*, pause::*, play::*, queue::*, skip::*};

    vec![
        // Default commands
        register(),
        help(),
        // Music commands
        play(),
        skip(),
        stop(),
        pause(),
        resume(),
        queue(),
        leave(),
    ]
}
