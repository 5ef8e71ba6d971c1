use ::serenity::all::ClientBuilder;
use dashmap::DashMap;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use jukebox::commands::music::audio_sources::related_songs::ytdl::YtDlpFetcher;
use jukebox::commands::music::audio_sources::youtube::YoutubeApi;
use jukebox::commands::music::utils::music_manager::MusicManager;
use jukebox::commands::music::utils::notifications::spawn_notifier;
use jukebox::commands::music::utils::playback_sink::SongbirdConnector;
use jukebox::commands::music::utils::stream_source::YtDlpStreamOpener;
use jukebox::config::BotConfig;
use jukebox::events::Handler;
use jukebox::{Data, Error, all_commands};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jukebox=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = BotConfig::from_env()?;

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let songbird = Songbird::serenity();
    let (music, events) = MusicManager::new(
        Arc::new(SongbirdConnector::new(Arc::clone(&songbird))),
        Arc::new(YtDlpStreamOpener::new(config.yt_dlp_path.clone())),
        Arc::new(YtDlpFetcher::new(config.yt_dlp_path.clone())),
        config.player_settings(),
    );
    let music = Arc::new(music);
    let resolver = Arc::new(YoutubeApi::new(config.yt_dlp_path.clone()));
    let notice_channels = Arc::new(DashMap::new());

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: all_commands(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.command_prefix.clone()),
                ..Default::default()
            },
            ..Default::default()
        })
        .setup({
            let music = Arc::clone(&music);
            move |ctx, _ready, framework| {
                Box::pin(async move {
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                    spawn_notifier(ctx.http.clone(), Arc::clone(&notice_channels), events);
                    Ok(Data {
                        music,
                        resolver,
                        notice_channels,
                    })
                })
            }
        });

    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework.build())
        .event_handler(Handler::new(Arc::clone(&music)))
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        info!("Shutting down");
        music.shutdown().await;
        shard_manager.shutdown_all().await;
    });

    client.start().await.map_err(Into::into)
}
