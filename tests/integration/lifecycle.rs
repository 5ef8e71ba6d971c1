use pretty_assertions::assert_eq;
use rstest::rstest;
use serenity::model::id::GuildId;
use std::time::Duration;

use jukebox::commands::music::utils::guild_player::{EnqueueOutcome, PlayerSettings};
use jukebox::commands::music::utils::notifications::{DepartReason, MusicEventKind};
use test_case::test_case;

use crate::common::fixtures::{Harness, guild, harness, requested, settle};
use crate::common::mocks::silent_recommender;

fn departures(events: &[MusicEventKind]) -> Vec<DepartReason> {
    events
        .iter()
        .filter_map(|kind| match kind {
            MusicEventKind::Departed(reason) => Some(*reason),
            _ => None,
        })
        .collect()
}

/// A guild with nothing to play leaves once the grace period runs out
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_idle_timeout_tears_down(mut harness: Harness, guild: GuildId) {
    harness.manager.enqueue(guild, requested("a")).await.unwrap();
    let probe = harness.connector.probe(guild);
    probe.finish_current();
    settle().await;
    assert!(harness.manager.snapshot(guild).await.unwrap().idle_timer_armed);

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(harness.manager.has_queue(guild));
    assert!(departures(&harness.drain_events()).is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!harness.manager.has_queue(guild));
    assert_eq!(
        departures(&harness.drain_events()),
        vec![DepartReason::Inactivity]
    );
    assert_eq!(probe.disconnects(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(harness.drain_events().is_empty());
}

/// An empty guild that never played anything also times out
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_idle_timeout_without_any_track(mut harness: Harness, guild: GuildId) {
    harness.opener.fail_url(&crate::common::fixtures::url_for("bad"));
    let outcome = harness.manager.enqueue(guild, requested("bad")).await.unwrap();
    assert_eq!(outcome, EnqueueOutcome::Unplayable);

    tokio::time::sleep(Duration::from_secs(31)).await;

    assert!(!harness.manager.has_queue(guild));
    assert_eq!(
        departures(&harness.drain_events()),
        vec![DepartReason::Inactivity]
    );
}

/// Enqueueing during the grace period cancels the pending teardown
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_enqueue_disarms_idle_timer(mut harness: Harness, guild: GuildId) {
    harness.manager.enqueue(guild, requested("a")).await.unwrap();
    harness.connector.probe(guild).finish_current();
    settle().await;

    tokio::time::sleep(Duration::from_secs(20)).await;
    let outcome = harness.manager.enqueue(guild, requested("b")).await.unwrap();
    assert_eq!(outcome, EnqueueOutcome::Started);
    assert!(!harness.manager.snapshot(guild).await.unwrap().idle_timer_armed);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(harness.manager.has_queue(guild));
    assert!(departures(&harness.drain_events()).is_empty());
}

/// Skip while idle restarts the grace period instead of keeping the old one
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_idle_skip_restarts_idle_timer(mut harness: Harness, guild: GuildId) {
    harness.manager.enqueue(guild, requested("a")).await.unwrap();
    harness.connector.probe(guild).finish_current();
    settle().await;
    assert!(harness.manager.snapshot(guild).await.unwrap().idle_timer_armed);

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(harness.manager.skip(guild).await.unwrap(), None);

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert!(harness.manager.has_queue(guild));
    assert!(departures(&harness.drain_events()).is_empty());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(!harness.manager.has_queue(guild));
    assert_eq!(
        departures(&harness.drain_events()),
        vec![DepartReason::Inactivity]
    );
}

/// Stop restarts the grace period and the player leaves afterwards
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_stop_then_idle_timeout(mut harness: Harness, guild: GuildId) {
    harness.manager.enqueue(guild, requested("a")).await.unwrap();
    harness.manager.stop(guild).await.unwrap();

    tokio::time::sleep(Duration::from_secs(31)).await;

    assert!(!harness.manager.has_queue(guild));
    assert_eq!(
        departures(&harness.drain_events()),
        vec![DepartReason::Inactivity]
    );
}

/// Losing every listener tears the guild down immediately, once
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_no_listeners_tears_down_once(mut harness: Harness, guild: GuildId) {
    harness.manager.enqueue(guild, requested("a")).await.unwrap();
    harness.manager.enqueue(guild, requested("b")).await.unwrap();
    harness.drain_events();

    harness.manager.presence_changed(guild, 0);
    harness.manager.presence_changed(guild, 0);
    settle().await;

    assert!(!harness.manager.has_queue(guild));
    assert_eq!(
        departures(&harness.drain_events()),
        vec![DepartReason::NoListeners]
    );
    assert_eq!(harness.opener.alive(), 0);
    assert_eq!(harness.connector.probe(guild).disconnects(), 1);

    harness.manager.presence_changed(guild, 0);
    settle().await;
    assert!(harness.drain_events().is_empty());
}

/// Listener counts above zero leave the player alone
#[test_case(1 ; "one listener")]
#[test_case(5 ; "several listeners")]
#[tokio::test(start_paused = true)]
async fn test_listeners_present_keeps_playing(listeners: usize) {
    let guild = GuildId::new(7);
    let mut harness = Harness::new(silent_recommender());
    harness.manager.enqueue(guild, requested("a")).await.unwrap();
    harness.drain_events();

    harness.manager.presence_changed(guild, listeners);
    settle().await;

    assert!(harness.manager.has_queue(guild));
    assert!(harness.drain_events().is_empty());
}

/// Presence changes for guilds without a player create nothing
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_presence_without_player(mut harness: Harness, guild: GuildId) {
    harness.manager.presence_changed(guild, 0);
    settle().await;

    assert!(!harness.manager.has_queue(guild));
    assert_eq!(harness.connector.connects(), 0);
    assert!(harness.drain_events().is_empty());
}

/// An explicit leave disconnects and reports the departure
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_leave(mut harness: Harness, guild: GuildId) {
    harness.manager.enqueue(guild, requested("a")).await.unwrap();
    harness.drain_events();

    harness.manager.leave(guild).await.unwrap();
    settle().await;

    assert!(!harness.manager.has_queue(guild));
    assert_eq!(
        harness.drain_events(),
        vec![MusicEventKind::Departed(DepartReason::Requested)]
    );
    assert_eq!(harness.opener.alive(), 0);
    assert!(harness.manager.leave(guild).await.is_err());
}

/// A new enqueue after teardown starts a fresh player with empty history
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_fresh_player_after_teardown(mut harness: Harness, guild: GuildId) {
    harness.manager.enqueue(guild, requested("a")).await.unwrap();
    harness.manager.leave(guild).await.unwrap();
    settle().await;

    let outcome = harness.manager.enqueue(guild, requested("b")).await.unwrap();

    assert_eq!(outcome, EnqueueOutcome::Started);
    assert_eq!(harness.connector.connects(), 2);
    let snapshot = harness.manager.snapshot(guild).await.unwrap();
    assert_eq!(snapshot.history, vec!["b".to_string()]);
    assert_eq!(snapshot.pending_ids(), vec!["b"]);
    harness.drain_events();
}

/// A custom idle timeout is honoured
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_custom_idle_timeout(guild: GuildId) {
    let settings = PlayerSettings {
        idle_timeout: Duration::from_secs(5),
        ..PlayerSettings::default()
    };
    let mut harness = Harness::with_settings(silent_recommender(), settings);
    harness.manager.enqueue(guild, requested("a")).await.unwrap();
    harness.manager.stop(guild).await.unwrap();

    tokio::time::sleep(Duration::from_secs(6)).await;

    assert!(!harness.manager.has_queue(guild));
    assert_eq!(
        departures(&harness.drain_events()),
        vec![DepartReason::Inactivity]
    );
}

/// Shutdown tears down every guild
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_shutdown_departs_all_guilds(mut harness: Harness) {
    for id in 1..=3 {
        harness
            .manager
            .enqueue(GuildId::new(id), requested("a"))
            .await
            .unwrap();
    }
    harness.drain_events();

    harness.manager.shutdown().await;
    settle().await;

    assert_eq!(harness.manager.active_guilds(), 0);
    assert_eq!(
        departures(&harness.drain_events()),
        vec![DepartReason::Requested; 3]
    );
}
