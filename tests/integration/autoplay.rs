use pretty_assertions::assert_eq;
use rstest::rstest;
use serenity::model::id::GuildId;
use std::sync::{Arc, Mutex};

use jukebox::commands::music::utils::guild_player::PlayerSettings;
use jukebox::commands::music::utils::notifications::MusicEventKind;
use jukebox::commands::music::utils::playback_sink::SinkStatus;

use crate::common::fixtures::{Harness, guild, now_playing_ids, requested, settle, track, url_for};
use crate::common::mocks::MockRecommender;

fn recommending(seed: &'static str, related: &'static [&'static str]) -> MockRecommender {
    let mut recommender = MockRecommender::new();
    recommender.expect_related().returning(move |id, _| {
        if id == seed {
            related.iter().map(|id| track(id)).collect()
        } else {
            Vec::new()
        }
    });
    recommender
}

/// An exhausted queue is refilled from the last played track
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_autoplay_refills_exhausted_queue(guild: GuildId) {
    let mut harness = Harness::new(recommending("a", &["y", "z"]));
    harness.manager.enqueue(guild, requested("a")).await.unwrap();
    harness.drain_events();

    harness.connector.probe(guild).finish_current();
    settle().await;

    let events = harness.drain_events();
    assert_eq!(
        events[0],
        MusicEventKind::AutoplayTriggered {
            seed: requested("a"),
            added: vec![track("y").into_autoplay(), track("z").into_autoplay()],
            history_reset: false,
        }
    );
    assert_eq!(
        events[1],
        MusicEventKind::NowPlaying(track("y").into_autoplay())
    );

    let snapshot = harness.manager.snapshot(guild).await.unwrap();
    assert_eq!(snapshot.pending_ids(), vec!["y", "z"]);
    assert!(snapshot.pending.iter().all(|t| t.is_autoplay && t.requested_by.is_none()));
    assert_eq!(snapshot.status, SinkStatus::Playing);
}

/// Autoplay tracks keep playing in order without asking for more
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_autoplay_tracks_play_in_order(guild: GuildId) {
    let mut harness = Harness::new(recommending("a", &["y", "z"]));
    harness.manager.enqueue(guild, requested("a")).await.unwrap();

    let probe = harness.connector.probe(guild);
    probe.finish_current();
    settle().await;
    probe.finish_current();
    settle().await;

    assert_eq!(now_playing_ids(&harness.drain_events()), vec!["a", "y", "z"]);
    let snapshot = harness.manager.snapshot(guild).await.unwrap();
    assert_eq!(snapshot.pending_ids(), vec!["z"]);
}

/// When every candidate was played recently, history is cleared and a repeat
/// is played instead of going silent
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_autoplay_falls_back_to_repeats(guild: GuildId) {
    let mut harness = Harness::new(recommending("y", &["a"]));
    harness.manager.enqueue(guild, requested("a")).await.unwrap();
    harness.manager.enqueue(guild, requested("y")).await.unwrap();

    let probe = harness.connector.probe(guild);
    probe.finish_current();
    settle().await;
    assert_eq!(
        harness.manager.snapshot(guild).await.unwrap().history,
        vec!["a".to_string(), "y".to_string()]
    );
    harness.drain_events();

    probe.finish_current();
    settle().await;

    let events = harness.drain_events();
    assert_eq!(
        events[0],
        MusicEventKind::AutoplayTriggered {
            seed: requested("y"),
            added: vec![track("a").into_autoplay()],
            history_reset: true,
        }
    );
    assert_eq!(now_playing_ids(&events), vec!["a"]);

    let snapshot = harness.manager.snapshot(guild).await.unwrap();
    assert_eq!(snapshot.history, vec!["a".to_string()]);
    assert_eq!(snapshot.status, SinkStatus::Playing);
}

/// No more than the configured number of picks are injected per round
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_autoplay_pick_limit(guild: GuildId) {
    let mut harness = Harness::new(recommending("a", &["r1", "r2", "r3", "r4", "r5"]));
    harness.manager.enqueue(guild, requested("a")).await.unwrap();

    harness.connector.probe(guild).finish_current();
    settle().await;

    let snapshot = harness.manager.snapshot(guild).await.unwrap();
    assert_eq!(snapshot.pending_ids(), vec!["r1", "r2", "r3"]);
    harness.drain_events();
}

/// Pick count and fetch limit come from the player settings
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_autoplay_uses_settings(guild: GuildId) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut recommender = MockRecommender::new();
    let recorded = Arc::clone(&calls);
    recommender.expect_related().returning(move |id, limit| {
        recorded.lock().unwrap().push((id.to_string(), limit));
        vec![track("y"), track("z")]
    });

    let settings = PlayerSettings {
        autoplay_picks: 1,
        autoplay_fetch_limit: 5,
        ..PlayerSettings::default()
    };
    let harness = Harness::with_settings(recommender, settings);
    harness.manager.enqueue(guild, requested("a")).await.unwrap();

    harness.connector.probe(guild).finish_current();
    settle().await;

    assert_eq!(*calls.lock().unwrap(), vec![("a".to_string(), 5)]);
    let snapshot = harness.manager.snapshot(guild).await.unwrap();
    assert_eq!(snapshot.pending_ids(), vec!["y"]);
}

/// Without a previously played track there is nothing to seed autoplay with
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_no_autoplay_without_last_played(guild: GuildId) {
    let mut recommender = MockRecommender::new();
    recommender.expect_related().never();
    let harness = Harness::new(recommender);
    harness.opener.fail_url(&url_for("bad"));

    harness.manager.enqueue(guild, requested("a")).await.unwrap();
    harness.manager.stop(guild).await.unwrap();
    harness.manager.enqueue(guild, requested("bad")).await.unwrap();

    let snapshot = harness.manager.snapshot(guild).await.unwrap();
    assert!(snapshot.pending.is_empty());
    assert!(snapshot.idle_timer_armed);
}

/// Autoplay rounds whose picks all fail to open are bounded
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_unplayable_autoplay_rounds_are_bounded(guild: GuildId) {
    let mut recommender = MockRecommender::new();
    recommender
        .expect_related()
        .times(3)
        .returning(|_, _| vec![track("y")]);
    let harness = Harness::new(recommender);
    harness.opener.fail_url(&url_for("y"));

    harness.manager.enqueue(guild, requested("a")).await.unwrap();
    harness.connector.probe(guild).finish_current();
    settle().await;

    let snapshot = harness.manager.snapshot(guild).await.unwrap();
    assert!(snapshot.pending.is_empty());
    assert_eq!(snapshot.status, SinkStatus::Idle);
    assert!(snapshot.idle_timer_armed);
    assert_eq!(harness.opener.alive(), 0);
}
