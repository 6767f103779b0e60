use std::{sync::Arc, time::Duration};

use rflink::{
    config::{LinkConfig, RadioConfig},
    core::log::MessageEntry,
    hw::mock::{MockHandle, MockTransceiver},
    persist::{ConfigStore, PersistError, PersistResult, json::JsonFileStore},
    runtime::{
        events::LinkEvent,
        handle::{LinkError, LinkHandle, spawn_link},
    },
    types::{Direction, LinkStatus, Outcome, SendOutcome, TransceiverMode},
};
use tempfile::TempDir;

/// Settings that keep the background loop out of the way so tests drive
/// receiving with `receive_now`.
fn manual_settings() -> LinkConfig {
    LinkConfig {
        poll_interval: Duration::from_secs(3600),
        hardware_timeout: Duration::from_millis(200),
        ..LinkConfig::default()
    }
}

struct Fixture {
    link: LinkHandle,
    mock: MockHandle,
    store: Arc<JsonFileStore>,
    _dir: TempDir,
}

async fn start(config: RadioConfig) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(JsonFileStore::new(dir.path().join("radio.json")));
    store.save(&config).expect("seed config");
    let (radio, mock) = MockTransceiver::new();
    let link = spawn_link(Box::new(radio), store.clone(), manual_settings()).await;
    Fixture {
        link,
        mock,
        store,
        _dir: dir,
    }
}

fn remote_enabled() -> RadioConfig {
    RadioConfig {
        remote_control: true,
        ..RadioConfig::default()
    }
}

fn summary(entries: &[MessageEntry]) -> Vec<(Direction, String, Outcome)> {
    entries
        .iter()
        .map(|e| (e.direction, e.text.clone(), e.outcome))
        .collect()
}

struct ReadOnlyStore;

impl ConfigStore for ReadOnlyStore {
    fn load(&self) -> PersistResult<RadioConfig> {
        Ok(remote_enabled())
    }

    fn save(&self, _config: &RadioConfig) -> PersistResult<()> {
        Err(PersistError::Message("read-only medium".to_string()))
    }
}

#[tokio::test]
async fn startup_uses_stored_config_and_listens() {
    let fx = start(RadioConfig::default().with_channel(12)).await;

    assert_eq!(fx.link.status(), LinkStatus::Connected);
    assert_eq!(fx.link.mode(), TransceiverMode::Listening);
    assert_eq!(fx.link.config().channel, 12);
    assert_eq!(fx.mock.registers().channel, Some(12));
    assert_eq!(
        summary(&fx.link.snapshot()),
        vec![(Direction::System, "Radio initialized".to_string(), Outcome::Success)]
    );
}

#[tokio::test]
async fn set_channel_command_retunes_persists_and_confirms() {
    let fx = start(remote_enabled()).await;
    fx.mock.queue_rx(1, b"/c 40");

    assert_eq!(fx.link.receive_now().await, 1);

    assert_eq!(fx.mock.registers().channel, Some(40));
    assert_eq!(fx.link.config().channel, 40);
    let stored = fx.store.load().expect("load");
    assert_eq!(stored.channel, 40);
    assert!(stored.remote_control, "only the channel may change");
    assert_eq!(fx.mock.tx_history(), vec![b"Channel set to 40".to_vec()]);

    let log = summary(&fx.link.recent(2));
    assert_eq!(
        log,
        vec![
            (Direction::Received, "/c 40".to_string(), Outcome::Success),
            (Direction::Sent, "Channel set to 40".to_string(), Outcome::Success),
        ]
    );
    assert_eq!(fx.link.mode(), TransceiverMode::Listening);
}

#[tokio::test]
async fn out_of_range_channel_is_logged_but_not_acted_on() {
    let fx = start(remote_enabled()).await;
    fx.mock.queue_rx(1, b"/c 126");

    fx.link.receive_now().await;

    assert_eq!(fx.link.config().channel, 76);
    assert_eq!(fx.store.load().expect("load").channel, 76);
    assert!(fx.mock.tx_history().is_empty());
    assert_eq!(
        summary(&fx.link.recent(1)),
        vec![(Direction::Received, "/c 126".to_string(), Outcome::Success)]
    );
}

#[tokio::test]
async fn test_command_echoes_payload_when_enabled() {
    let fx = start(remote_enabled()).await;
    fx.mock.queue_rx(0, b"/test hi");

    fx.link.receive_now().await;

    assert_eq!(fx.mock.tx_history(), vec![b"hi".to_vec()]);
    assert_eq!(
        summary(&fx.link.recent(2)),
        vec![
            (Direction::Received, "/test hi".to_string(), Outcome::Success),
            (Direction::Sent, "hi".to_string(), Outcome::Success),
        ]
    );
}

#[tokio::test]
async fn commands_are_ignored_when_remote_control_is_off() {
    let fx = start(RadioConfig::default()).await;
    fx.mock.queue_rx(0, b"/test hi");
    fx.mock.queue_rx(0, b"/c 40");

    assert_eq!(fx.link.receive_now().await, 2);

    assert!(fx.mock.tx_history().is_empty());
    assert_eq!(fx.link.config().channel, 76);
    assert_eq!(
        summary(&fx.link.recent(4)),
        vec![
            (Direction::Received, "/test hi".to_string(), Outcome::Success),
            (
                Direction::System,
                "Remote control disabled, ignored: /test hi".to_string(),
                Outcome::Ignored
            ),
            (Direction::Received, "/c 40".to_string(), Outcome::Success),
            (
                Direction::System,
                "Remote control disabled, ignored: /c 40".to_string(),
                Outcome::Ignored
            ),
        ]
    );
}

#[tokio::test]
async fn plain_text_is_logged_without_side_effects() {
    let fx = start(remote_enabled()).await;
    fx.mock.queue_rx(2, b"hello there\0\0\0");

    fx.link.receive_now().await;

    assert!(fx.mock.tx_history().is_empty());
    assert_eq!(
        summary(&fx.link.recent(1)),
        vec![(Direction::Received, "hello there".to_string(), Outcome::Success)]
    );
}

#[tokio::test]
async fn undecodable_payload_is_logged_as_corrupt() {
    let fx = start(remote_enabled()).await;
    fx.mock.queue_rx(1, &[0x2f, 0x63, 0xff, 0xfe, 0x20, 0x34]);

    fx.link.receive_now().await;

    let last = fx.link.recent(1).pop().expect("entry");
    assert_eq!(last.direction, Direction::Received);
    assert_eq!(last.outcome, Outcome::CorruptPayload);
    assert!(last.text.starts_with("/c"), "{}", last.text);
    assert!(fx.mock.tx_history().is_empty());
    assert_eq!(fx.link.config().channel, 76);
}

#[tokio::test]
async fn send_truncates_to_wire_width_and_logs_once() {
    let fx = start(RadioConfig::default()).await;
    let text = "x".repeat(40);

    assert_eq!(fx.link.send(&text).await, SendOutcome::Success);

    assert_eq!(fx.mock.tx_history(), vec![vec![b'x'; 32]]);
    let sent: Vec<_> = fx
        .link
        .snapshot()
        .into_iter()
        .filter(|e| e.direction == Direction::Sent)
        .collect();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "x".repeat(32));
}

#[tokio::test]
async fn unacknowledged_send_is_logged_as_failed() {
    let fx = start(RadioConfig::default()).await;
    fx.mock.set_ack_writes(false);

    assert_eq!(fx.link.send("anyone?").await, SendOutcome::Failed);
    assert_eq!(
        summary(&fx.link.recent(1)),
        vec![(Direction::Sent, "anyone?".to_string(), Outcome::Failed)]
    );
    assert_eq!(fx.link.mode(), TransceiverMode::Listening);
}

#[tokio::test]
async fn unresponsive_radio_reports_disconnected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(JsonFileStore::new(dir.path().join("radio.json")));
    let (radio, mock) = MockTransceiver::unresponsive();
    let link = spawn_link(Box::new(radio), store, manual_settings()).await;

    assert!(matches!(link.status(), LinkStatus::Disconnected { .. }));
    assert_eq!(link.mode(), TransceiverMode::Disconnected);
    let first = link.snapshot().into_iter().next().expect("entry");
    assert_eq!(first.direction, Direction::System);
    assert_eq!(first.outcome, Outcome::Failed);

    // Callers are expected to check the status before sending.
    if link.status().is_connected() {
        link.send("never").await;
    }
    assert!(mock.tx_history().is_empty());

    // A send that slips through anyway never reaches the hardware.
    let calls = mock.hardware_calls();
    assert_eq!(link.send("hello").await, SendOutcome::Failed);
    assert_eq!(link.receive_now().await, 0);
    assert_eq!(mock.hardware_calls(), calls);
    assert_eq!(
        summary(&link.recent(1)),
        vec![(Direction::Sent, "hello".to_string(), Outcome::Failed)]
    );
}

#[tokio::test]
async fn persist_failure_still_confirms_retune() {
    let (radio, mock) = MockTransceiver::new();
    let link = spawn_link(Box::new(radio), Arc::new(ReadOnlyStore), manual_settings()).await;
    mock.queue_rx(1, b"/c 5");

    link.receive_now().await;

    assert_eq!(mock.registers().channel, Some(5));
    assert_eq!(link.config().channel, 5);
    assert_eq!(mock.tx_history(), vec![b"Channel set to 5".to_vec()]);
    let log = summary(&link.recent(2));
    assert_eq!(log[0].0, Direction::System);
    assert_eq!(log[0].2, Outcome::Failed);
    assert_eq!(
        log[1],
        (Direction::Sent, "Channel set to 5".to_string(), Outcome::Success)
    );
}

#[tokio::test]
async fn hardware_failure_on_retune_sends_no_confirmation() {
    let fx = start(remote_enabled()).await;
    fx.mock.fail_channel(Some(99));
    fx.mock.queue_rx(1, b"/c 99");

    fx.link.receive_now().await;

    assert!(fx.mock.tx_history().is_empty());
    assert_eq!(fx.link.config().channel, 76);
    assert_eq!(fx.mock.registers().channel, Some(76));
    assert_eq!(fx.store.load().expect("load").channel, 76);
    let last = fx.link.recent(1).pop().expect("entry");
    assert_eq!((last.direction, last.outcome), (Direction::System, Outcome::Failed));
    assert_eq!(fx.link.mode(), TransceiverMode::Listening);
}

#[tokio::test]
async fn reconfigure_persists_and_reports_errors() {
    let fx = start(RadioConfig::default()).await;

    let mut next = remote_enabled();
    next.channel = 60;
    fx.link.reconfigure(next.clone()).await.expect("reconfigure");
    assert_eq!(fx.store.load().expect("load"), next);
    assert_eq!(fx.link.config(), next);

    let err = fx
        .link
        .reconfigure(RadioConfig::default().with_channel(130))
        .await
        .expect_err("must fail");
    assert!(matches!(err, LinkError::Hardware(_)));
    assert_eq!(fx.store.load().expect("load"), next);
}

#[tokio::test]
async fn events_arrive_in_log_order() {
    let fx = start(remote_enabled()).await;
    let mut events = fx.link.subscribe();
    fx.mock.queue_rx(1, b"/c 22");

    fx.link.receive_now().await;

    let mut logged = Vec::new();
    let mut applied = None;
    while let Ok(event) = events.try_recv() {
        match event {
            LinkEvent::Logged(entry) => logged.push(entry),
            LinkEvent::ConfigApplied(config) => applied = Some(config.channel),
            LinkEvent::StatusChanged(_) => {}
        }
    }
    assert_eq!(applied, Some(22));
    assert_eq!(logged, fx.link.recent(logged.len()));
    assert!(logged.windows(2).all(|w| w[0].seq < w[1].seq));
}

#[tokio::test]
async fn background_loop_picks_up_packets() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(JsonFileStore::new(dir.path().join("radio.json")));
    let (radio, mock) = MockTransceiver::new();
    let settings = LinkConfig {
        poll_interval: Duration::from_millis(20),
        ..LinkConfig::default()
    };
    let link = spawn_link(Box::new(radio), store, settings).await;
    let mut events = link.subscribe();
    mock.queue_rx(1, b"ping");

    let entry = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(LinkEvent::Logged(entry)) if entry.direction == Direction::Received => {
                    return entry;
                }
                Ok(_) => {}
                Err(err) => panic!("event stream closed: {err}"),
            }
        }
    })
    .await
    .expect("packet within deadline");
    assert_eq!(entry.text, "ping");

    link.shutdown().await.expect("shutdown");
    assert!(!mock.is_powered());
    assert!(matches!(link.status(), LinkStatus::Disconnected { .. }));
}

#[tokio::test]
async fn log_keeps_only_newest_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(JsonFileStore::new(dir.path().join("radio.json")));
    let (radio, _mock) = MockTransceiver::new();
    let settings = LinkConfig {
        log_capacity: 3,
        ..manual_settings()
    };
    let link = spawn_link(Box::new(radio), store, settings).await;

    for text in ["a", "b", "c", "d"] {
        link.send(text).await;
    }

    let texts: Vec<_> = link.snapshot().into_iter().map(|e| e.text).collect();
    assert_eq!(texts, vec!["b", "c", "d"]);
}
