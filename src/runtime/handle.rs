use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::{
    sync::{Mutex as AsyncMutex, broadcast, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    config::{LinkConfig, RadioConfig},
    core::{
        codec::{Decoded, decode_payload, truncate_utf8},
        command::{RemoteCommand, looks_like_command},
        log::{MessageEntry, MessageLog},
    },
    hw::{HardwareError, RawPacket, Transceiver},
    persist::{ConfigStore, PersistError, load_or_default},
    types::{Direction, LinkStatus, Outcome, SendOutcome, TransceiverMode},
};

use super::{controller::ModeController, events::LinkEvent};

/// Failures surfaced by [`LinkHandle`] operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The radio rejected or did not answer a request.
    #[error(transparent)]
    Hardware(#[from] HardwareError),
    /// The applied config could not be written to the store.
    #[error(transparent)]
    Persist(#[from] PersistError),
}

struct Shared {
    controller: ModeController,
    log: MessageLog,
    store: Arc<dyn ConfigStore>,
    events_tx: broadcast::Sender<LinkEvent>,
    status_tx: watch::Sender<LinkStatus>,
    settings: LinkConfig,
    // Held across apply and save so the stored record always matches the
    // last one applied.
    config_writer: AsyncMutex<()>,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

/// Cloneable front-end handle to a running link.
#[derive(Clone)]
pub struct LinkHandle {
    shared: Arc<Shared>,
}

/// Loads the stored config, brings the radio up and starts the receive loop.
///
/// A radio that fails to initialize does not make this fail: the handle
/// reports [`LinkStatus::Disconnected`] and keeps serving reads.
pub async fn spawn_link(
    radio: Box<dyn Transceiver>,
    store: Arc<dyn ConfigStore>,
    settings: LinkConfig,
) -> LinkHandle {
    let load_store = Arc::clone(&store);
    let config = match tokio::task::spawn_blocking(move || load_or_default(load_store.as_ref())).await {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "config load task failed, using defaults");
            RadioConfig::default()
        }
    };

    let (events_tx, _) = broadcast::channel(settings.event_capacity.max(1));
    let shared = Arc::new(Shared {
        controller: ModeController::new(radio, config.clone(), settings.hardware_timeout),
        log: MessageLog::new(settings.log_capacity),
        store,
        events_tx,
        status_tx: watch::Sender::new(LinkStatus::Initializing),
        settings,
        config_writer: AsyncMutex::new(()),
        receiver: Mutex::new(None),
    });

    match shared.controller.initialize(config).await {
        Ok(()) => {
            shared.set_status(LinkStatus::Connected);
            shared.record(Direction::System, "Radio initialized", Outcome::Success);
            let task = tokio::spawn(receive_loop(Arc::downgrade(&shared)));
            *shared.receiver.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        }
        Err(err) => {
            shared.set_status(LinkStatus::Disconnected {
                reason: err.to_string(),
            });
            shared.record(
                Direction::System,
                format!("Radio initialization failed: {err}"),
                Outcome::Failed,
            );
        }
    }

    LinkHandle { shared }
}

async fn receive_loop(shared: Weak<Shared>) {
    let period = match shared.upgrade() {
        Some(shared) => shared.settings.poll_interval,
        None => return,
    };
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.receive_tick().await;
    }
    debug!("receive loop stopped");
}

impl LinkHandle {
    /// Sends `text`, truncated to the wire width, and logs exactly one `Sent` entry.
    pub async fn send(&self, text: &str) -> SendOutcome {
        self.shared.send_text(text).await
    }

    /// Applies `config` to the radio, then persists it.
    ///
    /// A persistence failure is returned after the radio already runs the
    /// new record.
    pub async fn reconfigure(&self, config: RadioConfig) -> Result<(), LinkError> {
        self.shared.apply_and_persist(config).await
    }

    /// Polls the radio now instead of waiting for the next tick.
    /// Returns the number of packets handled.
    pub async fn receive_now(&self) -> usize {
        self.shared.receive_tick().await
    }

    /// Stops the receive loop and powers the radio down.
    pub async fn shutdown(&self) -> Result<(), LinkError> {
        let task = self
            .shared
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }

        let was_connected = self.shared.status_tx.borrow().is_connected();
        self.shared.controller.shutdown().await?;
        if was_connected {
            self.shared.set_status(LinkStatus::Disconnected {
                reason: "shut down".to_string(),
            });
            self.shared
                .record(Direction::System, "Radio shut down", Outcome::Success);
        }
        Ok(())
    }

    /// Current link status.
    pub fn status(&self) -> LinkStatus {
        self.shared.status_tx.borrow().clone()
    }

    /// Receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<LinkStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Transceiver mode after the last completed hardware operation.
    pub fn mode(&self) -> TransceiverMode {
        self.shared.controller.mode()
    }

    /// Last successfully applied radio config.
    pub fn config(&self) -> RadioConfig {
        self.shared.controller.config()
    }

    /// Whole retained message log, oldest first.
    pub fn snapshot(&self) -> Vec<MessageEntry> {
        self.shared.log.snapshot()
    }

    /// The newest `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<MessageEntry> {
        self.shared.log.recent(n)
    }

    /// Subscribes to log, status and config events.
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.shared.events_tx.subscribe()
    }
}

impl Shared {
    fn record(&self, direction: Direction, text: impl Into<String>, outcome: Outcome) -> MessageEntry {
        self.log.append_with(direction, text, outcome, |entry| {
            let _ = self.events_tx.send(LinkEvent::Logged(entry.clone()));
        })
    }

    fn set_status(&self, status: LinkStatus) {
        info!(?status, "link status");
        self.status_tx.send_replace(status.clone());
        let _ = self.events_tx.send(LinkEvent::StatusChanged(status));
    }

    async fn send_text(&self, text: &str) -> SendOutcome {
        let max = self.settings.max_payload;
        let text = truncate_utf8(text, max);
        let outcome = match self.controller.send_payload(text.as_bytes(), max).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "send failed");
                SendOutcome::Failed
            }
        };
        debug!(?outcome, len = text.len(), "payload sent");
        self.record(Direction::Sent, text, outcome.into());
        outcome
    }

    async fn apply_and_persist(&self, config: RadioConfig) -> Result<(), LinkError> {
        let _writer = self.config_writer.lock().await;
        self.apply_and_persist_locked(config).await
    }

    /// Replaces only the channel of the live record.
    async fn retune(&self, channel: u8) -> Result<(), LinkError> {
        let _writer = self.config_writer.lock().await;
        let next = self.controller.config().with_channel(channel);
        self.apply_and_persist_locked(next).await
    }

    async fn apply_and_persist_locked(&self, config: RadioConfig) -> Result<(), LinkError> {
        if let Err(err) = self.controller.reconfigure(config.clone()).await {
            self.record(
                Direction::System,
                format!("Configuration not applied: {err}"),
                Outcome::Failed,
            );
            return Err(err.into());
        }
        info!(channel = config.channel, "radio reconfigured");
        let _ = self
            .events_tx
            .send(LinkEvent::ConfigApplied(Box::new(config.clone())));

        let store = Arc::clone(&self.store);
        let saved = tokio::task::spawn_blocking(move || store.save(&config))
            .await
            .map_err(|e| PersistError::Message(format!("join error: {e}")))
            .and_then(|r| r);
        if let Err(err) = saved {
            warn!(error = %err, "radio config not saved");
            self.record(
                Direction::System,
                format!("Configuration not saved: {err}"),
                Outcome::Failed,
            );
            return Err(err.into());
        }
        Ok(())
    }

    async fn receive_tick(&self) -> usize {
        let packets = match self.controller.poll_once().await {
            Ok(packets) => packets,
            Err(err) => {
                warn!(error = %err, "receive poll failed");
                return 0;
            }
        };
        let count = packets.len();
        for packet in packets {
            self.handle_packet(packet).await;
        }
        count
    }

    async fn handle_packet(&self, packet: RawPacket) {
        let max = self.settings.max_payload;
        let text = match decode_payload(&packet.payload, max) {
            Decoded::Corrupt(shown) => {
                debug!(pipe = packet.pipe, len = packet.len(), "undecodable payload");
                self.record(Direction::Received, shown, Outcome::CorruptPayload);
                return;
            }
            Decoded::Text(text) => text,
        };
        debug!(pipe = packet.pipe, len = packet.len(), "payload received");
        self.record(Direction::Received, text.as_str(), Outcome::Success);

        if self.controller.config().remote_control {
            if let Some(command) = RemoteCommand::parse(&text) {
                self.dispatch(command).await;
            }
        } else if looks_like_command(&text) {
            self.record(
                Direction::System,
                format!("Remote control disabled, ignored: {}", text.trim()),
                Outcome::Ignored,
            );
        }
    }

    async fn dispatch(&self, command: RemoteCommand) {
        info!(?command, "remote command");
        match command {
            RemoteCommand::Test(payload) => {
                self.send_text(&payload).await;
            }
            RemoteCommand::SetChannel(channel) => {
                match self.retune(channel).await {
                    // Radio already retuned; the peer still needs the confirmation.
                    Ok(()) | Err(LinkError::Persist(_)) => {
                        self.send_text(&format!("Channel set to {channel}")).await;
                    }
                    Err(LinkError::Hardware(_)) => {}
                }
            }
        }
    }
}
