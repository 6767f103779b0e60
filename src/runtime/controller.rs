//! Exclusive owner of the transceiver and its mode state machine.
//!
//! Every hardware-touching operation takes the same async mutex for its whole
//! duration, so a poll, a write and a reconfigure can never interleave. Each
//! individual driver call is bounded by a deadline.

use std::{future::Future, time::Duration};

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::{
    config::RadioConfig,
    hw::{HardwareError, HwResult, RawPacket, Transceiver},
    types::{PipeId, SendOutcome, TransceiverMode},
};

/// Upper bound on packets pulled in one [`ModeController::poll_once`].
pub const MAX_DRAIN_PER_POLL: usize = 32;

struct HwState {
    radio: Box<dyn Transceiver>,
    mode: TransceiverMode,
    deadline: Duration,
}

async fn bounded<T, F>(deadline: Duration, fut: F) -> HwResult<T>
where
    F: Future<Output = HwResult<T>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| HardwareError::Timeout)?
}

impl HwState {
    fn transition(&mut self, to: TransceiverMode) -> HwResult<()> {
        if !self.mode.can_transition_to(to) {
            return Err(HardwareError::InvalidTransition {
                from: self.mode,
                to,
            });
        }
        debug!(from = %self.mode, to = %to, "mode transition");
        self.mode = to;
        Ok(())
    }

    fn is_idle(&self) -> bool {
        matches!(
            self.mode,
            TransceiverMode::Listening | TransceiverMode::Standby
        )
    }

    async fn apply(&mut self, config: &RadioConfig) -> HwResult<()> {
        let t = self.deadline;
        let radio = &mut self.radio;
        bounded(t, radio.set_power_level(config.power_level)).await?;
        bounded(t, radio.set_data_rate(config.data_rate)).await?;
        bounded(t, radio.set_channel(config.channel)).await?;
        bounded(t, radio.set_crc_mode(config.crc_mode)).await?;
        bounded(t, radio.set_retries(config.retry_delay, config.retry_count)).await?;
        bounded(t, radio.set_dynamic_payloads(config.dynamic_payloads)).await?;
        bounded(t, radio.set_auto_ack(config.auto_ack)).await?;
        bounded(t, radio.set_ack_payloads(config.ack_payloads)).await?;
        bounded(t, radio.open_writing_pipe(&config.writing_address)).await?;
        for (pipe, address) in config.reading_addresses.iter().enumerate() {
            bounded(t, radio.open_reading_pipe(pipe as PipeId, address)).await?;
        }
        Ok(())
    }

    async fn listen(&mut self) -> HwResult<()> {
        bounded(self.deadline, self.radio.start_listening()).await?;
        self.transition(TransceiverMode::Listening)
    }

    async fn leave_listening(&mut self) -> HwResult<()> {
        if self.mode == TransceiverMode::Listening {
            bounded(self.deadline, self.radio.stop_listening()).await?;
            self.transition(TransceiverMode::Standby)?;
        }
        Ok(())
    }

    async fn bring_up(&mut self, config: &RadioConfig) -> HwResult<()> {
        bounded(self.deadline, self.radio.power_up()).await?;
        self.transition(TransceiverMode::Standby)?;
        self.apply(config).await?;
        self.listen().await
    }
}

/// Serializes all access to the single transceiver.
pub struct ModeController {
    hw: Mutex<HwState>,
    mode_tx: watch::Sender<TransceiverMode>,
    config_tx: watch::Sender<RadioConfig>,
}

impl ModeController {
    /// Takes ownership of `radio`. `config` is the record reported by
    /// [`ModeController::config`] until one is applied.
    pub fn new(radio: Box<dyn Transceiver>, config: RadioConfig, hardware_timeout: Duration) -> Self {
        Self {
            hw: Mutex::new(HwState {
                radio,
                mode: TransceiverMode::Uninitialized,
                deadline: hardware_timeout,
            }),
            mode_tx: watch::Sender::new(TransceiverMode::Uninitialized),
            config_tx: watch::Sender::new(config),
        }
    }

    /// Powers the radio up, applies `config` in full and starts listening.
    ///
    /// Any failure leaves the controller permanently
    /// [`TransceiverMode::Disconnected`].
    pub async fn initialize(&self, config: RadioConfig) -> HwResult<()> {
        config.validate()?;
        let mut hw = self.hw.lock().await;
        if hw.mode != TransceiverMode::Uninitialized {
            return Err(HardwareError::InvalidTransition {
                from: hw.mode,
                to: TransceiverMode::Listening,
            });
        }

        match hw.bring_up(&config).await {
            Ok(()) => {
                self.mode_tx.send_replace(hw.mode);
                self.config_tx.send_replace(config);
                info!("radio initialized and listening");
                Ok(())
            }
            Err(err) => {
                if hw.mode == TransceiverMode::Standby {
                    let deadline = hw.deadline;
                    if let Err(down) = bounded(deadline, hw.radio.power_down()).await {
                        warn!(error = %down, "power down after failed initialization failed");
                    }
                }
                hw.mode = TransceiverMode::Disconnected;
                self.mode_tx.send_replace(hw.mode);
                warn!(error = %err, "radio initialization failed");
                Err(err)
            }
        }
    }

    /// Applies a new record, then publishes it.
    ///
    /// On failure the previous record is re-applied and stays published.
    pub async fn reconfigure(&self, config: RadioConfig) -> HwResult<()> {
        config.validate()?;
        let mut hw = self.hw.lock().await;
        if !hw.is_idle() {
            return Err(HardwareError::NotInitialized);
        }

        if let Err(err) = hw.leave_listening().await {
            // Registers untouched; the chip keeps its current record.
            warn!(error = %err, "could not leave listening for reconfigure");
            self.mode_tx.send_replace(hw.mode);
            return Err(err);
        }

        let previous = self.config_tx.borrow().clone();
        let result = async {
            hw.apply(&config).await?;
            hw.listen().await
        }
        .await;

        match result {
            Ok(()) => {
                self.mode_tx.send_replace(hw.mode);
                self.config_tx.send_replace(config);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "reconfigure failed, restoring previous config");
                if let Err(restore) = hw.apply(&previous).await {
                    warn!(error = %restore, "restoring previous config failed");
                }
                if hw.mode == TransceiverMode::Standby {
                    if let Err(listen) = hw.listen().await {
                        warn!(error = %listen, "could not resume listening");
                    }
                }
                self.mode_tx.send_replace(hw.mode);
                Err(err)
            }
        }
    }

    /// Transmits `bytes` cut to `max_width`, then returns to listening.
    pub async fn send_payload(&self, bytes: &[u8], max_width: usize) -> HwResult<SendOutcome> {
        let payload = &bytes[..bytes.len().min(max_width)];
        let mut hw = self.hw.lock().await;
        if !hw.is_idle() {
            return Err(HardwareError::NotInitialized);
        }

        let deadline = hw.deadline;
        if hw.mode == TransceiverMode::Listening {
            bounded(deadline, hw.radio.stop_listening()).await?;
        }
        hw.transition(TransceiverMode::Writing)?;

        let written = bounded(deadline, hw.radio.write(payload)).await;

        if let Err(err) = hw.listen().await {
            // Chip state is unknown; the next poll retries listening.
            warn!(error = %err, "could not resume listening after write");
            hw.mode = TransceiverMode::Standby;
        }
        self.mode_tx.send_replace(hw.mode);
        written.map(|acked| {
            if acked {
                SendOutcome::Success
            } else {
                SendOutcome::Failed
            }
        })
    }

    /// Drains every queued packet, up to [`MAX_DRAIN_PER_POLL`] per call.
    /// Packets left over stay queued and are picked up on the next tick.
    pub async fn poll_once(&self) -> HwResult<Vec<RawPacket>> {
        let mut hw = self.hw.lock().await;
        match hw.mode {
            TransceiverMode::Listening => {}
            TransceiverMode::Standby => {
                hw.listen().await?;
                self.mode_tx.send_replace(hw.mode);
            }
            _ => return Err(HardwareError::NotInitialized),
        }

        let deadline = hw.deadline;
        let mut packets = Vec::new();
        while packets.len() < MAX_DRAIN_PER_POLL {
            let step = async {
                let Some(pipe) = bounded(deadline, hw.radio.available()).await? else {
                    return Ok(None);
                };
                let payload = bounded(deadline, hw.radio.read()).await?;
                Ok::<_, HardwareError>(Some(RawPacket { pipe, payload }))
            }
            .await;

            match step {
                Ok(Some(packet)) => packets.push(packet),
                Ok(None) => break,
                Err(err) if packets.is_empty() => return Err(err),
                Err(err) => {
                    warn!(error = %err, kept = packets.len(), "receive drain interrupted");
                    break;
                }
            }
        }
        Ok(packets)
    }

    /// Stops listening and powers the radio down for good.
    pub async fn shutdown(&self) -> HwResult<()> {
        let mut hw = self.hw.lock().await;
        let result = match hw.mode {
            TransceiverMode::Uninitialized | TransceiverMode::Disconnected => Ok(()),
            _ => {
                let deadline = hw.deadline;
                if hw.mode == TransceiverMode::Listening {
                    if let Err(err) = bounded(deadline, hw.radio.stop_listening()).await {
                        warn!(error = %err, "stop listening failed during shutdown");
                    }
                }
                bounded(deadline, hw.radio.power_down()).await
            }
        };
        hw.mode = TransceiverMode::Disconnected;
        self.mode_tx.send_replace(hw.mode);
        result
    }

    /// Mode after the last completed operation.
    pub fn mode(&self) -> TransceiverMode {
        *self.mode_tx.borrow()
    }

    /// Last successfully applied record.
    pub fn config(&self) -> RadioConfig {
        self.config_tx.borrow().clone()
    }

    /// Notified whenever a new record has been applied.
    pub fn subscribe_config(&self) -> watch::Receiver<RadioConfig> {
        self.config_tx.subscribe()
    }
}
