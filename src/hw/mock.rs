//! In-memory transceiver for tests and hardware-free development.
//!
//! [`MockTransceiver`] is moved into the link manager like a real driver.
//! Every clone of its [`MockHandle`] sees the same state, so a test can queue
//! inbound packets, force failures and inspect what the controller wrote
//! after the radio itself has been handed over.
//!
//! ```
//! use rflink::hw::mock::MockTransceiver;
//!
//! let (radio, handle) = MockTransceiver::new();
//! handle.queue_rx(1, b"hello");
//! assert_eq!(handle.pending_rx(), 1);
//! # drop(radio);
//! ```

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    config::Address,
    types::{CrcMode, DataRate, MAX_PAYLOAD_WIDTH, PipeId, PowerLevel, READING_PIPES},
};

use super::{HardwareError, HwResult, Transceiver};

/// Last value written to each setting, `None` until first written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockRegisters {
    /// Power amplifier level.
    pub power_level: Option<PowerLevel>,
    /// Air data rate.
    pub data_rate: Option<DataRate>,
    /// RF channel.
    pub channel: Option<u8>,
    /// CRC length.
    pub crc_mode: Option<CrcMode>,
    /// Retry delay and count.
    pub retries: Option<(u8, u8)>,
    /// Dynamic payloads flag.
    pub dynamic_payloads: Option<bool>,
    /// Auto-ack flag.
    pub auto_ack: Option<bool>,
    /// ACK payloads flag.
    pub ack_payloads: Option<bool>,
    /// Transmit address.
    pub writing_address: Option<Address>,
    /// Receive addresses per pipe.
    pub reading_addresses: [Option<Address>; READING_PIPES],
}

#[derive(Debug)]
struct MockState {
    responding: bool,
    powered: bool,
    listening: bool,
    ack_writes: bool,
    call_delay: Option<Duration>,
    fail_channel: Option<u8>,
    registers: MockRegisters,
    rx_queue: VecDeque<(PipeId, Vec<u8>)>,
    tx_history: Vec<Vec<u8>>,
    hardware_calls: usize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            responding: true,
            powered: false,
            listening: false,
            ack_writes: true,
            call_delay: None,
            fail_channel: None,
            registers: MockRegisters::default(),
            rx_queue: VecDeque::new(),
            tx_history: Vec::new(),
            hardware_calls: 0,
        }
    }
}

/// Mock radio handed to the link manager.
#[derive(Debug)]
pub struct MockTransceiver {
    state: Arc<Mutex<MockState>>,
}

/// Shared control and inspection handle for a [`MockTransceiver`].
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransceiver {
    /// Creates a responsive radio that acknowledges every write.
    pub fn new() -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockHandle { state },
        )
    }

    /// Creates a radio that never acknowledges power-up.
    pub fn unresponsive() -> (Self, MockHandle) {
        let (radio, handle) = Self::new();
        handle.set_responding(false);
        (radio, handle)
    }

    async fn enter(&self) -> HwResult<()> {
        let delay = {
            let mut st = lock(&self.state);
            st.hardware_calls += 1;
            st.call_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn powered(&self) -> HwResult<MutexGuard<'_, MockState>> {
        self.enter().await?;
        let st = lock(&self.state);
        if !st.powered {
            return Err(HardwareError::Device("radio is powered down".to_string()));
        }
        Ok(st)
    }
}

impl MockHandle {
    /// Queues an inbound packet on `pipe`, cut to the maximum payload width.
    pub fn queue_rx(&self, pipe: PipeId, payload: &[u8]) {
        let n = payload.len().min(MAX_PAYLOAD_WIDTH);
        lock(&self.state)
            .rx_queue
            .push_back((pipe, payload[..n].to_vec()));
    }

    /// Packets queued and not yet read.
    pub fn pending_rx(&self) -> usize {
        lock(&self.state).rx_queue.len()
    }

    /// Whether power-up will be acknowledged.
    pub fn set_responding(&self, responding: bool) {
        lock(&self.state).responding = responding;
    }

    /// Whether writes are acknowledged by the far end.
    pub fn set_ack_writes(&self, ack: bool) {
        lock(&self.state).ack_writes = ack;
    }

    /// Delays every hardware call, to exercise deadlines.
    pub fn set_call_delay(&self, delay: Option<Duration>) {
        lock(&self.state).call_delay = delay;
    }

    /// Makes tuning to `channel` fail with a device error.
    pub fn fail_channel(&self, channel: Option<u8>) {
        lock(&self.state).fail_channel = channel;
    }

    /// Every payload passed to `write`, in order.
    pub fn tx_history(&self) -> Vec<Vec<u8>> {
        lock(&self.state).tx_history.clone()
    }

    /// Last written value of each setting.
    pub fn registers(&self) -> MockRegisters {
        lock(&self.state).registers.clone()
    }

    /// Whether the radio is in receive mode.
    pub fn is_listening(&self) -> bool {
        lock(&self.state).listening
    }

    /// Whether the radio is powered.
    pub fn is_powered(&self) -> bool {
        lock(&self.state).powered
    }

    /// Total number of trait calls made against the radio.
    pub fn hardware_calls(&self) -> usize {
        lock(&self.state).hardware_calls
    }
}

#[async_trait]
impl Transceiver for MockTransceiver {
    async fn power_up(&mut self) -> HwResult<()> {
        self.enter().await?;
        let mut st = lock(&self.state);
        if !st.responding {
            return Err(HardwareError::NotResponding);
        }
        st.powered = true;
        Ok(())
    }

    async fn power_down(&mut self) -> HwResult<()> {
        self.enter().await?;
        let mut st = lock(&self.state);
        st.powered = false;
        st.listening = false;
        Ok(())
    }

    async fn set_power_level(&mut self, level: PowerLevel) -> HwResult<()> {
        self.powered().await?.registers.power_level = Some(level);
        Ok(())
    }

    async fn set_data_rate(&mut self, rate: DataRate) -> HwResult<()> {
        self.powered().await?.registers.data_rate = Some(rate);
        Ok(())
    }

    async fn set_channel(&mut self, channel: u8) -> HwResult<()> {
        let mut st = self.powered().await?;
        if st.fail_channel == Some(channel) {
            return Err(HardwareError::Device(format!("channel {channel} rejected")));
        }
        st.registers.channel = Some(channel);
        Ok(())
    }

    async fn set_crc_mode(&mut self, mode: CrcMode) -> HwResult<()> {
        self.powered().await?.registers.crc_mode = Some(mode);
        Ok(())
    }

    async fn set_retries(&mut self, delay: u8, count: u8) -> HwResult<()> {
        self.powered().await?.registers.retries = Some((delay, count));
        Ok(())
    }

    async fn set_dynamic_payloads(&mut self, enabled: bool) -> HwResult<()> {
        self.powered().await?.registers.dynamic_payloads = Some(enabled);
        Ok(())
    }

    async fn set_auto_ack(&mut self, enabled: bool) -> HwResult<()> {
        self.powered().await?.registers.auto_ack = Some(enabled);
        Ok(())
    }

    async fn set_ack_payloads(&mut self, enabled: bool) -> HwResult<()> {
        self.powered().await?.registers.ack_payloads = Some(enabled);
        Ok(())
    }

    async fn open_writing_pipe(&mut self, address: &Address) -> HwResult<()> {
        self.powered().await?.registers.writing_address = Some(*address);
        Ok(())
    }

    async fn open_reading_pipe(&mut self, pipe: PipeId, address: &Address) -> HwResult<()> {
        let mut st = self.powered().await?;
        let slot = st
            .registers
            .reading_addresses
            .get_mut(usize::from(pipe))
            .ok_or_else(|| HardwareError::Device(format!("no reading pipe {pipe}")))?;
        *slot = Some(*address);
        Ok(())
    }

    async fn start_listening(&mut self) -> HwResult<()> {
        self.powered().await?.listening = true;
        Ok(())
    }

    async fn stop_listening(&mut self) -> HwResult<()> {
        self.powered().await?.listening = false;
        Ok(())
    }

    async fn write(&mut self, payload: &[u8]) -> HwResult<bool> {
        let mut st = self.powered().await?;
        if st.listening {
            return Err(HardwareError::Device("write while listening".to_string()));
        }
        st.tx_history.push(payload.to_vec());
        Ok(st.ack_writes)
    }

    async fn available(&mut self) -> HwResult<Option<PipeId>> {
        let st = self.powered().await?;
        if !st.listening {
            return Ok(None);
        }
        Ok(st.rx_queue.front().map(|(pipe, _)| *pipe))
    }

    async fn read(&mut self) -> HwResult<Vec<u8>> {
        let mut st = self.powered().await?;
        st.rx_queue
            .pop_front()
            .map(|(_, payload)| payload)
            .ok_or_else(|| HardwareError::Device("receive FIFO empty".to_string()))
    }
}
