use async_trait::async_trait;
use parley_client::TransportError;
use parley_client::transport::ControlChannel;
use parley_core::ControlMessage;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Control channel that records every frame. A slow channel keeps frames
/// in its buffer until [`MockChannel::drain`] is called.
pub struct MockChannel {
    label: String,
    open: AtomicBool,
    slow: bool,
    sent: Mutex<Vec<String>>,
    buffered: AtomicUsize,
    peak: AtomicUsize,
    low_water: AtomicUsize,
}

impl MockChannel {
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self::build(label, false))
    }

    pub fn slow(label: &str) -> Arc<Self> {
        Arc::new(Self::build(label, true))
    }

    fn build(label: &str, slow: bool) -> Self {
        Self {
            label: label.to_owned(),
            open: AtomicBool::new(true),
            slow,
            sent: Mutex::new(Vec::new()),
            buffered: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            low_water: AtomicUsize::new(0),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn frames(&self) -> Vec<ControlMessage> {
        self.sent()
            .iter()
            .map(|text| ControlMessage::decode(text).unwrap())
            .collect()
    }

    /// Frames not yet looked at, starting from `from`.
    pub fn frames_from(&self, from: usize) -> Vec<ControlMessage> {
        self.frames().into_iter().skip(from).collect()
    }

    pub fn buffered(&self) -> usize {
        self.buffered.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn low_water(&self) -> usize {
        self.low_water.load(Ordering::SeqCst)
    }

    pub fn drain_all(&self) {
        self.buffered.store(0, Ordering::SeqCst);
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }
}

#[async_trait]
impl ControlChannel for MockChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send_text(&self, text: String) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::ChannelClosed);
        }
        if self.slow {
            let now = self.buffered.fetch_add(text.len(), Ordering::SeqCst) + text.len();
            self.peak.fetch_max(now, Ordering::SeqCst);
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn buffered_amount(&self) -> usize {
        self.buffered()
    }

    async fn set_low_water_mark(&self, bytes: usize) {
        self.low_water.store(bytes, Ordering::SeqCst);
    }

    async fn close(&self) {
        self.set_open(false);
    }
}
