//! Shared helpers for patchvault-engine integration tests

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use flume::{Receiver, Sender};
use parking_lot::Mutex;
use patchvault_core::codec::dsi_packing;
use patchvault_core::config::PatchVaultConfig;
use patchvault_core::errors::ExError;
use patchvault_core::store::MemoryStore;
use patchvault_core::transport::{HandlerId, InboundHandler, Transport};
use patchvault_core::{Fingerprint, MidiMessage, PatchFilter, PatchHolder, PatchStore};
use patchvault_engine::{Engine, VariantRegistry};

#[allow(dead_code)]
pub const A6: &str = "Alesis Andromeda A6";
#[allow(dead_code)]
pub const OB6: &str = "OB-6";
#[allow(dead_code)]
pub const OB6_PORT: &str = "OB-6 USB";

#[allow(dead_code)]
pub const A6_BRAIN_ACTIVITY: &[u8] =
    include_bytes!("../../../patchvault-core/tests/fixtures/a6_brain_activity.syx");
#[allow(dead_code)]
pub const A6_THE_DREAM: &[u8] =
    include_bytes!("../../../patchvault-core/tests/fixtures/a6_the_dream.syx");

/// Write `bytes` to `name` inside `dir`
#[allow(dead_code)]
pub fn write_syx(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Engine over `store` whose OB-6 sends to [`OB6_PORT`]
#[allow(dead_code)]
pub fn engine_with(store: Arc<dyn PatchStore>) -> Engine {
    let config = PatchVaultConfig::from_toml(
        "[[synths]]\nname = \"OB-6\"\nchannel = 1\noutput = \"OB-6 USB\"\n",
    )
    .unwrap();
    Engine::new(store, VariantRegistry::from_config(&config), 65_536)
}

/// Raw 1024 byte OB-6 program filled with `seed`, named `name`
#[allow(dead_code)]
pub fn ob6_program(seed: u8, name: &str) -> Vec<u8> {
    let mut data = vec![seed & 0x7F; 1024];
    let mut padded = [b' '; 20];
    for (slot, byte) in padded.iter_mut().zip(name.bytes()) {
        *slot = byte;
    }
    data[107..127].copy_from_slice(&padded);
    data
}

/// OB-6 program dump for bank 0 program `program`
#[allow(dead_code)]
pub fn ob6_dump(program: u8, data: &[u8]) -> MidiMessage {
    let mut body = vec![0x01, 0x2E, 0x02, 0x00, program];
    body.extend(dsi_packing::pack(data));
    MidiMessage::sysex(&body)
}

/// OB-6 global parameter dump reporting `channel` (one-based)
#[allow(dead_code)]
pub fn ob6_global_dump(channel: u8) -> MidiMessage {
    let mut globals = vec![0u8; 32];
    globals[2] = channel;
    let mut body = vec![0x01, 0x2E, 0x0F];
    body.extend(dsi_packing::pack(&globals));
    MidiMessage::sysex(&body)
}

type Responder = Box<dyn Fn(&MidiMessage) -> Vec<MidiMessage> + Send + Sync>;

/// Transport that answers outbound messages through a responder
///
/// Answers are delivered synchronously to every registered inbound handler.
pub struct LoopbackTransport {
    responder: Responder,
    sent: Mutex<Vec<(String, MidiMessage)>>,
    handlers: Mutex<Vec<(HandlerId, String, InboundHandler)>>,
    next_id: AtomicU64,
}

#[allow(dead_code)]
impl LoopbackTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&MidiMessage) -> Vec<MidiMessage> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            sent: Mutex::new(Vec::new()),
            handlers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Behaves like an OB-6 holding `programs` in bank 0, silent for `silent`
    pub fn ob6(programs: Vec<Vec<u8>>, silent: Option<u8>, channel: u8) -> Self {
        Self::new(move |request| {
            let bytes = request.as_bytes();
            match bytes {
                [0xF0, 0x01, 0x2E, 0x05, 0x00, program, 0xF7] => {
                    if Some(*program) == silent {
                        return Vec::new();
                    }
                    programs
                        .get(usize::from(*program))
                        .map(|data| vec![ob6_dump(*program, data)])
                        .unwrap_or_default()
                }
                [0xF0, 0x01, 0x2E, 0x0E, 0xF7] => vec![ob6_global_dump(channel)],
                _ => Vec::new(),
            }
        })
    }

    pub fn take_sent(&self) -> Vec<(String, MidiMessage)> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Deliver `message` as if the synth sent it unprompted
    pub fn inject(&self, endpoint: &str, message: &MidiMessage) {
        for (_, _, handler) in self.handlers.lock().iter() {
            handler(endpoint, message);
        }
    }
}

impl Transport for LoopbackTransport {
    fn open(&self, _endpoint: &str) -> patchvault_core::Result<()> {
        Ok(())
    }

    fn close(&self, _endpoint: &str) -> patchvault_core::Result<()> {
        Ok(())
    }

    fn send(&self, endpoint: &str, message: &MidiMessage) -> patchvault_core::Result<()> {
        self.sent.lock().push((endpoint.to_string(), message.clone()));
        let answers = (self.responder)(message);
        let handlers = self.handlers.lock();
        for answer in &answers {
            for (_, _, handler) in handlers.iter() {
                handler(endpoint, answer);
            }
        }
        Ok(())
    }

    fn register_inbound_handler(&self, variant: &str, handler: InboundHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.handlers.lock().push((id, variant.to_string(), handler));
        id
    }

    fn unregister_inbound_handler(&self, id: HandlerId) {
        self.handlers.lock().retain(|(held, _, _)| *held != id);
    }
}

/// Store whose lookups wait for the test to release them
///
/// Every `get` announces itself on `entered` and then blocks until a token
/// arrives on the release channel.
pub struct BlockingStore {
    pub inner: MemoryStore,
    entered: Sender<()>,
    release: Receiver<()>,
}

#[allow(dead_code)]
impl BlockingStore {
    /// The store, a receiver of lookup announcements, a sender of releases
    pub fn new() -> (Self, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = flume::unbounded();
        let (release_tx, release_rx) = flume::unbounded();
        let store = Self {
            inner: MemoryStore::new(),
            entered: entered_tx,
            release: release_rx,
        };
        (store, entered_rx, release_tx)
    }
}

impl PatchStore for BlockingStore {
    fn count(&self, filter: &PatchFilter) -> Result<usize, ExError> {
        self.inner.count(filter)
    }

    fn paged_fetch(
        &self,
        filter: &PatchFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<PatchHolder>, ExError> {
        self.inner.paged_fetch(filter, skip, limit)
    }

    fn list_import_sources(&self, variant: &str) -> Result<BTreeMap<String, String>, ExError> {
        self.inner.list_import_sources(variant)
    }

    fn upsert_batch(&self, entries: &[PatchHolder]) -> Result<usize, ExError> {
        self.inner.upsert_batch(entries)
    }

    fn get(&self, variant: &str, fingerprint: &Fingerprint) -> Result<Option<PatchHolder>, ExError> {
        let _ = self.entered.send(());
        let _ = self.release.recv();
        self.inner.get(variant, fingerprint)
    }

    fn set_favorite(
        &self,
        variant: &str,
        fingerprint: &Fingerprint,
        favorite: bool,
    ) -> Result<(), ExError> {
        self.inner.set_favorite(variant, fingerprint, favorite)
    }
}
