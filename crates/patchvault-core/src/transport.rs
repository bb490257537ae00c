//! Transport contract
//!
//! Opening ports and moving raw bytes is the transport's business. The core
//! relies on ordered outbound delivery and on inbound messages tagged with
//! the endpoint they arrived on.

use crate::errors::Result;
use crate::midi::MidiMessage;

/// Receives inbound messages: `(source endpoint, message)`
pub type InboundHandler = Box<dyn Fn(&str, &MidiMessage) + Send + Sync>;

/// Token of one inbound handler registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u64);

pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// Returns `Transport` when the endpoint cannot be opened.
    fn open(&self, endpoint: &str) -> Result<()>;

    /// # Errors
    ///
    /// Returns `Transport` when the endpoint is not open.
    fn close(&self, endpoint: &str) -> Result<()>;

    /// # Errors
    ///
    /// Returns `Transport` on I/O failure.
    fn send(&self, endpoint: &str, message: &MidiMessage) -> Result<()>;

    /// Route inbound messages for `variant` to `handler`
    ///
    /// A variant may have several handlers at once; each receives every
    /// message until its registration is removed.
    fn register_inbound_handler(&self, variant: &str, handler: InboundHandler) -> HandlerId;

    /// Remove the registration `id`; unknown ids are ignored
    fn unregister_inbound_handler(&self, id: HandlerId);
}

/// Send `messages` in order, stopping at the first failure
///
/// # Errors
///
/// Returns the first transport error.
pub fn send_all(transport: &dyn Transport, endpoint: &str, messages: &[MidiMessage]) -> Result<()> {
    messages
        .iter()
        .try_for_each(|message| transport.send(endpoint, message))
}
