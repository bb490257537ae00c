//! Session context
//!
//! Owns what an interactive session has selected: the active variant, the
//! displayed patch with its layer pointer and the compare target. Changes are
//! announced to an explicit subscriber list. Asynchronous results carry a
//! [`QueryTag`] and are dropped when the session moved on in the meantime.

use crate::capability::dispatch;
use crate::errors::{PatchVaultError, Result};
use crate::midi::MidiMessage;
use crate::model::PatchHolder;
use crate::variants::SynthVariant;

const CALLER: &str = "select_patch";

/// Change notification delivered to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum ContextEvent {
    VariantChanged { variant: String, generation: u64 },
    PatchSelected { key: String },
    LayerChanged { key: String, layer: usize },
}

/// Identity of the session state an asynchronous query was issued for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryTag {
    pub variant: String,
    pub generation: u64,
}

/// What selecting a patch did
#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    /// A different patch is now current; `messages` load it into the synth
    PatchSwitch { messages: Vec<MidiMessage> },
    /// The current patch was selected again and its next layer is active
    LayerAdvance {
        layer: usize,
        messages: Vec<MidiMessage>,
    },
}

impl SelectOutcome {
    pub fn messages(&self) -> &[MidiMessage] {
        match self {
            SelectOutcome::PatchSwitch { messages } => messages,
            SelectOutcome::LayerAdvance { messages, .. } => messages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn Fn(&ContextEvent) + Send>;

#[derive(Default)]
pub struct SessionContext {
    variant: Option<String>,
    generation: u64,
    current: Option<PatchHolder>,
    compare_target: Option<PatchHolder>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_patch(&self) -> Option<&PatchHolder> {
        self.current.as_ref()
    }

    pub fn current_layer(&self) -> usize {
        self.current.as_ref().map_or(0, |p| p.current_layer)
    }

    pub fn compare_target(&self) -> Option<&PatchHolder> {
        self.compare_target.as_ref()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&ContextEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false when `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    fn notify(&self, event: ContextEvent) {
        for (_, subscriber) in &self.subscribers {
            subscriber(&event);
        }
    }

    /// Make `variant` the active one; outstanding query tags become stale
    pub fn set_active_variant(&mut self, variant: &str) {
        self.generation += 1;
        self.variant = Some(variant.to_string());
        self.current = None;
        self.compare_target = None;
        self.notify(ContextEvent::VariantChanged {
            variant: variant.to_string(),
            generation: self.generation,
        });
    }

    /// Tag for a query issued now, `None` without an active variant
    pub fn query_tag(&self) -> Option<QueryTag> {
        self.variant.as_ref().map(|variant| QueryTag {
            variant: variant.clone(),
            generation: self.generation,
        })
    }

    /// Whether a result issued under `tag` still belongs to this session state
    pub fn accepts(&self, tag: &QueryTag) -> bool {
        self.generation == tag.generation && self.variant.as_deref() == Some(tag.variant.as_str())
    }

    /// Select `patch` for display and playback
    ///
    /// Selecting the current patch again advances its layer pointer,
    /// wrapping after the last layer. Selecting another patch resets the
    /// layer to 0 and remembers the previous patch as compare target.
    ///
    /// # Errors
    ///
    /// Returns `Incomparable` when `patch` was not captured from `variant`,
    /// or the codec error when the patch cannot be encoded.
    pub fn select_patch(
        &mut self,
        variant: &SynthVariant,
        mut patch: PatchHolder,
    ) -> Result<SelectOutcome> {
        if patch.variant() != variant.name() {
            return Err(PatchVaultError::Incomparable {
                variant_a: variant.name().to_string(),
                variant_b: patch.variant().to_string(),
            });
        }
        let layers = match patch.patch().layers().len() {
            0 => dispatch::number_of_layers(variant, CALLER),
            spans => spans,
        };

        if let Some(current) = self.current.as_mut() {
            if current.key() == patch.key() {
                let layer = (current.current_layer + 1) % layers;
                current.current_layer = layer;
                let messages = dispatch::switch_to_layer(variant, CALLER, layer);
                let key = current.key();
                self.notify(ContextEvent::LayerChanged { key, layer });
                return Ok(SelectOutcome::LayerAdvance { layer, messages });
            }
        }

        let mut messages = variant
            .synth()
            .patch_to_sysex(patch.patch(), variant.channel_or_default())?;
        if layers > 1 {
            messages.extend(dispatch::switch_to_layer(variant, CALLER, 0));
        }
        patch.current_layer = 0;
        let key = patch.key();
        if let Some(previous) = self.current.replace(patch) {
            self.compare_target = Some(previous);
        }
        self.notify(ContextEvent::PatchSelected { key });
        Ok(SelectOutcome::PatchSwitch { messages })
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("variant", &self.variant)
            .field("generation", &self.generation)
            .field("current", &self.current.as_ref().map(PatchHolder::key))
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
