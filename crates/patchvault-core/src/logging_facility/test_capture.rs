//! In-memory event capture for logging assertions
//!
//! Tests of the ingestion pipeline, the capability fallbacks and the file
//! loader assert on the structured records they emit: which variant, which
//! item, which error code. The capture layer keeps every event with its
//! fields as strings.

use parking_lot::Mutex;
use patchvault_core_types::schema::{
    EVENT_ITEM_FAILED, FIELD_COMPONENT, FIELD_EVENT, FIELD_ITEM_INDEX, FIELD_OP, FIELD_VARIANT,
};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// One recorded event
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub component: Option<String>,
    pub op: Option<String>,
    pub event: Option<String>,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Synth variant the record concerns
    pub fn variant(&self) -> Option<&str> {
        self.field(FIELD_VARIANT)
    }

    /// Batch or frame position, for item records
    pub fn item_index(&self) -> Option<usize> {
        self.field(FIELD_ITEM_INDEX).and_then(|i| i.parse().ok())
    }

    fn is(&self, op: &str, event: &str) -> bool {
        self.op.as_deref() == Some(op) && self.event.as_deref() == Some(event)
    }
}

/// Stores every value as its string form; `message` keeps Display output
#[derive(Default)]
struct Fields(HashMap<String, String>);

impl Fields {
    fn put(&mut self, field: &Field, value: String) {
        self.0.insert(field.name().to_string(), value);
    }
}

impl Visit for Fields {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }
}

/// Layer feeding a [`TestCapture`]
pub struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureLayer {
    pub fn new() -> (Self, TestCapture) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let capture = TestCapture {
            events: Arc::clone(&events),
        };
        (Self { events }, capture)
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);
        let fields = fields.0;

        self.events.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            component: fields.get(FIELD_COMPONENT).cloned(),
            op: fields.get(FIELD_OP).cloned(),
            event: fields.get(FIELD_EVENT).cloned(),
            fields,
        });
    }
}

/// Shared view of the captured events
#[derive(Clone)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    /// Events naming `variant`, in emission order
    pub fn for_variant(&self, variant: &str) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.variant() == Some(variant))
            .cloned()
            .collect()
    }

    /// Item positions `op` reported as failed for `variant`
    pub fn failed_items(&self, op: &str, variant: &str) -> Vec<usize> {
        self.for_variant(variant)
            .iter()
            .filter(|e| e.is(op, EVENT_ITEM_FAILED))
            .filter_map(CapturedEvent::item_index)
            .collect()
    }

    /// # Panics
    ///
    /// Panics when no event has this `op` and `event`.
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        let events = self.events();
        assert!(
            events.iter().any(|e| e.is(op, event)),
            "no op={} event={} among {} captured events",
            op,
            event,
            events.len()
        );
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture layer as global subscriber once and return its handle
///
/// All tests of one binary share the buffer; filter on a variant or op name
/// unique to the test.
///
/// ```
/// use patchvault_core::logging_facility::test_capture::init_test_capture;
/// use patchvault_core::log_run_aborted;
///
/// let capture = init_test_capture();
/// log_run_aborted!("merge_patches", "Doc Synth", 3usize);
/// assert_eq!(capture.for_variant("Doc Synth")[0].item_index(), Some(3));
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let (layer, capture) = CaptureLayer::new();
            tracing_subscriber::registry().with(layer).init();
            capture
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_failed(variant: &str, index: &str) -> CapturedEvent {
        let fields = [(FIELD_VARIANT, variant), (FIELD_ITEM_INDEX, index)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CapturedEvent {
            level: Level::WARN,
            component: None,
            op: Some("load_file".to_string()),
            event: Some(EVENT_ITEM_FAILED.to_string()),
            fields,
        }
    }

    #[test]
    fn test_item_accessors() {
        let event = item_failed("OB-6", "4");
        assert_eq!(event.variant(), Some("OB-6"));
        assert_eq!(event.item_index(), Some(4));
        assert_eq!(event.field("missing"), None);
        assert_eq!(item_failed("OB-6", "x").item_index(), None);
    }

    #[test]
    fn test_failed_items_filter_by_variant() {
        let (_layer, capture) = CaptureLayer::new();
        capture.events.lock().extend([
            item_failed("OB-6", "1"),
            item_failed("Alesis Andromeda A6", "2"),
            item_failed("OB-6", "5"),
        ]);
        assert_eq!(capture.failed_items("load_file", "OB-6"), vec![1, 5]);
        assert!(capture.failed_items("merge_patches", "OB-6").is_empty());
    }
}
