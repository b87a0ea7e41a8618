#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use gst_linkage::domain::{Gstin, Pan};
use gst_linkage::error::LookupError;
use gst_linkage::registry::{Envelope, GstEnvelope, PanEnvelope, PanLinkage, RegistryClient};
use gst_linkage::resolver::{ProgressEvent, ProgressSink};

pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Clone)]
pub enum GstBehavior {
    Record { delay_ms: u64, data: Value },
    ErrorEnvelope(String),
    Transport,
    Hang,
}

#[derive(Default)]
pub struct MockRegistry {
    pans: HashMap<String, (u64, PanEnvelope)>,
    gsts: HashMap<String, GstBehavior>,
    pub gst_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockRegistry {
    pub fn with_pan(mut self, pan: &str, delay_ms: u64, envelope: PanEnvelope) -> Self {
        self.pans.insert(pan.to_string(), (delay_ms, envelope));
        self
    }

    pub fn with_linked(self, pan: &str, gstins: &[&str]) -> Self {
        self.with_pan(pan, 0, Envelope::success(PanLinkage::new(pan, gstins)))
    }

    pub fn with_gst(mut self, gstin: &str, behavior: GstBehavior) -> Self {
        self.gsts.insert(gstin.to_string(), behavior);
        self
    }

    pub fn with_record(self, gstin: &str, delay_ms: u64, state: &str) -> Self {
        self.with_gst(
            gstin,
            GstBehavior::Record {
                delay_ms,
                data: raw_record(gstin, state),
            },
        )
    }

    pub fn calls(&self) -> usize {
        self.gst_calls.load(Ordering::SeqCst)
    }
}

pub fn raw_record(gstin: &str, state: &str) -> Value {
    json!({
        "gstin": gstin,
        "lgnm": "ABC Private Limited",
        "tradeNam": format!("ABC {state}"),
        "sts": "Active",
        "stj": format!("State - {state}, Zone - Central"),
        "rgdt": "01/07/2017"
    })
}

#[async_trait]
impl RegistryClient for MockRegistry {
    async fn lookup_by_pan(&self, pan: &Pan) -> Result<PanEnvelope, LookupError> {
        let (delay_ms, envelope) = self
            .pans
            .get(pan.as_str())
            .cloned()
            .ok_or_else(|| LookupError::Transport("unknown PAN in mock".to_string()))?;
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(envelope)
    }

    async fn lookup_by_gst(&self, gstin: &Gstin) -> Result<GstEnvelope, LookupError> {
        self.gst_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let behavior = self.gsts.get(gstin.as_str()).cloned();
        let outcome = match behavior {
            Some(GstBehavior::Record { delay_ms, data }) => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(Envelope::success(data))
            }
            Some(GstBehavior::ErrorEnvelope(message)) => Ok(Envelope::error(&message)),
            Some(GstBehavior::Transport) | None => {
                Err(LookupError::Transport("connection reset".to_string()))
            }
            Some(GstBehavior::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(LookupError::Transport("hang finished".to_string()))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
