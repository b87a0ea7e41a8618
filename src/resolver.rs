use std::future::Future;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ResolvedConfig;
use crate::domain::{Gstin, IdentifierKind, Pan};
use crate::error::{ErrorKind, LookupError};
use crate::normalize::{GstDetail, LinkageRecord, RawGstRecord};
use crate::registry::{EnvelopeStatus, GstEnvelope, PanEnvelope, PanLinkage, RegistryClient};
use crate::session::{Commit, SharedSession};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink: Send + Sync {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkageResult {
    pub pan_number: Pan,
    pub total_gst_linked: usize,
    pub gst_details: Vec<LinkageRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FetchFailure>,
}

impl LinkageResult {
    pub fn empty(pan_number: Pan) -> Self {
        Self {
            pan_number,
            total_gst_linked: 0,
            gst_details: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// One GSTIN that could not be fetched. Only reported in best-effort mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub gstin: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    pub strict_aggregation: bool,
    pub call_timeout: Duration,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions::from(&ResolvedConfig::default())
    }
}

impl From<&ResolvedConfig> for ResolverOptions {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            strict_aggregation: config.strict_aggregation,
            call_timeout: config.timeout,
        }
    }
}

pub struct LinkageResolver<C: RegistryClient> {
    client: C,
    options: ResolverOptions,
}

impl<C: RegistryClient> LinkageResolver<C> {
    pub fn new(client: C, options: ResolverOptions) -> Self {
        Self { client, options }
    }

    /// Discovers the GSTINs linked to `pan`, then fetches every one of them
    /// concurrently. Records come back in discovery order.
    pub async fn resolve(
        &self,
        pan: &Pan,
        sink: &dyn ProgressSink,
    ) -> Result<LinkageResult, LookupError> {
        info!(%pan, strict = self.options.strict_aggregation, "resolving GST linkage");
        sink.event(ProgressEvent {
            message: format!("phase=Discover; pan {pan}"),
            elapsed: None,
        });

        let start = Instant::now();
        let envelope = self
            .bounded("SearchByPan", self.client.lookup_by_pan(pan))
            .await?;
        sink.event(ProgressEvent {
            message: format!(
                "registry.response latency_ms={}",
                start.elapsed().as_millis()
            ),
            elapsed: Some(start.elapsed()),
        });

        let linkage = discovered_linkage(pan, envelope)?;
        let pan_number = echoed_pan(pan, linkage.pan_num.as_deref());
        let discovered = linkage.gstins();
        if discovered.is_empty() {
            info!(%pan_number, "no GST registrations linked");
            return Ok(LinkageResult::empty(pan_number));
        }

        sink.event(ProgressEvent {
            message: format!("phase=FanOut; {} GSTIN lookup(s)", discovered.len()),
            elapsed: Some(start.elapsed()),
        });
        let settled = join_all(
            discovered
                .iter()
                .map(|raw| self.fetch_record(&pan_number, raw)),
        )
        .await;
        sink.event(ProgressEvent {
            message: "phase=FanIn; assembling records".to_string(),
            elapsed: Some(start.elapsed()),
        });

        self.assemble(pan_number, &discovered, settled)
    }

    /// Runs [`resolve`](Self::resolve) on behalf of `session`. A newer search
    /// started on the same session while this one is in flight wins.
    pub async fn resolve_into(
        &self,
        session: &SharedSession,
        pan: &Pan,
        sink: &dyn ProgressSink,
    ) -> Commit {
        let ticket = session.begin();
        let outcome = self.resolve(pan, sink).await;
        session.complete(ticket, outcome)
    }

    /// Single-GSTIN lookup with the extended detail fields.
    pub async fn lookup_gst(
        &self,
        gstin: &Gstin,
        sink: &dyn ProgressSink,
    ) -> Result<GstDetail, LookupError> {
        info!(%gstin, "looking up GST registration");
        sink.event(ProgressEvent {
            message: format!("phase=Lookup; gstin {gstin}"),
            elapsed: None,
        });
        let start = Instant::now();
        let envelope = self
            .bounded("SearchByGst", self.client.lookup_by_gst(gstin))
            .await?;
        sink.event(ProgressEvent {
            message: format!(
                "registry.response latency_ms={}",
                start.elapsed().as_millis()
            ),
            elapsed: Some(start.elapsed()),
        });
        let data = gst_payload(gstin, envelope)?;
        Ok(RawGstRecord::from_value(&data).into_detail(Some(gstin)))
    }

    async fn fetch_record(&self, pan: &Pan, raw: &str) -> Result<LinkageRecord, LookupError> {
        let gstin: Gstin = raw.parse()?;
        if !gstin.belongs_to(pan) {
            warn!(%gstin, %pan, "linked GSTIN does not embed the PAN");
        }
        let envelope = self
            .bounded("SearchByGst", self.client.lookup_by_gst(&gstin))
            .await?;
        let data = gst_payload(&gstin, envelope)?;
        debug!(%gstin, state_code = gstin.state_code(), "GST record fetched");
        Ok(RawGstRecord::from_value(&data).into_record(Some(&gstin)))
    }

    fn assemble(
        &self,
        pan_number: Pan,
        discovered: &[String],
        settled: Vec<Result<LinkageRecord, LookupError>>,
    ) -> Result<LinkageResult, LookupError> {
        let mut gst_details = Vec::with_capacity(settled.len());
        let mut failures = Vec::new();
        for (raw, outcome) in discovered.iter().zip(settled) {
            match outcome {
                Ok(record) => gst_details.push(record),
                Err(err) => {
                    warn!(gstin = %raw, kind = ?err.kind(), error = %err, "GST lookup failed");
                    failures.push(FetchFailure {
                        gstin: raw.clone(),
                        kind: err.kind(),
                        message: err.to_string(),
                    });
                }
            }
        }

        if self.options.strict_aggregation {
            if let Some(first) = failures.first() {
                return Err(LookupError::PartialFetchFailure {
                    failed: failures.len(),
                    total: discovered.len(),
                    first: format!("{}: {}", first.gstin, first.message),
                });
            }
        }

        info!(
            %pan_number,
            linked = gst_details.len(),
            failed = failures.len(),
            "GST linkage resolved"
        );
        Ok(LinkageResult {
            pan_number,
            total_gst_linked: gst_details.len(),
            gst_details,
            failures,
        })
    }

    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T, LookupError>
    where
        F: Future<Output = Result<T, LookupError>>,
    {
        let limit = self.options.call_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(LookupError::Timeout {
                operation: operation.to_string(),
                after_ms: limit.as_millis() as u64,
            }),
        }
    }
}

fn discovered_linkage(pan: &Pan, envelope: PanEnvelope) -> Result<PanLinkage, LookupError> {
    match envelope.status() {
        // An absent list is no result set; only a present, empty one means
        // zero linkages.
        EnvelopeStatus::Success => match envelope.data {
            Some(linkage) if linkage.gstin_res_list.is_some() => Ok(linkage),
            _ => Err(LookupError::NotFound {
                kind: IdentifierKind::Pan,
                identifier: pan.to_string(),
            }),
        },
        EnvelopeStatus::Error => Err(LookupError::Upstream {
            message: envelope
                .message
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| format!("PAN lookup failed for {pan}")),
        }),
        EnvelopeStatus::Other => Err(LookupError::NotFound {
            kind: IdentifierKind::Pan,
            identifier: pan.to_string(),
        }),
    }
}

fn gst_payload(gstin: &Gstin, envelope: GstEnvelope) -> Result<Value, LookupError> {
    match envelope.status() {
        EnvelopeStatus::Success => match envelope.data {
            Some(Value::Object(record)) if !record.is_empty() => Ok(Value::Object(record)),
            Some(other) => Err(LookupError::MalformedPayload {
                operation: "SearchByGst".to_string(),
                identifier: gstin.to_string(),
                found: json_type(&other),
            }),
            None => Err(LookupError::NotFound {
                kind: IdentifierKind::Gstin,
                identifier: gstin.to_string(),
            }),
        },
        EnvelopeStatus::Error => Err(LookupError::Upstream {
            message: envelope
                .message
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| format!("GST lookup failed for {gstin}")),
        }),
        EnvelopeStatus::Other => Err(LookupError::NotFound {
            kind: IdentifierKind::Gstin,
            identifier: gstin.to_string(),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "empty object",
    }
}

fn echoed_pan(requested: &Pan, echoed: Option<&str>) -> Pan {
    match echoed.map(str::parse::<Pan>) {
        Some(Ok(pan)) => {
            if &pan != requested {
                warn!(%requested, echoed = %pan, "registry echoed a different PAN");
            }
            pan
        }
        Some(Err(err)) => {
            warn!(%requested, error = %err, "registry echoed an invalid PAN");
            requested.clone()
        }
        None => requested.clone(),
    }
}
