use std::io::{self, Write};

use serde::Serialize;

use crate::domain::{Identifier, ValidationError};
use crate::normalize::{GstDetail, LinkageRecord};
use crate::resolver::{LinkageResult, ProgressEvent, ProgressSink};
use crate::session::{LookupSession, SessionView};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

#[derive(Debug, Serialize)]
struct Report<'a, T: Serialize> {
    retrieved_at: String,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Debug, Serialize)]
pub struct ValidationReport<'a> {
    pub valid: bool,
    pub identifier: Option<String>,
    pub error: Option<&'a ValidationError>,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_session(session: &LookupSession) -> io::Result<()> {
        Self::print_json(&Report {
            retrieved_at: chrono::Utc::now().to_rfc3339(),
            body: session,
        })
    }

    pub fn print_detail(detail: &GstDetail) -> io::Result<()> {
        Self::print_json(&Report {
            retrieved_at: chrono::Utc::now().to_rfc3339(),
            body: detail,
        })
    }

    pub fn print_validation(outcome: &Result<Identifier, ValidationError>) -> io::Result<()> {
        let report = match outcome {
            Ok(identifier) => ValidationReport {
                valid: true,
                identifier: Some(identifier.to_string()),
                error: None,
            },
            Err(err) => ValidationReport {
                valid: false,
                identifier: None,
                error: Some(err),
            },
        };
        Self::print_json(&report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Human-readable rendering; progress goes to stderr so stdout stays clean.
pub struct TextOutput;

impl TextOutput {
    pub fn print_session(session: &LookupSession) -> io::Result<()> {
        Self::print(&render_session(session))
    }

    pub fn print_detail(detail: &GstDetail) -> io::Result<()> {
        Self::print(&render_detail(detail))
    }

    fn print(text: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(text.as_bytes())?;
        Ok(())
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("  {} ({}ms)", event.message, elapsed.as_millis()),
            None => eprintln!("  {}", event.message),
        }
    }
}

pub fn render_session(session: &LookupSession) -> String {
    match session.view() {
        SessionView::Empty => {
            "Enter a PAN number to find linked GST registrations\n".to_string()
        }
        SessionView::Pending => "Fetching linked GST details...\n".to_string(),
        SessionView::Failed(message) => format!("error: {message}\n"),
        SessionView::Succeeded(result) => render_linkage(result),
    }
}

pub fn render_linkage(result: &LinkageResult) -> String {
    let mut out = format!(
        "PAN Number:        {}\nTotal GST Linked:  {}\n",
        result.pan_number, result.total_gst_linked
    );
    if result.gst_details.is_empty() && result.failures.is_empty() {
        out.push_str("\nNo GST registrations are linked to this PAN.\n");
        return out;
    }

    if !result.gst_details.is_empty() {
        out.push_str("\nLinked GST Registrations\n");
        for record in &result.gst_details {
            out.push_str(&render_record(record));
        }
    }

    if !result.failures.is_empty() {
        out.push_str("\nCould not retrieve\n");
        for failure in &result.failures {
            out.push_str(&format!("  {}  {}\n", failure.gstin, failure.message));
        }
    }
    out
}

pub fn render_detail(detail: &GstDetail) -> String {
    let mut out = render_record(&detail.record);
    out.push_str(&format!(
        "    Business Type:     {}\n    Principal Place:   {}\n    Additional Places: {}\n",
        detail.business_type, detail.principal_place, detail.additional_places
    ));
    out
}

fn render_record(record: &LinkageRecord) -> String {
    format!(
        "  {}  [{}]\n    Trade Name:        {}\n    Legal Name:        {}\n    State:             {}\n    Registration Date: {}\n",
        record.gstin,
        record.status.as_str(),
        record.trade_name,
        record.legal_name,
        record.state,
        record.registration_date
    )
}
