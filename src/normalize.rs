//! Shapes raw `SearchByGst` payloads into printable records.
//!
//! The registry's field names are terse and inconsistently populated, so every
//! read goes through [`RawGstRecord`] first and every missing value becomes
//! [`NOT_AVAILABLE`].

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::Gstin;

pub const NOT_AVAILABLE: &str = "N/A";

static STATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"State - (.*?),").expect("valid jurisdiction pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    Active,
    Inactive,
    #[serde(rename = "N/A")]
    Unknown,
}

impl RegistrationStatus {
    pub fn from_raw(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "active" => RegistrationStatus::Active,
            "inactive" | "cancelled" | "suspended" => RegistrationStatus::Inactive,
            _ => RegistrationStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Active => "Active",
            RegistrationStatus::Inactive => "Inactive",
            RegistrationStatus::Unknown => NOT_AVAILABLE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkageRecord {
    pub gstin: String,
    pub legal_name: String,
    pub trade_name: String,
    pub status: RegistrationStatus,
    pub state: String,
    pub registration_date: String,
}

impl LinkageRecord {
    /// Canonical raw form of this record; `normalize(&record.to_raw())`
    /// yields the record back.
    pub fn to_raw(&self) -> Value {
        let mut map = Map::new();
        insert_available(&mut map, "gstin", &self.gstin);
        insert_available(&mut map, "lgnm", &self.legal_name);
        insert_available(&mut map, "tradeNam", &self.trade_name);
        insert_available(&mut map, "sts", self.status.as_str());
        if self.state != NOT_AVAILABLE {
            map.insert(
                "stj".to_string(),
                Value::String(format!("State - {},", self.state)),
            );
        }
        insert_available(&mut map, "rgdt", &self.registration_date);
        Value::Object(map)
    }
}

/// A single-GSTIN lookup carries a few more fields than a linkage record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GstDetail {
    #[serde(flatten)]
    pub record: LinkageRecord,
    pub business_type: String,
    pub principal_place: String,
    pub additional_places: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawGstRecord {
    pub gstin: Option<String>,
    pub legal_name: Option<String>,
    pub trade_name: Option<String>,
    pub status: Option<String>,
    pub jurisdiction: Option<String>,
    pub registration_date: Option<String>,
    pub business_type: Option<String>,
    pub principal_address: Option<String>,
    pub has_additional_places: bool,
}

impl RawGstRecord {
    pub fn from_value(raw: &Value) -> Self {
        Self {
            gstin: text_field(raw.get("gstin")),
            legal_name: text_field(raw.get("lgnm")),
            trade_name: text_field(raw.get("tradeNam")),
            status: text_field(raw.get("sts")),
            jurisdiction: text_field(raw.get("stj")),
            registration_date: text_field(raw.get("rgdt")),
            business_type: text_field(raw.get("ctb")),
            principal_address: text_field(raw.get("pradr").and_then(|value| value.get("adr"))),
            has_additional_places: raw.get("adadr").map(is_populated).unwrap_or(false),
        }
    }

    pub fn into_record(self, requested: Option<&Gstin>) -> LinkageRecord {
        let state = self.jurisdiction.as_deref().and_then(parse_state);
        LinkageRecord {
            gstin: self
                .gstin
                .or_else(|| requested.map(|gstin| gstin.as_str().to_string()))
                .unwrap_or_else(not_available),
            legal_name: self.legal_name.unwrap_or_else(not_available),
            trade_name: self.trade_name.unwrap_or_else(not_available),
            status: self
                .status
                .as_deref()
                .map(RegistrationStatus::from_raw)
                .unwrap_or(RegistrationStatus::Unknown),
            state: state.unwrap_or_else(not_available),
            registration_date: self.registration_date.unwrap_or_else(not_available),
        }
    }

    pub fn into_detail(mut self, requested: Option<&Gstin>) -> GstDetail {
        let business_type = self.business_type.take().unwrap_or_else(not_available);
        let principal_place = self.principal_address.take().unwrap_or_else(not_available);
        let additional_places = if self.has_additional_places { "Yes" } else { "No" };
        GstDetail {
            record: self.into_record(requested),
            business_type,
            principal_place,
            additional_places: additional_places.to_string(),
        }
    }
}

pub fn normalize(raw: &Value) -> LinkageRecord {
    RawGstRecord::from_value(raw).into_record(None)
}

pub fn normalize_detail(raw: &Value, requested: Option<&Gstin>) -> GstDetail {
    RawGstRecord::from_value(raw).into_detail(requested)
}

/// Pulls `<name>` out of jurisdiction text shaped like `State - <name>, ...`.
pub fn parse_state(jurisdiction: &str) -> Option<String> {
    STATE_PATTERN
        .captures(jurisdiction)
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().trim())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}

fn text_field(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn is_populated(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::String(text) => !text.trim().is_empty(),
        _ => false,
    }
}

fn insert_available(map: &mut Map<String, Value>, key: &str, value: &str) {
    if value != NOT_AVAILABLE {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}
