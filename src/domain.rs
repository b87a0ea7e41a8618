use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PAN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("valid PAN pattern"));

static GSTIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$").expect("valid GSTIN pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Pan,
    Gstin,
}

impl IdentifierKind {
    pub fn label(&self) -> &'static str {
        match self {
            IdentifierKind::Pan => "PAN",
            IdentifierKind::Gstin => "GST",
        }
    }

    pub fn example(&self) -> &'static str {
        match self {
            IdentifierKind::Pan => "ABCDE1234F",
            IdentifierKind::Gstin => "22ABCDE1234F1Z5",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            IdentifierKind::Pan => &*PAN_PATTERN,
            IdentifierKind::Gstin => &*GSTIN_PATTERN,
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Pan => write!(f, "PAN"),
            IdentifierKind::Gstin => write!(f, "GSTIN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationReason {
    Empty,
    Format,
}

/// Rejected identifier input. Raised before any registry call is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub kind: IdentifierKind,
    pub reason: ValidationReason,
    pub input: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            ValidationReason::Empty => write!(f, "Please enter a {} number", self.kind.label()),
            ValidationReason::Format => write!(
                f,
                "Invalid {} format. Example: {}",
                self.kind.label(),
                self.kind.example()
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

impl miette::Diagnostic for ValidationError {}

fn check(kind: IdentifierKind, raw: &str) -> Result<String, ValidationError> {
    let normalized = raw.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(ValidationError {
            kind,
            reason: ValidationReason::Empty,
            input: raw.to_string(),
        });
    }
    if !kind.pattern().is_match(&normalized) {
        return Err(ValidationError {
            kind,
            reason: ValidationReason::Format,
            input: raw.to_string(),
        });
    }
    Ok(normalized)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pan(String);

impl Pan {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Pan {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        check(IdentifierKind::Pan, value).map(Self)
    }
}

impl TryFrom<String> for Pan {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pan> for String {
    fn from(value: Pan) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Gstin(String);

impl Gstin {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Two-digit state code prefix.
    pub fn state_code(&self) -> &str {
        &self.0[..2]
    }

    /// The PAN embedded at positions 3..=12.
    pub fn pan_segment(&self) -> &str {
        &self.0[2..12]
    }

    pub fn belongs_to(&self, pan: &Pan) -> bool {
        self.pan_segment() == pan.as_str()
    }
}

impl fmt::Display for Gstin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Gstin {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        check(IdentifierKind::Gstin, value).map(Self)
    }
}

impl TryFrom<String> for Gstin {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Gstin> for String {
    fn from(value: Gstin) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Pan(Pan),
    Gstin(Gstin),
}

impl Identifier {
    pub fn kind(&self) -> IdentifierKind {
        match self {
            Identifier::Pan(_) => IdentifierKind::Pan,
            Identifier::Gstin(_) => IdentifierKind::Gstin,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Pan(pan) => pan.as_str(),
            Identifier::Gstin(gstin) => gstin.as_str(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn validate(kind: IdentifierKind, raw: &str) -> Result<Identifier, ValidationError> {
    match kind {
        IdentifierKind::Pan => raw.parse().map(Identifier::Pan),
        IdentifierKind::Gstin => raw.parse().map(Identifier::Gstin),
    }
}
