use std::sync::LazyLock;

use assert_matches::assert_matches;
use proptest::prelude::*;
use regex::Regex;

use gst_linkage::domain::{
    Gstin, Identifier, IdentifierKind, Pan, ValidationError, ValidationReason, validate,
};
use gst_linkage::error::{ErrorKind, LookupError};

#[test]
fn parse_pan_valid() {
    let pan: Pan = "ABCDE1234F".parse().unwrap();
    assert_eq!(pan.as_str(), "ABCDE1234F");
}

#[test]
fn parse_pan_normalizes_case_and_whitespace() {
    let pan: Pan = "  abcde1234f\n".parse().unwrap();
    assert_eq!(pan.to_string(), "ABCDE1234F");
}

#[test]
fn parse_pan_empty() {
    let err = "   ".parse::<Pan>().unwrap_err();
    assert_matches!(
        err,
        ValidationError {
            kind: IdentifierKind::Pan,
            reason: ValidationReason::Empty,
            ..
        }
    );
    assert_eq!(err.to_string(), "Please enter a PAN number");
}

#[test]
fn parse_pan_invalid_shapes() {
    for raw in ["ABCD1234F", "ABCDE12345", "1BCDE1234F", "ABCDE1234FG", "ABCDE-234F"] {
        let err = raw.parse::<Pan>().unwrap_err();
        assert_eq!(err.reason, ValidationReason::Format, "{raw}");
        assert_eq!(err.to_string(), "Invalid PAN format. Example: ABCDE1234F");
    }
}

#[test]
fn parse_gstin_valid() {
    let gstin: Gstin = "27abcde1234f1z5".parse().unwrap();
    assert_eq!(gstin.as_str(), "27ABCDE1234F1Z5");
    assert_eq!(gstin.state_code(), "27");
    assert_eq!(gstin.pan_segment(), "ABCDE1234F");
}

#[test]
fn parse_gstin_invalid() {
    // Entity digit 0 and a missing fixed Z are both rejected.
    for raw in ["27ABCDE1234F0Z5", "27ABCDE1234F1X5", "ABCDE1234F1Z5", "2ABCDE1234F1Z5"] {
        let err = raw.parse::<Gstin>().unwrap_err();
        assert_eq!(err.reason, ValidationReason::Format, "{raw}");
    }
    let err = "".parse::<Gstin>().unwrap_err();
    assert_eq!(err.to_string(), "Please enter a GST number");
}

#[test]
fn gstin_belongs_to_embedded_pan() {
    let pan: Pan = "ABCDE1234F".parse().unwrap();
    let own: Gstin = "29ABCDE1234F2Z3".parse().unwrap();
    let other: Gstin = "29PQRST6789K1Z3".parse().unwrap();
    assert!(own.belongs_to(&pan));
    assert!(!other.belongs_to(&pan));
}

#[test]
fn validate_dispatches_on_kind() {
    let identifier = validate(IdentifierKind::Gstin, "07ABCDE1234F1ZK").unwrap();
    assert_matches!(identifier, Identifier::Gstin(_));
    assert_eq!(identifier.kind(), IdentifierKind::Gstin);

    // A PAN is not a GSTIN and vice versa.
    assert!(validate(IdentifierKind::Gstin, "ABCDE1234F").is_err());
    assert!(validate(IdentifierKind::Pan, "07ABCDE1234F1ZK").is_err());
}

#[test]
fn validation_error_converts_to_lookup_error() {
    let err: LookupError = "nope".parse::<Pan>().unwrap_err().into();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.user_message(), "Invalid PAN format. Example: ABCDE1234F");
}

#[test]
fn deserializing_pan_validates() {
    let pan: Pan = serde_json::from_str("\"abcde1234f\"").unwrap();
    assert_eq!(pan.as_str(), "ABCDE1234F");
    assert!(serde_json::from_str::<Pan>("\"bad\"").is_err());
}

static PAN_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap());

static GSTIN_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$").unwrap()
});

fn pan_candidates() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z]{5}[0-9]{4}[A-Za-z]",
        " {0,2}[A-Za-z]{5}[0-9]{4}[A-Za-z] {0,2}",
        "[A-Za-z0-9]{8,12}",
        any::<String>(),
    ]
}

fn gstin_candidates() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{2}[A-Za-z]{5}[0-9]{4}[A-Za-z][0-9A-Za-z][Zz][0-9A-Za-z]",
        "[0-9A-Z]{13,17}",
        any::<String>(),
    ]
}

proptest! {
    #[test]
    fn pan_acceptance_matches_lexical_form(raw in pan_candidates()) {
        let normalized = raw.trim().to_uppercase();
        match raw.parse::<Pan>() {
            Ok(pan) => {
                prop_assert!(PAN_SHAPE.is_match(&normalized));
                prop_assert_eq!(pan.as_str(), normalized.as_str());
            }
            Err(err) => {
                prop_assert!(!PAN_SHAPE.is_match(&normalized));
                let expected = if normalized.is_empty() {
                    ValidationReason::Empty
                } else {
                    ValidationReason::Format
                };
                prop_assert_eq!(err.reason, expected);
            }
        }
    }

    #[test]
    fn gstin_acceptance_matches_lexical_form(raw in gstin_candidates()) {
        let normalized = raw.trim().to_uppercase();
        let parsed = raw.parse::<Gstin>();
        prop_assert_eq!(parsed.is_ok(), GSTIN_SHAPE.is_match(&normalized));
        if let Ok(gstin) = parsed {
            prop_assert!(gstin.pan_segment().parse::<Pan>().is_ok());
        }
    }
}
