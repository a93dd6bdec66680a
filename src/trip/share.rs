//! Share links.
//!
//! A trip travels inside the URL fragment as `#trip=<payload>`, where the
//! payload is the trip JSON, base64-encoded and then percent-encoded. No
//! server is involved: whoever opens the link recovers the whole trip.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};
use thiserror::Error;
use tracing::{info, warn};

use super::model::Trip;

/// Marker distinguishing a share payload from other fragment uses
pub const SHARE_MARKER: &str = "trip=";

const REQUIRED_FIELDS: [&str; 5] = ["id", "destination", "durationDays", "itinerary", "budget"];

/// Characters the standard base64 alphabet produces that are reserved in URLs
const PAYLOAD_RESERVED: &AsciiSet = &CONTROLS.add(b'+').add(b'/').add(b'=').add(b'%').add(b'#');

/// Reserved characters inside a query string value
pub(crate) const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

const QR_CODE_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/?size=200x200&data=";

/// Encodes padded, decodes with or without padding
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    #[error("Malformed share link: {0}")]
    MalformedShareLink(String),
    #[error("Share link does not describe a trip: {0}")]
    SchemaMismatch(String),
}

/// Serialize a trip into a `trip=` fragment (without the leading `#`)
pub fn encode(trip: &Trip) -> Result<String, ShareError> {
    let json = serde_json::to_vec(trip)
        .map_err(|e| ShareError::SchemaMismatch(format!("trip is not serializable: {}", e)))?;
    let payload = BASE64.encode(json);
    let escaped = utf8_percent_encode(&payload, PAYLOAD_RESERVED);

    Ok(format!("{}{}", SHARE_MARKER, escaped))
}

/// Recover a trip from a fragment produced by [`encode`]
///
/// A leading `#` is accepted. Decoding is all-or-nothing: any failure
/// rejects the link as a whole.
pub fn decode(fragment: &str) -> Result<Trip, ShareError> {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    let escaped = fragment
        .strip_prefix(SHARE_MARKER)
        .ok_or_else(|| ShareError::MalformedShareLink("missing `trip=` marker".to_string()))?;

    check_percent_escapes(escaped)?;
    let payload = percent_decode_str(escaped)
        .decode_utf8()
        .map_err(|_| ShareError::MalformedShareLink("percent-decoded payload is not UTF-8".to_string()))?;

    let bytes = BASE64
        .decode(payload.trim().as_bytes())
        .map_err(|e| ShareError::MalformedShareLink(format!("invalid base64 payload: {}", e)))?;

    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| ShareError::MalformedShareLink(format!("payload is not valid JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| ShareError::SchemaMismatch("payload is not a JSON object".to_string()))?;

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !object.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(ShareError::SchemaMismatch(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    serde_json::from_value(value).map_err(|e| ShareError::SchemaMismatch(e.to_string()))
}

/// Every `%` must introduce exactly two hex digits
fn check_percent_escapes(escaped: &str) -> Result<(), ShareError> {
    let bytes = escaped.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() >= i + 3
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(ShareError::MalformedShareLink(format!(
                    "truncated percent escape at offset {}",
                    i
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// Full share URL: `base_url` with its fragment replaced by the trip payload
pub fn share_url(base_url: &str, trip: &Trip) -> Result<String, ShareError> {
    let base = base_url.split('#').next().unwrap_or(base_url);
    Ok(format!("{}#{}", base, encode(trip)?))
}

/// URL of a QR code image pointing at `share_url`
pub fn qr_code_url(share_url: &str) -> String {
    format!("{}{}", QR_CODE_ENDPOINT, utf8_percent_encode(share_url, QUERY_VALUE))
}

/// Result of inspecting an opened URL for a share fragment
#[derive(Debug)]
pub struct FragmentConsumption {
    /// The URL to show after consumption; the share fragment is always removed
    pub cleaned_url: String,
    /// `None` when the URL carried no share fragment
    pub outcome: Option<Result<Trip, ShareError>>,
}

/// Take a share fragment out of an opened URL
///
/// The fragment is cleared whether or not decoding succeeds, so reopening the
/// cleaned URL never retriggers an import.
pub fn consume_share_fragment(url: &str) -> FragmentConsumption {
    let Some((base, fragment)) = url.split_once('#') else {
        return FragmentConsumption {
            cleaned_url: url.to_string(),
            outcome: None,
        };
    };

    if !fragment.starts_with(SHARE_MARKER) {
        return FragmentConsumption {
            cleaned_url: url.to_string(),
            outcome: None,
        };
    }

    let outcome = decode(fragment);
    match &outcome {
        Ok(trip) => info!("Imported shared trip {} to {}", trip.id, trip.destination),
        Err(e) => warn!("Discarding share fragment: {}", e),
    }

    FragmentConsumption {
        cleaned_url: base.to_string(),
        outcome: Some(outcome),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trip::model::*;

    fn roma() -> Trip {
        Trip {
            id: "a1".to_string(),
            destination: "Roma".to_string(),
            duration_days: 2,
            pace: TravelPace::Balanced,
            interests: Vec::new(),
            mandatory_activities: None,
            num_restaurants_per_day: 0,
            itinerary: vec![
                TripDay { day_number: 1, activities: Vec::new() },
                TripDay { day_number: 2, activities: Vec::new() },
            ],
            reservations: Vec::new(),
            budget: TripBudget {
                total_estimated: 500.0,
                currency: "EUR".to_string(),
                level: BudgetLevel::Medium,
                breakdown: BudgetBreakdown {
                    lodging: 200.0,
                    food: 150.0,
                    activities: 100.0,
                    transport: 50.0,
                },
            },
            general_tips: Vec::new(),
            status: TripStatus::Upcoming,
            created_at: 0,
        }
    }

    fn detailed_trip() -> Trip {
        let mut trip = roma();
        trip.destination = "Kyōto & Ōsaka".to_string();
        trip.interests = vec!["Cultura".to_string(), "Gastronomía".to_string()];
        trip.mandatory_activities = Some("Fushimi Inari al amanecer".to_string());
        trip.num_restaurants_per_day = 2;
        trip.itinerary[0].activities.push(Activity {
            id: Some("act-1".to_string()),
            start_time: "06:00".to_string(),
            end_time: "08:30".to_string(),
            title: "Fushimi Inari".to_string(),
            description: "Subida entre toriis \"rojos\" / sin multitudes".to_string(),
            poi_id: None,
            travel_mode: Some(TravelMode::Transit),
            travel_duration: Some("25 min".to_string()),
            category: TravelCategory::Culture,
            maps_search_query: Some("Fushimi Inari Taisha".to_string()),
            estimated_cost: 0.0,
        });
        trip.reservations.push(Reservation {
            id: "r1".to_string(),
            kind: ReservationKind::Restaurante,
            title: "Kikunoi".to_string(),
            detail: "Kaiseki".to_string(),
            time: Some("20:00".to_string()),
            location: None,
            confirmation_code: Some("K-42".to_string()),
            estimated_cost: 180.5,
        });
        trip.general_tips.push(TravelTip {
            title: "JR Pass".to_string(),
            content: "Compra el pase antes de llegar".to_string(),
            icon: "🚄".to_string(),
        });
        trip.created_at = 1_735_689_600_000;
        trip
    }

    /// Rebuild a fragment around an arbitrary JSON document
    fn fragment_for_json(json: &str) -> String {
        let payload = BASE64.encode(json.as_bytes());
        format!("{}{}", SHARE_MARKER, utf8_percent_encode(&payload, PAYLOAD_RESERVED))
    }

    #[test]
    fn test_roma_end_to_end() {
        let fragment = encode(&roma()).unwrap();
        assert!(fragment.starts_with("trip="));

        let decoded = decode(&fragment).unwrap();
        assert_eq!(decoded.destination, "Roma");
        assert_eq!(decoded.duration_days, 2);
        assert_eq!(decoded.itinerary.len(), 2);
        assert_eq!(decoded, roma());
    }

    #[test]
    fn test_round_trip_is_structural() {
        let trip = detailed_trip();
        let decoded = decode(&encode(&trip).unwrap()).unwrap();
        assert_eq!(decoded, trip);
    }

    #[test]
    fn test_fragment_is_url_safe() {
        let fragment = encode(&detailed_trip()).unwrap();
        let payload = fragment.strip_prefix(SHARE_MARKER).unwrap();
        assert!(payload
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '%'));
    }

    #[test]
    fn test_leading_hash_is_accepted() {
        let fragment = format!("#{}", encode(&roma()).unwrap());
        assert_eq!(decode(&fragment).unwrap(), roma());
    }

    #[test]
    fn test_missing_marker_is_malformed() {
        let fragment = encode(&roma()).unwrap();
        let without_marker = fragment.strip_prefix(SHARE_MARKER).unwrap();

        assert!(matches!(
            decode(without_marker),
            Err(ShareError::MalformedShareLink(_))
        ));
        assert!(matches!(decode("section-2"), Err(ShareError::MalformedShareLink(_))));
    }

    #[test]
    fn test_corrupted_base64_is_malformed() {
        assert!(matches!(
            decode("trip=@@not*base64@@"),
            Err(ShareError::MalformedShareLink(_))
        ));
    }

    #[test]
    fn test_truncated_percent_escape_is_malformed() {
        let fragment = encode(&roma()).unwrap();
        let truncated = format!("{}%3", fragment);
        assert!(matches!(decode(&truncated), Err(ShareError::MalformedShareLink(_))));
        assert!(matches!(decode("trip=abc%zz"), Err(ShareError::MalformedShareLink(_))));
    }

    #[test]
    fn test_non_json_payload_is_malformed() {
        let fragment = fragment_for_json("{\"id\": \"a1\", ");
        assert!(matches!(decode(&fragment), Err(ShareError::MalformedShareLink(_))));
    }

    #[test]
    fn test_missing_duration_is_schema_mismatch() {
        let mut value = serde_json::to_value(roma()).unwrap();
        value.as_object_mut().unwrap().remove("durationDays");
        let fragment = fragment_for_json(&value.to_string());

        match decode(&fragment) {
            Err(ShareError::SchemaMismatch(message)) => assert!(message.contains("durationDays")),
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_shapes_are_schema_mismatch() {
        let fragment = fragment_for_json("[1, 2, 3]");
        assert!(matches!(decode(&fragment), Err(ShareError::SchemaMismatch(_))));

        let mut value = serde_json::to_value(roma()).unwrap();
        value["durationDays"] = serde_json::json!("two");
        let fragment = fragment_for_json(&value.to_string());
        assert!(matches!(decode(&fragment), Err(ShareError::SchemaMismatch(_))));
    }

    #[test]
    fn test_unpadded_payload_still_decodes() {
        let fragment = encode(&roma()).unwrap();
        let unpadded = fragment.trim_end_matches("%3D");
        assert_eq!(decode(unpadded).unwrap(), roma());
    }

    #[test]
    fn test_share_url_replaces_existing_fragment() {
        let url = share_url("https://tripcraft.app/#trips", &roma()).unwrap();
        assert!(url.starts_with("https://tripcraft.app/#trip="));
        assert_eq!(url.matches('#').count(), 1);
    }

    #[test]
    fn test_consume_clears_fragment_on_success() {
        let url = share_url("https://tripcraft.app/", &roma()).unwrap();
        let consumed = consume_share_fragment(&url);

        assert_eq!(consumed.cleaned_url, "https://tripcraft.app/");
        assert_eq!(consumed.outcome.unwrap().unwrap(), roma());
    }

    #[test]
    fn test_consume_clears_fragment_on_failure() {
        let consumed = consume_share_fragment("https://tripcraft.app/#trip=%%%");
        assert_eq!(consumed.cleaned_url, "https://tripcraft.app/");
        assert!(matches!(
            consumed.outcome,
            Some(Err(ShareError::MalformedShareLink(_)))
        ));
    }

    #[test]
    fn test_consume_ignores_other_fragments() {
        let consumed = consume_share_fragment("https://tripcraft.app/#budget");
        assert_eq!(consumed.cleaned_url, "https://tripcraft.app/#budget");
        assert!(consumed.outcome.is_none());

        let consumed = consume_share_fragment("https://tripcraft.app/");
        assert!(consumed.outcome.is_none());
    }

    #[test]
    fn test_qr_code_url_escapes_link() {
        let qr = qr_code_url("https://tripcraft.app/#trip=abc%3D");
        assert!(qr.starts_with(QR_CODE_ENDPOINT));
        assert!(qr.ends_with("https%3A%2F%2Ftripcraft.app%2F%23trip%3Dabc%253D"));
    }
}
