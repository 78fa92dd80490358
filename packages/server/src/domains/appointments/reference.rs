//! Booking reference and QR payload generation.

use chrono::Utc;
use uuid::Uuid;

use crate::common::AppointmentId;

const REFERENCE_PREFIX: &str = "SL";
const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REFERENCE_SUFFIX_LEN: usize = 6;

/// Generate a booking reference: `SL<yyyymmdd><6 random A-Z0-9>`.
///
/// Uniqueness is enforced by the database; a collision surfaces as a
/// retryable conflict.
pub fn generate_booking_reference() -> String {
    let date = Utc::now().format("%Y%m%d");
    let entropy = Uuid::new_v4();
    let suffix: String = entropy
        .as_bytes()
        .iter()
        .take(REFERENCE_SUFFIX_LEN)
        .map(|b| REFERENCE_ALPHABET[usize::from(*b) % REFERENCE_ALPHABET.len()] as char)
        .collect();

    format!("{REFERENCE_PREFIX}{date}{suffix}")
}

/// QR payload embedded in the appointment record. Image rendering is the
/// API layer's concern.
pub fn generate_qr_payload(booking_reference: &str, appointment_id: AppointmentId) -> String {
    format!("SL-GOV-{booking_reference}-{appointment_id}")
}
