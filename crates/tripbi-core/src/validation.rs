use chrono::{DateTime, Utc};
use thiserror::Error;

pub const MAX_TRIP_MEMBERS: usize = 15;
pub const MAX_PROPOSALS_PER_TRIP: usize = 100;

/// Proof-of-purchase uploads: 5 MB cap, image or PDF only.
pub const MAX_PROOF_SIZE_BYTES: u64 = 5 * 1024 * 1024;
pub const ALLOWED_PROOF_TYPES: &[&str] =
    &["image/jpeg", "image/png", "image/webp", "application/pdf"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProofRejection {
    #[error("file is too large ({size} bytes, max {MAX_PROOF_SIZE_BYTES})")]
    TooLarge { size: u64 },
    #[error("unsupported file type: {content_type}")]
    UnsupportedType { content_type: String },
}

/// Validate a proof-of-purchase upload before any bytes touch storage.
pub fn check_proof_upload(content_type: &str, size: u64) -> Result<(), ProofRejection> {
    if !ALLOWED_PROOF_TYPES.contains(&content_type) {
        return Err(ProofRejection::UnsupportedType {
            content_type: content_type.to_string(),
        });
    }
    if size > MAX_PROOF_SIZE_BYTES {
        return Err(ProofRejection::TooLarge { size });
    }
    Ok(())
}

/// Minimal structural email check: one `@` with a dotted domain after it.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !local.contains(char::is_whitespace)
        && !domain.contains(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

pub fn is_not_empty(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Strict `HH:MM`, zero-padded, so stored times compare lexicographically.
pub fn is_valid_time_of_day(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    if ![0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit()) {
        return false;
    }
    let hour = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
    let minute = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
    hour < 24 && minute < 60
}

pub fn is_end_after_start(start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    end > start
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_proof_size_boundary() {
        // 4 MB passes, 6 MB is rejected before upload
        assert!(check_proof_upload("image/png", 4 * 1024 * 1024).is_ok());
        assert_eq!(
            check_proof_upload("image/png", 6 * 1024 * 1024),
            Err(ProofRejection::TooLarge { size: 6 * 1024 * 1024 })
        );
        assert!(check_proof_upload("application/pdf", MAX_PROOF_SIZE_BYTES).is_ok());
    }

    #[test]
    fn test_proof_type_allowlist() {
        assert!(check_proof_upload("image/webp", 1024).is_ok());
        assert_eq!(
            check_proof_upload("image/gif", 1024),
            Err(ProofRejection::UnsupportedType { content_type: "image/gif".into() })
        );
        assert!(check_proof_upload("text/html", 1024).is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana@exa mple.com"));
        assert!(!is_valid_email("ana@example..com"));
    }

    #[test]
    fn test_date_ordering() {
        let start = Utc::now();
        assert!(is_end_after_start(start, start + Duration::days(3)));
        assert!(!is_end_after_start(start, start));
        assert!(!is_end_after_start(start, start - Duration::days(1)));
    }

    #[test]
    fn test_time_of_day_shape() {
        assert!(is_valid_time_of_day("09:30"));
        assert!(is_valid_time_of_day("00:00"));
        assert!(is_valid_time_of_day("23:59"));
        assert!(!is_valid_time_of_day("9:30"));
        assert!(!is_valid_time_of_day("24:00"));
        assert!(!is_valid_time_of_day("12:60"));
        assert!(!is_valid_time_of_day("noon"));
        assert!(!is_valid_time_of_day("12-30"));
    }

    #[test]
    fn test_not_empty() {
        assert!(is_not_empty("Tokyo"));
        assert!(!is_not_empty("   "));
    }
}
