//! Certificate records, serial numbers and form submission.

use chrono::{Datelike, Local, NaiveDate};
use rand::Rng;

use crate::error::{CertError, FieldError, FormField, Result};
use crate::roster::Roster;

/// Prefix of every certificate serial number.
pub const DEFAULT_ID_PREFIX: &str = "AIS";

/// Message shown when the participant is not on the roster.
pub const UNREGISTERED_MESSAGE: &str =
    "Your name was not found because you haven't filled the registration form.";

/// The data printed on one certificate. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    participant_name: String,
    event_name: String,
    event_date: String,
    certificate_id: String,
}

impl CertificateRecord {
    /// Build a record from already-validated parts. Names are trimmed.
    pub fn new(
        participant_name: &str,
        event_name: &str,
        event_date: &str,
        certificate_id: String,
    ) -> Self {
        Self {
            participant_name: participant_name.trim().to_string(),
            event_name: event_name.trim().to_string(),
            event_date: event_date.to_string(),
            certificate_id,
        }
    }

    pub fn participant_name(&self) -> &str {
        &self.participant_name
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Long-form display date, e.g. `January 15, 2025`.
    pub fn event_date(&self) -> &str {
        &self.event_date
    }

    pub fn certificate_id(&self) -> &str {
        &self.certificate_id
    }
}

/// Raw form input, before validation.
#[derive(Debug, Clone, Default)]
pub struct CertificateForm {
    pub participant_name: String,
    pub event_name: String,
    /// ISO `YYYY-MM-DD`. `None` means today.
    pub event_date: Option<String>,
}

impl CertificateForm {
    pub fn new(participant_name: &str, event_name: &str) -> Self {
        Self {
            participant_name: participant_name.to_string(),
            event_name: event_name.to_string(),
            event_date: None,
        }
    }

    pub fn with_date(mut self, iso_date: &str) -> Self {
        self.event_date = Some(iso_date.to_string());
        self
    }

    /// Validate the form and assemble a record.
    ///
    /// Required fields are checked first; the roster check only runs once
    /// every field is present.
    pub fn submit(&self, roster: &Roster, id_prefix: &str) -> Result<CertificateRecord> {
        let name = self.participant_name.trim();
        let event = self.event_name.trim();
        let iso = match &self.event_date {
            Some(d) => d.trim().to_string(),
            None => today_iso(),
        };

        let mut errors = Vec::new();
        if name.is_empty() {
            errors.push(FieldError::required(FormField::ParticipantName));
        }
        if event.is_empty() {
            errors.push(FieldError::required(FormField::EventName));
        }
        let event_date = if iso.is_empty() {
            errors.push(FieldError::required(FormField::EventDate));
            None
        } else {
            match format_event_date(&iso) {
                Some(d) => Some(d),
                None => {
                    errors.push(FieldError {
                        field: FormField::EventDate,
                        message: format!("Date must be in YYYY-MM-DD format, got {iso:?}"),
                    });
                    None
                }
            }
        };

        if !errors.is_empty() {
            return Err(CertError::Form(errors));
        }

        if !roster.is_valid(name) {
            return Err(CertError::Form(vec![FieldError {
                field: FormField::ParticipantName,
                message: UNREGISTERED_MESSAGE.to_string(),
            }]));
        }

        Ok(CertificateRecord::new(
            name,
            event,
            &event_date.unwrap_or_default(),
            generate_certificate_id(id_prefix),
        ))
    }
}

/// Today's local date as `YYYY-MM-DD`.
pub fn today_iso() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Format an ISO date as `January 15, 2025`. Returns `None` if unparseable.
pub fn format_event_date(iso: &str) -> Option<String> {
    NaiveDate::parse_from_str(iso.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%B %-d, %Y").to_string())
}

/// Serial number `PREFIX/YYYY/MMDD/NNNN` for today's date.
///
/// `NNNN` is random, so two certificates issued on the same day can collide.
/// Collisions are not detected.
pub fn generate_certificate_id(prefix: &str) -> String {
    generate_certificate_id_at(prefix, Local::now().date_naive(), &mut rand::thread_rng())
}

pub fn generate_certificate_id_at<R: Rng + ?Sized>(
    prefix: &str,
    date: NaiveDate,
    rng: &mut R,
) -> String {
    let serial: u16 = rng.gen_range(1000..=9999);
    format!(
        "{prefix}/{:04}/{:02}{:02}/{serial}",
        date.year(),
        date.month(),
        date.day()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn is_id_shape(id: &str, prefix: &str) -> bool {
        let parts: Vec<&str> = id.split('/').collect();
        parts.len() == 4
            && parts[0] == prefix
            && parts[1..]
                .iter()
                .all(|p| p.len() == 4 && p.chars().all(|c| c.is_ascii_digit()))
    }

    #[test]
    fn id_has_expected_shape_and_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let id = generate_certificate_id_at("AIS", date, &mut rng);
            assert!(is_id_shape(&id, "AIS"), "bad id {id}");
            assert!(id.starts_with("AIS/2025/0105/"));
            let n: u16 = id[14..].parse().unwrap();
            assert!((1000..=9999).contains(&n));
        }
    }

    #[test]
    fn id_uses_current_date() {
        let before = Local::now().date_naive();
        let id = generate_certificate_id("AIS");
        let after = Local::now().date_naive();
        assert!(is_id_shape(&id, "AIS"));
        let expected = |d: NaiveDate| format!("AIS/{}/", d.format("%Y/%m%d"));
        assert!(id.starts_with(&expected(before)) || id.starts_with(&expected(after)));
    }

    #[test]
    fn long_form_date() {
        assert_eq!(format_event_date("2025-01-15").as_deref(), Some("January 15, 2025"));
        assert_eq!(format_event_date("2024-12-01").as_deref(), Some("December 1, 2024"));
        assert_eq!(format_event_date("15/01/2025"), None);
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let form = CertificateForm::new("  ", "").with_date("");
        let err = form.submit(&Roster::default(), "AIS").unwrap_err();
        match err {
            CertError::Form(fields) => {
                let msgs: Vec<_> = fields.iter().map(|f| f.message.as_str()).collect();
                assert_eq!(
                    msgs,
                    ["Participant Name is required", "Event Name is required", "Date is required"]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unregistered_name_is_rejected() {
        let roster = Roster::new(["john smith"]);
        let form = CertificateForm::new("Mallory", "AI Day").with_date("2025-01-15");
        match form.submit(&roster, "AIS") {
            Err(CertError::Form(fields)) => {
                assert_eq!(fields[0].field, FormField::ParticipantName);
                assert_eq!(fields[0].message, UNREGISTERED_MESSAGE);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn submit_builds_trimmed_record() {
        let roster = Roster::new(["john smith"]);
        let form = CertificateForm::new("  John Smith ", " AI Day ").with_date("2025-01-15");
        let record = form.submit(&roster, "AIS").unwrap();
        assert_eq!(record.participant_name(), "John Smith");
        assert_eq!(record.event_name(), "AI Day");
        assert_eq!(record.event_date(), "January 15, 2025");
        assert!(is_id_shape(record.certificate_id(), "AIS"));
    }

    #[test]
    fn date_defaults_to_today() {
        let record = CertificateForm::new("Jane", "Expo")
            .submit(&Roster::default(), "AIS")
            .unwrap();
        let today = format_event_date(&today_iso()).unwrap();
        assert_eq!(record.event_date(), today);
    }
}
