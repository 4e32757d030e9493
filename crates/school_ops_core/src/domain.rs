//! crates/school_ops_core/src/domain.rs
//!
//! Defines the core data structures for the console.
//! Records are owned by the external document store; the core only reads them
//! (or, for drafts, hands them to the store to persist).

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A student or staff member as delivered by the roster subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterMember {
    pub id: String,
    pub name: String,
    /// Class or period assignment code, e.g. `1A` or `Berçario`.
    pub class_code: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Entry,
    Exit,
}

/// A single already-resolved entry/exit record. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub class_code: String,
    /// Epoch milliseconds.
    pub timestamp_ms: i64,
    /// Legacy records carry no kind at all.
    pub kind: Option<EventKind>,
    /// Partition key, `YYYY-MM-DD`.
    pub day: String,
}

impl AttendanceEvent {
    /// An unsaved event for `member`. The partition day is the UTC calendar day of
    /// `timestamp_ms` unless one is given.
    ///
    /// Fails when `timestamp_ms` lies outside the representable calendar.
    pub fn for_member(
        member: &RosterMember,
        kind: EventKind,
        timestamp_ms: i64,
        day: Option<String>,
    ) -> Result<Self, ValidationError> {
        let at = chrono::DateTime::from_timestamp_millis(timestamp_ms).ok_or_else(|| {
            ValidationError::InvalidField {
                field: "timestamp_ms",
                value: timestamp_ms.to_string(),
            }
        })?;
        let day = day.unwrap_or_else(|| at.format("%Y-%m-%d").to_string());
        Ok(Self {
            id: String::new(),
            subject_id: member.id.clone(),
            subject_name: member.name.clone(),
            class_code: member.class_code.clone(),
            timestamp_ms,
            kind: Some(kind),
            day,
        })
    }

    /// Whether this event marks its subject as present.
    ///
    /// A missing kind counts as an entry: legacy records were written before the
    /// kind tag existed and every one of them was a check-in.
    pub fn counts_as_entry(&self) -> bool {
        !matches!(self.kind, Some(EventKind::Exit))
    }
}

/// Shift label attached to an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    Morning,
    Afternoon,
    #[serde(rename = "Off-shift")]
    OffShift,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Morning => "Morning",
            Period::Afternoon => "Afternoon",
            Period::OffShift => "Off-shift",
        }
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Morning" => Ok(Period::Morning),
            "Afternoon" => Ok(Period::Afternoon),
            "Off-shift" => Ok(Period::OffShift),
            other => Err(format!("unknown period '{}'", other)),
        }
    }
}

/// A specialist appointment.
///
/// `id` is empty until the store persists the record and assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub subject_id: String,
    pub subject_name: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// Zero-padded 24-hour `HH:MM`.
    pub time: String,
    pub period: Period,
    pub description: String,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl Appointment {
    pub fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }
}

/// The creation form's contents before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentDraft {
    pub subject_id: String,
    pub subject_name: String,
    pub date: String,
    pub time: String,
    pub period: Period,
    #[serde(default)]
    pub description: String,
}

impl AppointmentDraft {
    pub(crate) fn into_unsaved(self, created_at: i64) -> Appointment {
        Appointment {
            id: String::new(),
            subject_id: self.subject_id.trim().to_string(),
            subject_name: self.subject_name.trim().to_string(),
            date: self.date.trim().to_string(),
            time: self.time.trim().to_string(),
            period: self.period,
            description: self.description,
            created_at,
        }
    }
}

/// A special-education (AEE) enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AeeEnrollment {
    /// Empty until persisted.
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub class_code: String,
    pub support_need: String,
    pub specialist: Option<String>,
    pub notes: String,
    /// Epoch milliseconds.
    pub enrolled_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentDraft {
    pub student_id: String,
    pub student_name: String,
    pub class_code: String,
    pub support_need: String,
    #[serde(default)]
    pub specialist: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl EnrollmentDraft {
    pub(crate) fn into_unsaved(self, enrolled_at: i64) -> AeeEnrollment {
        AeeEnrollment {
            id: String::new(),
            student_id: self.student_id.trim().to_string(),
            student_name: self.student_name.trim().to_string(),
            class_code: self.class_code.trim().to_string(),
            support_need: self.support_need.trim().to_string(),
            specialist: self
                .specialist
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            notes: self.notes,
            enrolled_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: Option<EventKind>) -> AttendanceEvent {
        AttendanceEvent {
            id: "e1".to_string(),
            subject_id: "s1".to_string(),
            subject_name: "Ana".to_string(),
            class_code: "1A".to_string(),
            timestamp_ms: 0,
            kind,
            day: "2024-03-01".to_string(),
        }
    }

    #[test]
    fn legacy_event_without_kind_counts_as_entry() {
        assert!(event(None).counts_as_entry());
        assert!(event(Some(EventKind::Entry)).counts_as_entry());
        assert!(!event(Some(EventKind::Exit)).counts_as_entry());
    }

    #[test]
    fn event_for_member_derives_utc_day() {
        let member = RosterMember {
            id: "s1".to_string(),
            name: "Ana".to_string(),
            class_code: "1A".to_string(),
            photo_url: None,
        };
        // 2024-03-01T23:30:00Z
        let ev = AttendanceEvent::for_member(&member, EventKind::Entry, 1_709_335_800_000, None)
            .unwrap();
        assert_eq!(ev.day, "2024-03-01");
        assert_eq!(ev.subject_name, "Ana");
        assert!(ev.id.is_empty());

        let given = AttendanceEvent::for_member(
            &member,
            EventKind::Exit,
            1_709_335_800_000,
            Some("2024-03-02".to_string()),
        )
        .unwrap();
        assert_eq!(given.day, "2024-03-02");

        let err = AttendanceEvent::for_member(&member, EventKind::Entry, i64::MAX, None)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidField {
                field: "timestamp_ms",
                value: i64::MAX.to_string()
            }
        );
        // A given day does not excuse an unrepresentable timestamp.
        assert!(AttendanceEvent::for_member(
            &member,
            EventKind::Entry,
            i64::MIN,
            Some("2024-03-02".to_string())
        )
        .is_err());
    }

    #[test]
    fn period_uses_display_labels_on_the_wire() {
        let json = serde_json::to_string(&Period::OffShift).unwrap();
        assert_eq!(json, "\"Off-shift\"");
        let parsed: Period = serde_json::from_str("\"Morning\"").unwrap();
        assert_eq!(parsed, Period::Morning);
        assert_eq!("Afternoon".parse::<Period>().unwrap(), Period::Afternoon);
        assert!("Night".parse::<Period>().is_err());
    }

    #[test]
    fn legacy_event_json_without_kind_deserializes() {
        let raw = r#"{"id":"e9","subject_id":"s2","subject_name":"Bia","class_code":"2B",
            "timestamp_ms":1709290800000,"kind":null,"day":"2024-03-01"}"#;
        let parsed: AttendanceEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.kind, None);
        assert!(parsed.counts_as_entry());
    }

    #[test]
    fn draft_becomes_unsaved_appointment_with_empty_id() {
        let draft = AppointmentDraft {
            subject_id: " s1 ".to_string(),
            subject_name: "Ana".to_string(),
            date: "2024-03-01".to_string(),
            time: "08:00".to_string(),
            period: Period::Morning,
            description: "Speech therapy".to_string(),
        };
        let appt = draft.into_unsaved(42);
        assert_eq!(appt.id, "");
        assert!(!appt.is_persisted());
        assert_eq!(appt.subject_id, "s1");
        assert_eq!(appt.created_at, 42);
    }
}
