use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::Status;

/// Width of the `changed_by` column.
pub const MAX_CHANGED_BY_LEN: usize = 100;

/// One row of a booking's status history. Rows are only ever inserted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: Uuid,
    pub booking_id: Uuid,
    /// `None` for the creation entry; written as an empty string.
    #[serde(
        serialize_with = "serialize_old_status",
        deserialize_with = "deserialize_old_status"
    )]
    pub old_status: Option<Status>,
    pub new_status: Status,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl StatusChange {
    pub fn new(
        booking_id: Uuid,
        old_status: Option<Status>,
        new_status: Status,
        changed_by: &str,
        notes: Option<String>,
        changed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            old_status,
            new_status,
            changed_by: changed_by.into(),
            changed_at,
            notes,
        }
    }

    pub fn old_status_name(&self) -> &'static str {
        self.old_status.map(|s| s.name()).unwrap_or("")
    }
}

fn serialize_old_status<S>(status: &Option<Status>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(status.map(|s| s.name()).unwrap_or(""))
}

fn deserialize_old_status<'de, D>(deserializer: D) -> Result<Option<Status>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;

    if s.is_empty() {
        return Ok(None);
    }

    s.parse::<Status>()
        .map(Some)
        .map_err(|err| serde::de::Error::custom(err.message))
}

#[test]
fn creation_entry_serializes_empty_old_status_test() {
    let change = StatusChange::new(
        Uuid::new_v4(),
        None,
        Status::Pending,
        "Customer",
        None,
        Utc::now(),
    );

    let value = serde_json::to_value(&change).unwrap();
    assert_eq!(value["old_status"], "");
    assert_eq!(value["new_status"], "pending");

    let back: StatusChange = serde_json::from_value(value).unwrap();
    assert_eq!(back, change);
    assert_eq!(back.old_status_name(), "");
}

#[test]
fn unknown_old_status_is_rejected_test() {
    let change = StatusChange::new(
        Uuid::new_v4(),
        Some(Status::Pending),
        Status::Confirmed,
        "admin1",
        None,
        Utc::now(),
    );

    let mut value = serde_json::to_value(&change).unwrap();
    assert_eq!(value["old_status"], "pending");

    value["old_status"] = serde_json::json!("bogus");
    assert!(serde_json::from_value::<StatusChange>(value).is_err());
}
