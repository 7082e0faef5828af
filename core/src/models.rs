use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lowest reading value the diary accepts, in mg/dL.
pub const READING_MIN: f64 = 0.0;
/// Highest reading value the diary accepts, in mg/dL.
pub const READING_MAX: f64 = 1000.0;

/// Export envelope format version.
pub const EXPORT_VERSION: i64 = 1;

/// One day's glucose-diary entry as stored in the remote collection.
///
/// All reading and meal fields are strings on the wire: empty string means
/// "not provided", keys are never absent. `updated_at` stays empty until the
/// record is first updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub before_breakfast: String,
    pub after_breakfast: String,
    pub after_lunch: String,
    pub after_dinner: String,
    pub breakfast_meal: String,
    pub lunch_meal: String,
    pub dinner_meal: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Record {
    /// The four readings in form order. Empty strings are "not provided".
    #[must_use]
    pub fn readings(&self) -> [&str; 4] {
        [
            &self.before_breakfast,
            &self.after_breakfast,
            &self.after_lunch,
            &self.after_dinner,
        ]
    }
}

/// Caller-supplied form data for creating or updating a [`Record`].
///
/// Identity and timestamps are never set by the caller; the store adapter
/// assigns them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    pub date: String,
    #[serde(default)]
    pub before_breakfast: String,
    #[serde(default)]
    pub after_breakfast: String,
    #[serde(default)]
    pub after_lunch: String,
    #[serde(default)]
    pub after_dinner: String,
    #[serde(default)]
    pub breakfast_meal: String,
    #[serde(default)]
    pub lunch_meal: String,
    #[serde(default)]
    pub dinner_meal: String,
}

impl RecordDraft {
    /// Copy with every field trimmed.
    #[must_use]
    pub fn cleaned(&self) -> Self {
        Self {
            date: self.date.trim().to_string(),
            before_breakfast: self.before_breakfast.trim().to_string(),
            after_breakfast: self.after_breakfast.trim().to_string(),
            after_lunch: self.after_lunch.trim().to_string(),
            after_dinner: self.after_dinner.trim().to_string(),
            breakfast_meal: self.breakfast_meal.trim().to_string(),
            lunch_meal: self.lunch_meal.trim().to_string(),
            dinner_meal: self.dinner_meal.trim().to_string(),
        }
    }

    /// The four readings paired with their wire field names.
    #[must_use]
    pub fn readings(&self) -> [(&'static str, &str); 4] {
        [
            ("beforeBreakfast", self.before_breakfast.as_str()),
            ("afterBreakfast", self.after_breakfast.as_str()),
            ("afterLunch", self.after_lunch.as_str()),
            ("afterDinner", self.after_dinner.as_str()),
        ]
    }

    /// Check the draft against the diary's record rules: a parseable
    /// `YYYY-MM-DD` date, at least one reading, and every provided reading a
    /// number in `[0, 1000]`.
    ///
    /// Errors are keyed per field; the missing-readings failure uses the
    /// synthetic `readings` key and is only raised when no reading is
    /// provided at all.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();

        let date = self.date.trim();
        if date.is_empty() {
            errors.push("date", "Date is required");
        } else if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            errors.push("date", "Date must be YYYY-MM-DD");
        }

        let has_reading = self
            .readings()
            .iter()
            .any(|(_, value)| !value.trim().is_empty());
        if !has_reading {
            errors.push("readings", "At least one blood sugar reading is required");
        }

        for (field, value) in self.readings() {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match value.parse::<f64>() {
                Ok(n) if n.is_finite() && (READING_MIN..=READING_MAX).contains(&n) => {}
                _ => errors.push(field, "Must be a valid number between 0 and 1000"),
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Materialize a stored record from this draft plus store-assigned
    /// identity and creation time.
    #[must_use]
    pub fn into_record(self, id: String, user_id: String, created_at: String) -> Record {
        Record {
            id,
            user_id,
            date: self.date,
            before_breakfast: self.before_breakfast,
            after_breakfast: self.after_breakfast,
            after_lunch: self.after_lunch,
            after_dinner: self.after_dinner,
            breakfast_meal: self.breakfast_meal,
            lunch_meal: self.lunch_meal,
            dinner_meal: self.dinner_meal,
            created_at,
            updated_at: String::new(),
        }
    }
}

/// The signed-in identity handed over by the session boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
}

/// Where a single reading falls against the 70–140 mg/dL target range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadingLevel {
    Low,
    InRange,
    High,
}

/// Classify one reading value; `None` for empty or unparseable input.
#[must_use]
pub fn reading_level(value: &str) -> Option<ReadingLevel> {
    let n: f64 = value.trim().parse().ok()?;
    if !n.is_finite() {
        return None;
    }
    Some(if n < 70.0 {
        ReadingLevel::Low
    } else if n <= 140.0 {
        ReadingLevel::InRange
    } else {
        ReadingLevel::High
    })
}

// --- Export types ---

/// Versioned envelope for handing a user's records to print/backup
/// pipelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub version: i64,
    pub exported_at: String,
    pub user_id: String,
    pub records: Vec<Record>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_draft() -> RecordDraft {
        RecordDraft {
            date: "2024-06-15".to_string(),
            before_breakfast: "95".to_string(),
            after_lunch: "120".to_string(),
            breakfast_meal: "Oatmeal".to_string(),
            ..RecordDraft::default()
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(valid_draft().validate().is_ok());
    }

    #[test]
    fn test_missing_date() {
        let mut draft = valid_draft();
        draft.date = String::new();
        let err = draft.validate().unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.field("date"), Some("Date is required"));
    }

    #[test]
    fn test_malformed_date() {
        let mut draft = valid_draft();
        draft.date = "15/06/2024".to_string();
        let err = draft.validate().unwrap_err();
        assert_eq!(err.field("date"), Some("Date must be YYYY-MM-DD"));
    }

    #[test]
    fn test_no_readings_raises_only_readings_error() {
        let draft = RecordDraft {
            date: "2024-06-15".to_string(),
            dinner_meal: "Chicken, rice".to_string(),
            ..RecordDraft::default()
        };
        let err = draft.validate().unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.field("readings").is_some());
    }

    #[test]
    fn test_one_bad_reading_flags_exactly_that_field() {
        let draft = RecordDraft {
            date: "2024-06-15".to_string(),
            before_breakfast: "95".to_string(),
            after_breakfast: "110".to_string(),
            after_lunch: "abc".to_string(),
            after_dinner: "130".to_string(),
            ..RecordDraft::default()
        };
        let err = draft.validate().unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.field("afterLunch").is_some());
        // Three valid readings exist, so the collection-level error stays off.
        assert!(err.field("readings").is_none());
    }

    #[test]
    fn test_reading_out_of_range() {
        for bad in ["-1", "1000.5", "1e9"] {
            let mut draft = valid_draft();
            draft.before_breakfast = bad.to_string();
            let err = draft.validate().unwrap_err();
            assert!(err.field("beforeBreakfast").is_some(), "accepted {bad}");
        }
    }

    #[test]
    fn test_reading_boundaries_accepted() {
        for ok in ["0", "1000", "99.5"] {
            let mut draft = valid_draft();
            draft.before_breakfast = ok.to_string();
            assert!(draft.validate().is_ok(), "rejected {ok}");
        }
    }

    #[test]
    fn test_nan_reading_rejected() {
        let mut draft = valid_draft();
        draft.before_breakfast = "NaN".to_string();
        let err = draft.validate().unwrap_err();
        assert!(err.field("beforeBreakfast").is_some());
    }

    #[test]
    fn test_whitespace_only_reading_is_not_provided() {
        let draft = RecordDraft {
            date: "2024-06-15".to_string(),
            before_breakfast: "   ".to_string(),
            ..RecordDraft::default()
        };
        let err = draft.validate().unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.field("readings").is_some());
    }

    #[test]
    fn test_cleaned_trims_every_field() {
        let draft = RecordDraft {
            date: " 2024-06-15 ".to_string(),
            before_breakfast: " 95 ".to_string(),
            breakfast_meal: "  Oatmeal ".to_string(),
            ..RecordDraft::default()
        };
        let cleaned = draft.cleaned();
        assert_eq!(cleaned.date, "2024-06-15");
        assert_eq!(cleaned.before_breakfast, "95");
        assert_eq!(cleaned.breakfast_meal, "Oatmeal");
    }

    #[test]
    fn test_record_wire_shape_is_camel_case() {
        let record = valid_draft().into_record(
            "r1".to_string(),
            "u1".to_string(),
            "2024-06-15T08:00:00Z".to_string(),
        );
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "id",
            "userId",
            "date",
            "beforeBreakfast",
            "afterBreakfast",
            "afterLunch",
            "afterDinner",
            "breakfastMeal",
            "lunchMeal",
            "dinnerMeal",
            "createdAt",
            "updatedAt",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        // Not-provided fields serialize as empty strings, never absent keys.
        assert_eq!(object["afterDinner"], "");
        assert_eq!(object["updatedAt"], "");
    }

    #[test]
    fn test_record_tolerates_missing_updated_at() {
        let record: Record = serde_json::from_value(serde_json::json!({
            "id": "r1",
            "userId": "u1",
            "date": "2024-06-15",
            "beforeBreakfast": "95",
            "afterBreakfast": "",
            "afterLunch": "",
            "afterDinner": "",
            "breakfastMeal": "",
            "lunchMeal": "",
            "dinnerMeal": "",
            "createdAt": "2024-06-15T08:00:00Z"
        }))
        .unwrap();
        assert_eq!(record.updated_at, "");
    }

    #[test]
    fn test_reading_level_boundaries() {
        assert_eq!(reading_level("69"), Some(ReadingLevel::Low));
        assert_eq!(reading_level("70"), Some(ReadingLevel::InRange));
        assert_eq!(reading_level("140"), Some(ReadingLevel::InRange));
        assert_eq!(reading_level("141"), Some(ReadingLevel::High));
    }

    #[test]
    fn test_reading_level_unparseable() {
        assert!(reading_level("").is_none());
        assert!(reading_level("high").is_none());
    }
}
