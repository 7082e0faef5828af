use serde::Serialize;

use crate::models::Record;

/// Summary numbers over every reading in a record collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Mean of all pooled readings, rounded to one decimal place.
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// Count of records, not of readings.
    pub total_records: usize,
}

/// Pool every provided reading across all four fields of every record and
/// derive summary statistics.
///
/// Returns `None` when there are no records, or when no record carries a
/// single reading. Values that fail to parse are excluded rather than
/// aborting the aggregation.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(records: &[Record]) -> Option<Stats> {
    if records.is_empty() {
        return None;
    }

    let readings: Vec<f64> = records
        .iter()
        .flat_map(Record::readings)
        .filter(|value| !value.trim().is_empty())
        .filter_map(|value| value.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .collect();

    if readings.is_empty() {
        return None;
    }

    let sum: f64 = readings.iter().sum();
    let mut min = readings[0];
    let mut max = readings[0];
    for &reading in &readings[1..] {
        min = min.min(reading);
        max = max.max(reading);
    }

    Some(Stats {
        average: (sum / readings.len() as f64 * 10.0).round() / 10.0,
        min,
        max,
        total_records: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordDraft;

    fn record(date: &str, readings: [&str; 4]) -> Record {
        RecordDraft {
            date: date.to_string(),
            before_breakfast: readings[0].to_string(),
            after_breakfast: readings[1].to_string(),
            after_lunch: readings[2].to_string(),
            after_dinner: readings[3].to_string(),
            ..RecordDraft::default()
        }
        .into_record(
            format!("id-{date}"),
            "u1".to_string(),
            "2024-01-01T00:00:00Z".to_string(),
        )
    }

    #[test]
    fn test_summary_pools_readings_across_records() {
        let records = vec![
            record("2024-01-03", ["90", "110", "", ""]),
            record("2024-01-02", ["", "", "200", ""]),
            record("2024-01-01", ["", "", "", ""]),
        ];
        let stats = summarize(&records).unwrap();
        // (90 + 110 + 200) / 3 = 133.33…, reported to one decimal place.
        assert!((stats.average - 133.3).abs() < f64::EPSILON);
        assert!((stats.min - 90.0).abs() < f64::EPSILON);
        assert!((stats.max - 200.0).abs() < f64::EPSILON);
        assert_eq!(stats.total_records, 3);
    }

    #[test]
    fn test_empty_collection_has_no_stats() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_all_readings_empty_has_no_stats() {
        let records = vec![
            record("2024-01-02", ["", "", "", ""]),
            record("2024-01-01", ["", "", "", ""]),
        ];
        assert!(summarize(&records).is_none());
    }

    #[test]
    fn test_unparseable_reading_is_excluded() {
        let records = vec![record("2024-01-01", ["90", "not-a-number", "", ""])];
        let stats = summarize(&records).unwrap();
        assert!((stats.average - 90.0).abs() < f64::EPSILON);
        assert!((stats.min - 90.0).abs() < f64::EPSILON);
        assert!((stats.max - 90.0).abs() < f64::EPSILON);
        assert_eq!(stats.total_records, 1);
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        // (100 + 101 + 101) / 3 = 100.66… -> 100.7
        let records = vec![record("2024-01-01", ["100", "101", "101", ""])];
        let stats = summarize(&records).unwrap();
        assert!((stats.average - 100.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_single_reading() {
        let records = vec![record("2024-01-01", ["", "", "", "118"])];
        let stats = summarize(&records).unwrap();
        assert!((stats.average - 118.0).abs() < f64::EPSILON);
        assert!((stats.min - 118.0).abs() < f64::EPSILON);
        assert!((stats.max - 118.0).abs() < f64::EPSILON);
        assert_eq!(stats.total_records, 1);
    }
}
