//! Attendance record data models.
//!
//! The wire shape (camelCase, RFC 3339 timestamps) is shared by the persisted
//! JSON document, the remote sync service, and the frontend payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One device location fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Location as persisted inside a record: the raw fix plus the resolved
/// address. The address is optional on the wire for compatibility, but a
/// record never reaches storage without one (address resolution failure
/// aborts the submission).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationStamp {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl LocationStamp {
    pub fn new(point: GeoPoint, address: String) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            address: Some(address),
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// One completed check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub employee_id: String,
    pub check_in_time: DateTime<Utc>,
    pub location: LocationStamp,
    /// Inline `data:image/jpeg;base64,…` payload (local backend) or an
    /// `https://…` URL (remote backend).
    pub image_data_url: String,
}

impl AttendanceRecord {
    pub fn new(
        employee_id: String,
        check_in_time: DateTime<Utc>,
        location: LocationStamp,
        image_data_url: String,
    ) -> Self {
        Self {
            id: record_id(check_in_time),
            employee_id,
            check_in_time,
            location,
            image_data_url,
        }
    }

    /// Whether the image payload still lives inline in the record (as opposed
    /// to an already-uploaded URL).
    pub fn has_inline_image(&self) -> bool {
        self.image_data_url.starts_with("data:")
    }
}

/// Record ids derive from the capture instant (millisecond precision) with a
/// short random suffix, so two captures in the same millisecond or a
/// backwards clock step still yield distinct ids.
pub fn record_id(check_in_time: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", check_in_time.timestamp_millis(), &suffix[..8])
}

/// Sort check-in time descending (newest first), the order the collection is
/// always materialized in.
pub fn sort_newest_first(records: &mut [AttendanceRecord]) {
    records.sort_by(|a, b| b.check_in_time.cmp(&a.check_in_time));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record_at(id: &str, employee_id: &str, time: DateTime<Utc>) -> AttendanceRecord {
        AttendanceRecord {
            id: id.to_string(),
            employee_id: employee_id.to_string(),
            check_in_time: time,
            location: LocationStamp {
                latitude: 37.422,
                longitude: -122.0841,
                address: Some("1600 Amphitheatre Parkway, Mountain View, CA, USA".to_string()),
            },
            image_data_url: "data:image/jpeg;base64,AAAA".to_string(),
        }
    }

    #[test]
    fn wire_shape_matches_the_original_collection_format() {
        let time = Utc.with_ymd_and_hms(2024, 6, 15, 8, 30, 0).unwrap();
        let record = record_at("1718440200000-ab12cd34", "EMP42", time);

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            "{\"id\":\"1718440200000-ab12cd34\",\"employeeId\":\"EMP42\",\
             \"checkInTime\":\"2024-06-15T08:30:00Z\",\
             \"location\":{\"latitude\":37.422,\"longitude\":-122.0841,\
             \"address\":\"1600 Amphitheatre Parkway, Mountain View, CA, USA\"},\
             \"imageDataUrl\":\"data:image/jpeg;base64,AAAA\"}"
        );
    }

    #[test]
    fn parses_records_written_with_millisecond_timestamps() {
        // JSON.stringify(new Date()) emits ".000Z"-style timestamps.
        let json = r#"{
            "id": "1718440200000",
            "employeeId": "E1",
            "checkInTime": "2024-06-15T08:30:00.000Z",
            "location": { "latitude": 1.0, "longitude": 2.0 },
            "imageDataUrl": "data:image/jpeg;base64,AAAA"
        }"#;

        let record: AttendanceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.employee_id, "E1");
        assert_eq!(record.location.address, None);
        assert_eq!(
            record.check_in_time,
            Utc.with_ymd_and_hms(2024, 6, 15, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn record_ids_are_unique_within_one_instant() {
        let time = Utc.with_ymd_and_hms(2024, 6, 15, 8, 30, 0).unwrap();
        let a = record_id(time);
        let b = record_id(time);

        assert!(a.starts_with("1718440200000-"));
        assert_ne!(a, b);
    }

    #[test]
    fn sorts_newest_first() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 6, 18, 0, 0, 0).unwrap();

        let mut records = vec![
            record_at("a", "E1", t1),
            record_at("b", "E2", t0),
            record_at("c", "E3", t2),
        ];
        sort_newest_first(&mut records);

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn inline_image_detection() {
        let time = Utc.with_ymd_and_hms(2024, 6, 15, 8, 30, 0).unwrap();
        let mut record = record_at("a", "E1", time);
        assert!(record.has_inline_image());

        record.image_data_url = "https://cdn.example.com/a.jpg".to_string();
        assert!(!record.has_inline_image());
    }
}
