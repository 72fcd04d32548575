pub mod record;

pub use record::{AttendanceRecord, GeoPoint, LocationStamp};
