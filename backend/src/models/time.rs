//! Instants as Modified Julian Dates (UTC, days).

use serde::{Deserialize, Serialize};

/// JD = MJD + this.
pub const MJD_JD_OFFSET: f64 = 2_400_000.5;

const MJD_UNIX_EPOCH: f64 = 40587.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// An instant on the UTC time scale, in days since 1858-11-17T00:00Z.
///
/// Every instant the planner handles (window bounds, peak times, transit
/// epochs, element epochs) uses this type.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModifiedJulianDate(qtty::Days);

impl ModifiedJulianDate {
    pub fn new<V: Into<qtty::Days>>(v: V) -> Self {
        Self(v.into())
    }

    pub fn value(&self) -> f64 {
        self.0.value()
    }

    /// Julian Date for the same instant.
    pub fn julian_date(&self) -> f64 {
        self.value() + MJD_JD_OFFSET
    }

    pub fn from_julian_date(jd: f64) -> Self {
        Self::new(jd - MJD_JD_OFFSET)
    }

    /// Shift by a (possibly negative) number of days.
    pub fn add_days(&self, days: f64) -> Self {
        Self::new(self.value() + days)
    }

    /// Shift by a number of minutes.
    pub fn add_minutes(&self, minutes: f64) -> Self {
        self.add_days(minutes / 1440.0)
    }

    /// Signed difference `self - earlier` in days.
    pub fn days_since(&self, earlier: ModifiedJulianDate) -> qtty::Days {
        qtty::Days::new(self.value() - earlier.value())
    }

    /// Seconds since the Unix epoch.
    pub fn to_unix_timestamp(&self) -> f64 {
        (self.value() - MJD_UNIX_EPOCH) * SECONDS_PER_DAY
    }

    pub fn from_unix_timestamp(timestamp: f64) -> Self {
        Self::new(MJD_UNIX_EPOCH + timestamp / SECONDS_PER_DAY)
    }

    /// Nearest representable UTC instant, at microsecond resolution.
    ///
    /// Values outside chrono's range collapse to the Unix epoch.
    pub fn to_datetime(&self) -> chrono::DateTime<chrono::Utc> {
        let micros = (self.to_unix_timestamp() * 1e6).round();
        if !micros.is_finite() {
            return chrono::DateTime::UNIX_EPOCH;
        }
        chrono::DateTime::from_timestamp_micros(micros as i64)
            .unwrap_or(chrono::DateTime::UNIX_EPOCH)
    }

    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        let seconds = dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9;
        Self::from_unix_timestamp(seconds)
    }

    /// Bit pattern of the raw value, usable as a hash key.
    pub fn to_bits(&self) -> u64 {
        self.value().to_bits()
    }

    /// RFC 3339 rendering rounded to whole seconds.
    pub fn to_rfc3339(&self) -> String {
        let secs = self.to_unix_timestamp().round() as i64;
        chrono::DateTime::from_timestamp(secs, 0)
            .unwrap_or(chrono::DateTime::UNIX_EPOCH)
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }
}

impl From<f64> for ModifiedJulianDate {
    fn from(v: f64) -> Self {
        ModifiedJulianDate::new(v)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for ModifiedJulianDate {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        ModifiedJulianDate::from_datetime(dt)
    }
}

impl std::fmt::Display for ModifiedJulianDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MJD {:.5}", self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unix_epoch() {
        let epoch = ModifiedJulianDate::new(MJD_UNIX_EPOCH);
        assert_eq!(epoch.to_unix_timestamp(), 0.0);
        assert_eq!(epoch.to_datetime(), chrono::DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_julian_date_of_j2000() {
        let dt = chrono::Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let mjd = ModifiedJulianDate::from_datetime(dt);
        assert!((mjd.julian_date() - 2451545.0).abs() < 1e-6);
        assert!((mjd.value() - 51544.5).abs() < 1e-6);
        assert_eq!(ModifiedJulianDate::from_julian_date(2451545.0).value(), 51544.5);
    }

    #[test]
    fn test_scenario_date() {
        let dt = chrono::Utc.with_ymd_and_hms(2020, 6, 1, 4, 0, 0).unwrap();
        let mjd = ModifiedJulianDate::from(dt);
        assert!((mjd.value() - 59001.166_666_67).abs() < 1e-6);
        assert_eq!(mjd.to_rfc3339(), "2020-06-01T04:00:00Z");
        assert_eq!((mjd.to_datetime() - dt).num_milliseconds(), 0);
    }

    #[test]
    fn test_add_minutes_and_days_since() {
        let start = ModifiedJulianDate::new(60000.0);
        let later = start.add_minutes(90.0);
        assert!(later > start);
        assert!((later.days_since(start).value() - 0.0625).abs() < 1e-12);
        assert!((start.days_since(later).value() + 0.0625).abs() < 1e-12);
    }

    #[test]
    fn test_serializes_as_plain_number() {
        let mjd = ModifiedJulianDate::new(59001.25);
        assert_eq!(serde_json::to_string(&mjd).unwrap(), "59001.25");
        let back: ModifiedJulianDate = serde_json::from_str("59001.25").unwrap();
        assert_eq!(back, mjd);
    }
}
