//! Lenient (de)serializers for the timestamp formats the api mixes freely:
//! plain dates, naive iso timestamps (with or without fractional seconds)
//! and rfc3339 timestamps with an offset.

pub mod date_time {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
    use serde::{de::Error, Deserialize as _, Deserializer, Serializer};

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    /// Parses any of the accepted shapes. Offsets are converted to utc.
    pub fn parse(value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
            return Some(with_offset.naive_utc());
        }
        if let Some(parsed) = NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        {
            return Some(parsed);
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .map(|date| date.and_time(NaiveTime::MIN))
    }

    pub fn deserialize_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| Error::custom(format!("invalid timestamp '{s}'"))),
            None => Ok(None),
        }
    }

    pub fn serialize_option<S>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => {
                serializer.serialize_str(&value.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            None => serializer.serialize_none(),
        }
    }
}

pub mod date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize as _, Deserializer, Serializer};

    /// A date, or the date part of any timestamp `date_time::parse` accepts.
    /// The calendar date is kept as written, offsets do not shift it.
    pub fn parse(value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        let (date, rest) = NaiveDate::parse_and_remainder(value, "%Y-%m-%d").ok()?;
        (rest.is_empty() || super::date_time::parse(value).is_some()).then_some(date)
    }

    pub fn deserialize_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| Error::custom(format!("invalid date '{s}'"))),
            None => Ok(None),
        }
    }

    /// Like `deserialize_option`, but unreadable dates become `None` instead
    /// of failing the whole record.
    pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?
            .as_deref()
            .and_then(parse))
    }

    pub fn serialize_option<S>(
        value: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&value.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Timelike};
    use serde::Deserialize;

    use super::{date, date_time};

    #[derive(Deserialize)]
    struct Record {
        #[serde(default, deserialize_with = "date::deserialize_option")]
        day: Option<NaiveDate>,
        #[serde(default, deserialize_with = "date_time::deserialize_option")]
        at: Option<chrono::NaiveDateTime>,
    }

    #[test]
    fn accepts_mixed_timestamp_shapes() {
        let expected = NaiveDate::from_ymd_opt(2025, 4, 12).unwrap();
        for raw in [
            "2025-04-12",
            "2025-04-12T08:30:00",
            "2025-04-12T08:30:00.123456",
            "2025-04-12 08:30:00",
        ] {
            assert_eq!(date::parse(raw), Some(expected), "{raw}");
        }

        let shifted = date_time::parse("2025-04-12T08:30:00+02:00").unwrap();
        assert_eq!(shifted.hour(), 6);
    }

    #[test]
    fn blank_and_missing_become_none() {
        let record: Record = serde_json::from_str(r#"{"day": "", "at": null}"#).unwrap();
        assert!(record.day.is_none());
        assert!(record.at.is_none());

        let record: Record = serde_json::from_str("{}").unwrap();
        assert!(record.day.is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(serde_json::from_str::<Record>(r#"{"day": "next tuesday"}"#).is_err());
        assert_eq!(date::parse("2025-04-12junk"), None);
    }

    #[test]
    fn dates_ignore_the_offset() {
        assert_eq!(
            date::parse("2025-04-30T23:30:00-02:00"),
            NaiveDate::from_ymd_opt(2025, 4, 30)
        );
        assert_eq!(
            date::parse("2025-05-01T00:30:00+02:00"),
            NaiveDate::from_ymd_opt(2025, 5, 1)
        );
    }

    #[derive(Deserialize)]
    struct LenientRecord {
        #[serde(default, deserialize_with = "date::deserialize_lenient")]
        day: Option<NaiveDate>,
    }

    #[test]
    fn lenient_dates_drop_garbage() {
        let record: LenientRecord =
            serde_json::from_str(r#"{"day": "next tuesday"}"#).unwrap();
        assert!(record.day.is_none());
        let record: LenientRecord = serde_json::from_str(r#"{"day": "2025-04-12"}"#).unwrap();
        assert_eq!(record.day, NaiveDate::from_ymd_opt(2025, 4, 12));
    }
}
