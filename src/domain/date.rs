use chrono::{DateTime, NaiveDate, Utc};

/// Parse a user-supplied date. Accepts RFC 3339 timestamps and plain
/// `YYYY-MM-DD` dates (taken as midnight UTC).
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Serde adapter for optional date fields on request bodies.
pub mod flexible {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, de};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::parse_date(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid date '{}'", raw))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_date() {
        let dt = parse_date("2024-03-09").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-09T00:00:00+00:00");
    }

    #[test]
    fn test_parse_rfc3339_normalizes_to_utc() {
        let dt = parse_date("2024-03-09T10:30:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-09T08:30:00+00:00");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_date("09/03/2024").is_none());
        assert!(parse_date("2024-13-01").is_none());
        assert!(parse_date("").is_none());
    }
}
