use std::fmt;

/// Money is kept as integer cents so balance arithmetic stays exact.
/// `40.00` is stored as `4000`.
pub type Cents = i64;

/// Largest amount a single budget or expense may carry. Sums over many
/// of them stay inside `i64` and convert to `f64` without losing cents.
pub const MAX_AMOUNT_CENTS: Cents = i64::MAX / 1_000_000;

/// Render cents as a plain decimal string: 4000 -> "40.00", -5 -> "-0.05".
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a decimal amount into cents.
///
/// Accepts `"40"`, `"40.5"`, `"40.50"`, `".5"` and a leading `-`. Digits past
/// the second decimal place are truncated, so `"9.999"` becomes `999`.
/// Amounts beyond [`MAX_AMOUNT_CENTS`] in either direction are an `Overflow`.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    if digits.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }

    let (units_str, fraction_str) = digits.split_once('.').unwrap_or((digits, ""));
    if fraction_str.contains('.') {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !fraction_str.chars().all(|c| c.is_ascii_digit())
        || (units_str.is_empty() && fraction_str.is_empty())
    {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseCentsError::Overflow)?
    };

    let fraction: i64 = match fraction_str.len() {
        0 => 0,
        1 => fraction_str.parse::<i64>().map_err(|_| ParseCentsError::InvalidFormat)? * 10,
        _ => fraction_str[..2]
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .filter(|c| *c <= MAX_AMOUNT_CENTS)
        .ok_or(ParseCentsError::Overflow)?;
    Ok(if negative { -cents } else { cents })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::Overflow => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

/// Serde adapter for amounts on the JSON wire.
///
/// Cents are written as decimal numbers (`4000` -> `40.0`). On input both
/// numbers and numeric strings are accepted.
pub mod amount {
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::{Cents, parse_cents};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(serde_json::Number),
        Text(String),
    }

    impl RawAmount {
        fn into_cents<E: de::Error>(self) -> Result<Cents, E> {
            let text = match self {
                RawAmount::Number(n) => n.to_string(),
                RawAmount::Text(s) => s,
            };
            parse_cents(&text).map_err(|e| E::custom(format!("invalid amount '{}': {}", text, e)))
        }
    }

    pub fn serialize<S: Serializer>(cents: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*cents as f64 / 100.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        RawAmount::deserialize(deserializer)?.into_cents()
    }

    /// For optional fields in partial updates. Use with `#[serde(default)]`.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        use super::{Cents, RawAmount};

        pub fn serialize<S: Serializer>(
            cents: &Option<Cents>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match cents {
                Some(c) => super::serialize(c, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Cents>, D::Error> {
            Option::<RawAmount>::deserialize(deserializer)?
                .map(RawAmount::into_cents)
                .transpose()
        }
    }
}
