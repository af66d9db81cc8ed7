use crate::core::value::Value;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, collections::HashMap, fmt, str::FromStr};

/// Field types a schema can declare. Names coming from the remote system's
/// describe calls (`picklist`, `currency`, ...) are folded onto these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    String,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    Boolean,
    Date,
    Timestamp,
    Json,
    Null,
}

lazy_static! {
    static ref TYPE_ALIASES: HashMap<&'static str, DataType> = build_type_aliases();
}

impl DataType {
    pub fn name(&self) -> Cow<'_, str> {
        match self {
            DataType::String => Cow::Borrowed("string"),
            DataType::Int => Cow::Borrowed("int"),
            DataType::Long => Cow::Borrowed("long"),
            DataType::Float => Cow::Borrowed("float"),
            DataType::Double => Cow::Borrowed("double"),
            DataType::Decimal => Cow::Borrowed("decimal"),
            DataType::Boolean => Cow::Borrowed("boolean"),
            DataType::Date => Cow::Borrowed("date"),
            DataType::Timestamp => Cow::Borrowed("datetime"),
            DataType::Json => Cow::Borrowed("json"),
            DataType::Null => Cow::Borrowed("null"),
        }
    }

    /// Coerces one raw cell into a typed value.
    ///
    /// Blank cells are an explicit absence (`Value::Null`) for every type
    /// except `String`, where the empty string is a legitimate value.
    /// Anything that does not parse is an error, never a silent fallback.
    pub fn parse_value(&self, raw: &str) -> Result<Value, String> {
        if *self == DataType::String {
            return Ok(Value::String(raw.to_string()));
        }

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }

        let invalid = || format!("'{raw}' is not a valid {}", self.name());

        match self {
            DataType::String => Ok(Value::String(raw.to_string())),
            DataType::Int => trimmed
                .parse::<i32>()
                .map(|v| Value::Int(v as i64))
                .map_err(|_| invalid()),
            DataType::Long => trimmed
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| invalid()),
            DataType::Float | DataType::Double => trimmed
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| invalid()),
            DataType::Decimal => BigDecimal::from_str(trimmed)
                .map(Value::Decimal)
                .map_err(|_| invalid()),
            DataType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Boolean(true)),
                "false" | "0" => Ok(Value::Boolean(false)),
                _ => Err(invalid()),
            },
            DataType::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_| invalid()),
            DataType::Timestamp => parse_timestamp(trimmed)
                .map(Value::Timestamp)
                .ok_or_else(invalid),
            DataType::Json => serde_json::from_str(trimmed)
                .map(Value::Json)
                .map_err(|_| invalid()),
            DataType::Null => Ok(Value::Null),
        }
    }

    fn normalize_type_name(type_name: &str) -> String {
        type_name.trim().to_lowercase()
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    // The remote log also emits `2024-01-31T10:00:00.000+0000`
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TYPE_ALIASES
            .get(DataType::normalize_type_name(s).as_str())
            .cloned()
            .ok_or_else(|| format!("Unknown field type: {s}"))
    }
}

impl TryFrom<String> for DataType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DataType> for String {
    fn from(data_type: DataType) -> Self {
        data_type.name().into_owned()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn build_type_aliases() -> HashMap<&'static str, DataType> {
    use DataType::*;

    let entries = [
        ("string", String),
        ("text", String),
        ("id", String),
        ("reference", String),
        ("picklist", String),
        ("multipicklist", String),
        ("textarea", String),
        ("email", String),
        ("phone", String),
        ("url", String),
        ("int", Int),
        ("integer", Int),
        ("long", Long),
        ("bigint", Long),
        ("float", Float),
        ("double", Double),
        ("currency", Double),
        ("percent", Double),
        ("decimal", Decimal),
        ("numeric", Decimal),
        ("boolean", Boolean),
        ("bool", Boolean),
        ("date", Date),
        ("datetime", Timestamp),
        ("timestamp", Timestamp),
        ("json", Json),
        ("null", Null),
    ];

    let mut map = HashMap::new();
    for (name, data_type) in entries {
        map.insert(name, data_type);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_resolve_case_insensitively() {
        assert_eq!("PickList".parse::<DataType>(), Ok(DataType::String));
        assert_eq!(" currency ".parse::<DataType>(), Ok(DataType::Double));
        assert_eq!("DateTime".parse::<DataType>(), Ok(DataType::Timestamp));
        assert!("geometry".parse::<DataType>().is_err());
    }

    #[test]
    fn test_blank_cells_are_null_except_for_strings() {
        assert_eq!(DataType::Int.parse_value("  "), Ok(Value::Null));
        assert_eq!(DataType::Date.parse_value(""), Ok(Value::Null));
        assert_eq!(
            DataType::String.parse_value(""),
            Ok(Value::String(String::new()))
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(DataType::Int.parse_value("abc").is_err());
        assert!(DataType::Int.parse_value("3000000000").is_err());
        assert!(DataType::Boolean.parse_value("yes").is_err());
        assert!(DataType::Date.parse_value("31/01/2024").is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = "2024-01-31T10:00:00+00:00";
        for raw in [
            "2024-01-31T10:00:00Z",
            "2024-01-31T10:00:00.000+0000",
            "2024-01-31 10:00:00",
        ] {
            let value = DataType::Timestamp.parse_value(raw).unwrap();
            assert_eq!(value.to_string(), expected, "{raw}");
        }
    }

    #[test]
    fn test_serde_uses_type_names() {
        let json = serde_json::to_string(&DataType::Timestamp).unwrap();
        assert_eq!(json, "\"datetime\"");
        let parsed: DataType = serde_json::from_str("\"Percent\"").unwrap();
        assert_eq!(parsed, DataType::Double);
    }
}
