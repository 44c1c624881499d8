use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::Value as JsonValue;

use crate::postgrest::QueryState;

/// A comparison operator PostgREST understands in `column=op.value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Gte,
    Lte,
    Lt,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Lt => "lt",
        }
    }
}

/// One accumulated `column=op.value` predicate. The value is kept raw and
/// encoded on render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCondition {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl FilterCondition {
    /// `column=op.<encoded value>`
    pub fn render(&self) -> String {
        format!(
            "{}={}.{}",
            self.column,
            self.operator.as_str(),
            encode_component(&self.value)
        )
    }
}

/// Percent-encode one query component the way `encodeURIComponent` does:
/// everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped.
pub fn encode_component(raw: &str) -> String {
    urlencoding::encode(raw)
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}

/// Column names are spliced into the query string unencoded, so anything
/// that would break its structure is refused.
pub(crate) fn validate_column_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Column name cannot be empty".to_string());
    }
    if name.contains(&['&', '=', '?', '#'][..]) {
        return Err(format!(
            "Invalid column name: {name:?} (contains prohibited characters)"
        ));
    }
    Ok(())
}

/// Conversion of a Rust value into the text of a filter value.
pub trait IntoFilterValue {
    fn into_filter_value(self) -> String;
}

impl IntoFilterValue for &str {
    fn into_filter_value(self) -> String {
        self.to_string()
    }
}

impl IntoFilterValue for String {
    fn into_filter_value(self) -> String {
        self
    }
}

impl IntoFilterValue for &String {
    fn into_filter_value(self) -> String {
        self.clone()
    }
}

macro_rules! display_filter_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoFilterValue for $ty {
                fn into_filter_value(self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_filter_value!(bool, i16, i32, i64, u16, u32, u64, f32, f64, uuid::Uuid);

impl IntoFilterValue for NaiveDate {
    fn into_filter_value(self) -> String {
        self.format("%Y-%m-%d").to_string()
    }
}

impl IntoFilterValue for NaiveDateTime {
    fn into_filter_value(self) -> String {
        self.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
    }
}

impl<Tz: TimeZone> IntoFilterValue for DateTime<Tz>
where
    Tz::Offset: std::fmt::Display,
{
    fn into_filter_value(self) -> String {
        self.to_rfc3339()
    }
}

impl IntoFilterValue for JsonValue {
    fn into_filter_value(self) -> String {
        match self {
            JsonValue::String(s) => s,
            JsonValue::Null => "null".to_string(),
            other => other.to_string(),
        }
    }
}

/// Predicate methods shared by every builder that targets rows.
///
/// Each call appends one condition; conditions render in call order and
/// PostgREST ANDs them.
pub trait Filterable: Sized {
    /// Get a mutable reference to the accumulated query state.
    fn state_mut(&mut self) -> &mut QueryState;

    /// Append `column=op.value`.
    fn filter(mut self, column: &str, operator: FilterOperator, value: impl IntoFilterValue) -> Self {
        if let Err(e) = validate_column_name(column) {
            tracing::error!("Invalid column name in {} filter: {e}", operator.as_str());
            self.state_mut().reject(e);
            return self;
        }
        self.state_mut().conditions.push(FilterCondition {
            column: column.to_string(),
            operator,
            value: value.into_filter_value(),
        });
        self
    }

    /// Filter: column = value
    fn eq(self, column: &str, value: impl IntoFilterValue) -> Self {
        self.filter(column, FilterOperator::Eq, value)
    }

    /// Filter: column >= value
    fn gte(self, column: &str, value: impl IntoFilterValue) -> Self {
        self.filter(column, FilterOperator::Gte, value)
    }

    /// Filter: column <= value
    fn lte(self, column: &str, value: impl IntoFilterValue) -> Self {
        self.filter(column, FilterOperator::Lte, value)
    }

    /// Filter: column < value
    fn lt(self, column: &str, value: impl IntoFilterValue) -> Self {
        self.filter(column, FilterOperator::Lt, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn encodes_like_encode_uri_component() {
        assert_eq!(encode_component("*"), "*");
        assert_eq!(encode_component("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(encode_component("it's (ok)!~"), "it's%20(ok)!~");
        assert_eq!(encode_component("id,date"), "id%2Cdate");
        assert_eq!(encode_component("100%"), "100%25");
        assert_eq!(encode_component("日"), "%E6%97%A5");
    }

    #[test]
    fn render_encodes_value_only() {
        let cond = FilterCondition {
            column: "note".into(),
            operator: FilterOperator::Eq,
            value: "a+b c".into(),
        };
        assert_eq!(cond.render(), "note=eq.a%2Bb%20c");
    }

    #[test]
    fn typed_values() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(date.into_filter_value(), "2024-03-09");
        assert_eq!(42_i64.into_filter_value(), "42");
        assert_eq!(true.into_filter_value(), "true");
        assert_eq!(serde_json::json!("x").into_filter_value(), "x");
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap();
        assert_eq!(ts.into_filter_value(), "2024-03-09T08:00:00+00:00");
    }

    #[test]
    fn column_validation() {
        assert!(validate_column_name("user_id").is_ok());
        assert!(validate_column_name("").is_err());
        assert!(validate_column_name("a&b=c").is_err());
    }
}
