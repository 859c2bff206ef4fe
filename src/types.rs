use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

/// Values that can be stored in a database row or used as query parameters.
///
/// The same enum is used for positional queues, named mappings and result cells:
/// ```rust
/// use sql_sync::prelude::*;
///
/// let params = PositionalParams::from(vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ]);
/// assert_eq!(params.remaining(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Booleans come back from `SQLite` as integers, so `0`/`1` are accepted too.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RowValues::Bool(value) => Some(*value),
            RowValues::Int(1) => Some(true),
            RowValues::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_owned())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        RowValues::JSON(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Action code reported for a row change on a `SQLite` handle.
pub const SQLITE_DELETE: i32 = 9;
/// Action code reported for a row insert on a `SQLite` handle.
pub const SQLITE_INSERT: i32 = 18;
/// Action code reported for a row update on a `SQLite` handle.
pub const SQLITE_UPDATE: i32 = 23;

/// Kind of row change, keyed by the `SQLite` action codes above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateAction {
    Delete,
    Insert,
    Update,
}

impl UpdateAction {
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            UpdateAction::Delete => SQLITE_DELETE,
            UpdateAction::Insert => SQLITE_INSERT,
            UpdateAction::Update => SQLITE_UPDATE,
        }
    }

    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            SQLITE_DELETE => Some(UpdateAction::Delete),
            SQLITE_INSERT => Some(UpdateAction::Insert),
            SQLITE_UPDATE => Some(UpdateAction::Update),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_accessor_accepts_integer_flags() {
        assert_eq!(RowValues::Int(1).as_bool(), Some(true));
        assert_eq!(RowValues::Int(0).as_bool(), Some(false));
        assert_eq!(RowValues::Int(2).as_bool(), None);
        assert_eq!(RowValues::Bool(true).as_bool(), Some(true));
    }

    #[test]
    fn timestamp_accessor_parses_sqlite_text() {
        let value = RowValues::Text("2024-03-01 12:30:00.250".into());
        let ts = value.as_timestamp().expect("timestamp");
        assert_eq!(ts.format("%F %T%.3f").to_string(), "2024-03-01 12:30:00.250");
        assert!(RowValues::Text("not a date".into()).as_timestamp().is_none());
    }

    #[test]
    fn option_converts_to_null() {
        assert!(RowValues::from(None::<i64>).is_null());
        assert_eq!(RowValues::from(Some("x")), RowValues::Text("x".into()));
    }

    #[test]
    fn update_action_codes() {
        for action in [UpdateAction::Delete, UpdateAction::Insert, UpdateAction::Update] {
            assert_eq!(UpdateAction::from_code(action.code()), Some(action));
        }
        assert_eq!(UpdateAction::from_code(SQLITE_INSERT), Some(UpdateAction::Insert));
        assert_eq!(UpdateAction::from_code(1), None);
    }
}
