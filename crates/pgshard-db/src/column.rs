//! Column definitions and column types.

use serde::{Deserialize, Serialize};

/// The type of a column as declared in the model.
///
/// Model files spell the type as a tagged object, e.g.
/// `{"kind": "varchar", "length": 64}` or
/// `{"kind": "enum", "name": "order_status", "values": ["new", "paid"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnType {
    /// 16-bit signed integer.
    SmallInteger,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    BigInteger,
    /// Auto-incrementing 32-bit integer.
    Serial,
    /// Auto-incrementing 64-bit integer.
    BigSerial,
    /// Boolean (true/false).
    Boolean,
    /// Variable-length string with an optional max length.
    Varchar {
        /// Maximum character length.
        #[serde(default)]
        length: Option<u32>,
    },
    /// Unlimited-length text.
    Text,
    /// Fixed-precision decimal number.
    Numeric {
        /// Maximum total digits.
        precision: u32,
        /// Digits after the decimal point.
        scale: u32,
    },
    /// 64-bit floating-point number.
    Double,
    /// Date without time.
    Date,
    /// Date and time without time zone.
    Timestamp,
    /// Date and time with time zone.
    TimestampTz,
    /// Time of day.
    Time,
    /// UUID.
    Uuid,
    /// Binary JSON.
    Jsonb,
    /// Raw bytes.
    Bytea,
    /// A named enumerated type with a fixed, ordered set of labels.
    Enum {
        /// The database type name.
        name: String,
        /// The labels, in declaration order.
        values: Vec<String>,
    },
}

impl ColumnType {
    /// Returns the PostgreSQL type used in column definitions.
    pub fn sql_type(&self) -> String {
        match self {
            Self::SmallInteger => "SMALLINT".to_string(),
            Self::Integer => "INTEGER".to_string(),
            Self::BigInteger => "BIGINT".to_string(),
            Self::Serial => "SERIAL".to_string(),
            Self::BigSerial => "BIGSERIAL".to_string(),
            Self::Boolean => "BOOLEAN".to_string(),
            Self::Varchar { length: Some(n) } => format!("VARCHAR({n})"),
            Self::Varchar { length: None } => "VARCHAR".to_string(),
            Self::Text => "TEXT".to_string(),
            Self::Numeric { precision, scale } => format!("NUMERIC({precision}, {scale})"),
            Self::Double => "DOUBLE PRECISION".to_string(),
            Self::Date => "DATE".to_string(),
            Self::Timestamp => "TIMESTAMP".to_string(),
            Self::TimestampTz => "TIMESTAMP WITH TIME ZONE".to_string(),
            Self::Time => "TIME".to_string(),
            Self::Uuid => "UUID".to_string(),
            Self::Jsonb => "JSONB".to_string(),
            Self::Bytea => "BYTEA".to_string(),
            Self::Enum { name, .. } => name.clone(),
        }
    }

    /// Returns the enum type name and labels if this is an enumerated type.
    pub fn as_enum(&self) -> Option<(&str, &[String])> {
        match self {
            Self::Enum { name, values } => Some((name.as_str(), values.as_slice())),
            _ => None,
        }
    }
}

/// A single column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// The column name.
    pub name: String,
    /// The declared type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether NULL is allowed.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Whether this column is (part of) the primary key.
    #[serde(default)]
    pub primary_key: bool,
}

const fn default_nullable() -> bool {
    true
}

impl Column {
    /// Creates a nullable, non-key column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            primary_key: false,
        }
    }

    /// Marks this column as part of the primary key (implies NOT NULL).
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Disallows NULL values.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_types() {
        assert_eq!(ColumnType::BigInteger.sql_type(), "BIGINT");
        assert_eq!(ColumnType::Varchar { length: Some(7) }.sql_type(), "VARCHAR(7)");
        assert_eq!(
            ColumnType::Numeric { precision: 10, scale: 2 }.sql_type(),
            "NUMERIC(10, 2)"
        );
        assert_eq!(ColumnType::TimestampTz.sql_type(), "TIMESTAMP WITH TIME ZONE");
    }

    #[test]
    fn test_enum_type() {
        let ty = ColumnType::Enum {
            name: "order_status".into(),
            values: vec!["new".into(), "paid".into()],
        };
        assert_eq!(ty.sql_type(), "order_status");
        let (name, values) = ty.as_enum().unwrap();
        assert_eq!(name, "order_status");
        assert_eq!(values, ["new".to_string(), "paid".to_string()]);
        assert!(ColumnType::Text.as_enum().is_none());
    }

    #[test]
    fn test_column_builder() {
        let col = Column::new("id", ColumnType::BigSerial).primary_key();
        assert!(col.primary_key);
        assert!(!col.nullable);

        let col = Column::new("note", ColumnType::Text);
        assert!(col.nullable);
        assert!(!Column::new("x", ColumnType::Text).not_null().nullable);
    }

    #[test]
    fn test_column_deserialize() {
        let col: Column = serde_json::from_str(
            r#"{"name": "status", "type": {"kind": "enum", "name": "status", "values": ["a", "b"]}, "nullable": false}"#,
        )
        .unwrap();
        assert_eq!(col.name, "status");
        assert!(!col.nullable);
        assert!(col.column_type.as_enum().is_some());

        let col: Column =
            serde_json::from_str(r#"{"name": "code", "type": {"kind": "varchar"}}"#).unwrap();
        assert_eq!(col.column_type, ColumnType::Varchar { length: None });
        assert!(col.nullable);
    }
}
