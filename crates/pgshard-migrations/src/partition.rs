//! Partition strategies and validated partition configurations.
//!
//! A [`PartitionConfig`] can only be obtained through its validating
//! constructors, so every config that exists is well formed: identifiers are
//! legal, the shard count is at least one, and the strategy-specific
//! parameters are present. The strategy parameters live in [`PartitionSpec`],
//! which makes "RANGE without bounds" unrepresentable.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use pgshard_core::settings::{DEFAULT_NAMING_PATTERN, DEFAULT_PARTITION_COUNT};
use pgshard_core::ShardError;
use regex::Regex;

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid")
});

/// PostgreSQL truncates identifiers longer than this many bytes.
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Returns `true` if `name` is a plain SQL identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

fn check_identifier(kind: &str, name: &str) -> Result<(), ShardError> {
    if !is_valid_identifier(name) {
        return Err(ShardError::ConfigurationError(format!(
            "Invalid {kind} name: {name}"
        )));
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ShardError::ConfigurationError(format!(
            "{kind} name '{name}' exceeds {MAX_IDENTIFIER_LENGTH} characters"
        )));
    }
    Ok(())
}

// ── Strategy ─────────────────────────────────────────────────────────

/// The algorithm deciding which shard a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionStrategy {
    /// Rows are spread by hash modulus.
    Hash,
    /// Rows are routed by value ranges.
    Range,
    /// Rows are routed by explicit value lists.
    List,
}

impl PartitionStrategy {
    /// Returns the SQL keyword for this strategy.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hash => "HASH",
            Self::Range => "RANGE",
            Self::List => "LIST",
        }
    }
}

impl fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionStrategy {
    type Err = ShardError;

    /// Parses a strategy keyword, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HASH" => Ok(Self::Hash),
            "RANGE" => Ok(Self::Range),
            "LIST" => Ok(Self::List),
            other => Err(ShardError::ConfigurationError(format!(
                "Unsupported partition strategy: {other}. Supported strategies: HASH, RANGE, LIST"
            ))),
        }
    }
}

// ── Values ───────────────────────────────────────────────────────────

/// A scalar used in a RANGE bound or a LIST entry.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionValue {
    /// A string value.
    Text(String),
    /// An integer value.
    Integer(i64),
    /// An integer above `i64::MAX`, kept exact.
    Unsigned(u64),
    /// A floating-point value.
    Float(f64),
    /// A boolean value.
    Boolean(bool),
}

impl PartitionValue {
    /// Converts a JSON scalar into a partition value.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for null, arrays, and objects.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ShardError> {
        match value {
            serde_json::Value::String(s) => Ok(Self::Text(s.clone())),
            serde_json::Value::Bool(b) => Ok(Self::Boolean(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_u64().map(Self::Unsigned))
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or_else(|| {
                    ShardError::ConfigurationError(format!("Unsupported partition value: {n}"))
                }),
            other => Err(ShardError::ConfigurationError(format!(
                "Partition values must be scalars, got {other}"
            ))),
        }
    }

    /// Renders the value as a single-quoted SQL literal.
    ///
    /// # Errors
    ///
    /// Returns a generation error for non-finite floats, which have no
    /// literal form in a partition bound.
    pub fn sql_literal(&self) -> Result<String, ShardError> {
        match self {
            Self::Text(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
            Self::Integer(i) => Ok(format!("'{i}'")),
            Self::Unsigned(u) => Ok(format!("'{u}'")),
            Self::Float(f) if !f.is_finite() => Err(ShardError::GenerationError(format!(
                "Cannot render non-finite partition value {f}"
            ))),
            Self::Float(f) => Ok(format!("'{f}'")),
            Self::Boolean(b) => Ok(format!("'{b}'")),
        }
    }
}

impl fmt::Display for PartitionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Unsigned(u) => write!(f, "{u}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for PartitionValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PartitionValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for PartitionValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for PartitionValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for PartitionValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// One LIST shard: a single value or a group of values sharing the shard.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEntry {
    /// One value mapped to the shard.
    Single(PartitionValue),
    /// Several values mapped to the same shard. Never empty.
    Group(Vec<PartitionValue>),
}

impl ListEntry {
    /// Creates a single-value entry.
    pub fn single(value: impl Into<PartitionValue>) -> Self {
        Self::Single(value.into())
    }

    /// Creates a grouped entry.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `values` is empty.
    pub fn group<V: Into<PartitionValue>>(
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, ShardError> {
        let values: Vec<PartitionValue> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(ShardError::ConfigurationError(
                "A LIST partition group must contain at least one value".to_string(),
            ));
        }
        Ok(Self::Group(values))
    }

    /// Converts a JSON scalar or array of scalars into an entry.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for empty arrays, nested arrays,
    /// objects, and null.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ShardError> {
        match value {
            serde_json::Value::Array(items) => {
                let values = items
                    .iter()
                    .map(PartitionValue::from_json)
                    .collect::<Result<Vec<_>, _>>()?;
                Self::group(values)
            }
            scalar => PartitionValue::from_json(scalar).map(Self::Single),
        }
    }

    /// Returns the values routed to this shard.
    pub fn values(&self) -> &[PartitionValue] {
        match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::Group(vs) => vs,
        }
    }
}

/// The `[start, end)` bound of one RANGE shard.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBound {
    /// Inclusive lower bound.
    pub start: PartitionValue,
    /// Exclusive upper bound.
    pub end: PartitionValue,
}

impl RangeBound {
    /// Creates a bound.
    pub fn new(start: impl Into<PartitionValue>, end: impl Into<PartitionValue>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Converts a JSON `[start, end]` pair into a bound.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either side is not a scalar.
    pub fn from_json(pair: &(serde_json::Value, serde_json::Value)) -> Result<Self, ShardError> {
        Ok(Self {
            start: PartitionValue::from_json(&pair.0)?,
            end: PartitionValue::from_json(&pair.1)?,
        })
    }
}

// ── Config ───────────────────────────────────────────────────────────

/// Strategy-specific partition parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionSpec {
    /// `partition_count` shards bound by hash modulus.
    Hash {
        /// Number of shards, at least one.
        partition_count: u32,
    },
    /// One shard per bound, in order.
    Range {
        /// The shard bounds, never empty.
        bounds: Vec<RangeBound>,
    },
    /// One shard per entry, in order.
    List {
        /// The shard entries, never empty.
        values: Vec<ListEntry>,
    },
}

impl PartitionSpec {
    /// Returns the strategy of this variant.
    pub const fn strategy(&self) -> PartitionStrategy {
        match self {
            Self::Hash { .. } => PartitionStrategy::Hash,
            Self::Range { .. } => PartitionStrategy::Range,
            Self::List { .. } => PartitionStrategy::List,
        }
    }

    /// Returns the number of shards this variant produces.
    pub fn shard_count(&self) -> usize {
        match self {
            Self::Hash { partition_count } => *partition_count as usize,
            Self::Range { bounds } => bounds.len(),
            Self::List { values } => values.len(),
        }
    }
}

/// A shard naming template with `{table}` and `{number}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPattern(String);

impl NamingPattern {
    /// Creates a pattern.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the pattern lacks `{number}`, since
    /// every shard would then get the same name.
    pub fn new(pattern: impl Into<String>) -> Result<Self, ShardError> {
        let pattern = pattern.into();
        if !pattern.contains("{number}") {
            return Err(ShardError::ConfigurationError(format!(
                "Naming pattern '{pattern}' must contain {{number}}"
            )));
        }
        Ok(Self(pattern))
    }

    /// Returns the raw template.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Renders the shard name for `table` and the 0-based shard `number`.
    pub fn render(&self, table: &str, number: usize) -> String {
        self.0
            .replace("{table}", table)
            .replace("{number}", &number.to_string())
    }
}

impl Default for NamingPattern {
    fn default() -> Self {
        Self(DEFAULT_NAMING_PATTERN.to_string())
    }
}

/// Optional inputs to [`PartitionConfig::new`].
///
/// Which fields matter depends on the strategy: `partition_count` drives
/// HASH, `range_bounds` drives RANGE, and `custom_values` drives LIST. An
/// explicit `partition_count` on RANGE or LIST must agree with the number of
/// bounds or entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionParams {
    /// Number of shards.
    pub partition_count: Option<u32>,
    /// Shard naming template.
    pub naming_pattern: Option<String>,
    /// LIST entries.
    pub custom_values: Option<Vec<ListEntry>>,
    /// RANGE bounds.
    pub range_bounds: Option<Vec<RangeBound>>,
}

/// The validated partitioning declaration of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionConfig {
    table_name: String,
    column: String,
    spec: PartitionSpec,
    naming_pattern: NamingPattern,
}

impl PartitionConfig {
    /// Validates and builds a config.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when an identifier is malformed, the
    /// shard count is zero, RANGE lacks bounds, LIST lacks values, an
    /// explicit count disagrees with the bounds or values, or the naming
    /// pattern yields an invalid shard name.
    pub fn new(
        table_name: impl Into<String>,
        strategy: PartitionStrategy,
        column: impl Into<String>,
        params: PartitionParams,
    ) -> Result<Self, ShardError> {
        let table_name = table_name.into();
        let column = column.into();
        check_identifier("table", &table_name)?;
        check_identifier("column", &column)?;

        if params.partition_count == Some(0) {
            return Err(ShardError::ConfigurationError(format!(
                "Partition count must be >= 1, got 0 for table '{table_name}'"
            )));
        }

        let naming_pattern = match params.naming_pattern {
            Some(pattern) => NamingPattern::new(pattern)?,
            None => NamingPattern::default(),
        };

        let spec = match strategy {
            PartitionStrategy::Hash => PartitionSpec::Hash {
                partition_count: params.partition_count.unwrap_or(DEFAULT_PARTITION_COUNT),
            },
            PartitionStrategy::Range => {
                let bounds = params
                    .range_bounds
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| {
                        ShardError::ConfigurationError(format!(
                            "RANGE partitioning requires range_bounds to be specified for table '{table_name}'"
                        ))
                    })?;
                check_explicit_count(&table_name, params.partition_count, bounds.len())?;
                PartitionSpec::Range { bounds }
            }
            PartitionStrategy::List => {
                let values = params
                    .custom_values
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| {
                        ShardError::ConfigurationError(format!(
                            "LIST partitioning requires custom_values to be specified for table '{table_name}'"
                        ))
                    })?;
                check_explicit_count(&table_name, params.partition_count, values.len())?;
                PartitionSpec::List { values }
            }
        };

        let config = Self {
            table_name,
            column,
            spec,
            naming_pattern,
        };
        config.check_shard_names()?;
        Ok(config)
    }

    /// Builds a HASH config with the default naming pattern.
    ///
    /// # Errors
    ///
    /// See [`PartitionConfig::new`].
    pub fn hash(
        table_name: impl Into<String>,
        column: impl Into<String>,
        partition_count: u32,
    ) -> Result<Self, ShardError> {
        Self::new(
            table_name,
            PartitionStrategy::Hash,
            column,
            PartitionParams {
                partition_count: Some(partition_count),
                ..PartitionParams::default()
            },
        )
    }

    /// Builds a RANGE config with the default naming pattern.
    ///
    /// # Errors
    ///
    /// See [`PartitionConfig::new`].
    pub fn range(
        table_name: impl Into<String>,
        column: impl Into<String>,
        bounds: Vec<RangeBound>,
    ) -> Result<Self, ShardError> {
        Self::new(
            table_name,
            PartitionStrategy::Range,
            column,
            PartitionParams {
                range_bounds: Some(bounds),
                ..PartitionParams::default()
            },
        )
    }

    /// Builds a LIST config with the default naming pattern.
    ///
    /// # Errors
    ///
    /// See [`PartitionConfig::new`].
    pub fn list(
        table_name: impl Into<String>,
        column: impl Into<String>,
        values: Vec<ListEntry>,
    ) -> Result<Self, ShardError> {
        Self::new(
            table_name,
            PartitionStrategy::List,
            column,
            PartitionParams {
                custom_values: Some(values),
                ..PartitionParams::default()
            },
        )
    }

    /// The partitioned (parent) table.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The partition key column.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// The strategy-specific parameters.
    pub const fn spec(&self) -> &PartitionSpec {
        &self.spec
    }

    /// The partitioning strategy.
    pub const fn strategy(&self) -> PartitionStrategy {
        self.spec.strategy()
    }

    /// The shard naming template.
    pub const fn naming_pattern(&self) -> &NamingPattern {
        &self.naming_pattern
    }

    /// The number of shards.
    pub fn shard_count(&self) -> usize {
        self.spec.shard_count()
    }

    /// The name of shard `number` (0-based).
    pub fn partition_name(&self, number: usize) -> String {
        self.naming_pattern.render(&self.table_name, number)
    }

    /// The names of all shards, in shard order.
    pub fn partition_names(&self) -> Vec<String> {
        (0..self.shard_count())
            .map(|i| self.partition_name(i))
            .collect()
    }

    /// The `PARTITION BY` clause body, e.g. `HASH (customer_id)`.
    pub fn partition_by_clause(&self) -> String {
        format!("{} ({})", self.strategy(), self.column)
    }

    /// Returns `true` if this config's shard count differs from `default`.
    ///
    /// Callers holding a global default use this to flag tables whose
    /// configured count must not be replaced by it.
    pub fn count_diverges_from(&self, default: u32) -> bool {
        u32::try_from(self.shard_count()).map_or(true, |count| count != default)
    }

    fn check_shard_names(&self) -> Result<(), ShardError> {
        let last = self.shard_count().saturating_sub(1);
        for number in [0, last] {
            let name = self.partition_name(number);
            check_identifier("shard", &name).map_err(|e| {
                ShardError::ConfigurationError(format!(
                    "Naming pattern '{}' is unusable for table '{}': {e}",
                    self.naming_pattern.as_str(),
                    self.table_name
                ))
            })?;
        }
        Ok(())
    }
}

fn check_explicit_count(
    table_name: &str,
    explicit: Option<u32>,
    actual: usize,
) -> Result<(), ShardError> {
    match explicit {
        Some(count) if count as usize != actual => Err(ShardError::ConfigurationError(format!(
            "Table '{table_name}' declares partition_count {count} but defines {actual} partitions"
        ))),
        _ => Ok(()),
    }
}
