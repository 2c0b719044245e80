//! Autogenerate object filtering.
//!
//! Shard tables, their indexes, and foreign keys pointing at shards are
//! created by partition DDL, not declared in the model. A structural diff
//! would otherwise propose dropping them on every run.

use pgshard_core::FilterSettings;

/// The kind of schema object a diff engine is about to compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// A table.
    Table,
    /// An index.
    Index,
    /// A foreign key constraint.
    ForeignKey,
    /// A column.
    Column,
    /// A unique constraint.
    UniqueConstraint,
}

/// A candidate object presented to an [`ObjectFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectDescriptor<'a> {
    /// What kind of object this is.
    pub kind: ObjectKind,
    /// The object name, if it has one.
    pub name: Option<&'a str>,
    /// For foreign keys, the referenced table.
    pub referred_table: Option<&'a str>,
    /// Whether the object was reflected from the database (as opposed to
    /// declared in the model).
    pub reflected: bool,
}

impl<'a> ObjectDescriptor<'a> {
    /// Describes a table.
    pub const fn table(name: &'a str, reflected: bool) -> Self {
        Self {
            kind: ObjectKind::Table,
            name: Some(name),
            referred_table: None,
            reflected,
        }
    }

    /// Describes an index.
    pub const fn index(name: &'a str, reflected: bool) -> Self {
        Self {
            kind: ObjectKind::Index,
            name: Some(name),
            referred_table: None,
            reflected,
        }
    }

    /// Describes a foreign key.
    pub const fn foreign_key(name: Option<&'a str>, referred_table: &'a str, reflected: bool) -> Self {
        Self {
            kind: ObjectKind::ForeignKey,
            name,
            referred_table: Some(referred_table),
            reflected,
        }
    }
}

/// A predicate deciding which objects take part in a structural diff.
pub trait ObjectFilter: Send + Sync {
    /// Returns `false` if the diff should ignore this object entirely.
    fn include(&self, object: &ObjectDescriptor<'_>) -> bool;
}

/// A filter that includes everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeAll;

impl ObjectFilter for IncludeAll {
    fn include(&self, _object: &ObjectDescriptor<'_>) -> bool {
        true
    }
}

/// Returns `true` if `name` looks like `<base>_p<digits>`.
pub fn is_shard_table_name(name: &str) -> bool {
    name.rsplit_once("_p")
        .is_some_and(|(base, suffix)| !base.is_empty() && is_digits(suffix))
}

/// Returns `true` if `name` looks like `<base>_p<digits>_<column>_idx`.
pub fn is_shard_index_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix("_idx") else {
        return false;
    };
    stem.match_indices("_p").any(|(pos, _)| {
        let rest = &stem[pos + 2..];
        pos > 0
            && rest
                .split_once('_')
                .is_some_and(|(digits, column)| is_digits(digits) && !column.is_empty())
    })
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Hides generated shard objects from the autogenerate diff.
#[derive(Debug, Clone, Default)]
pub struct AutogenerateFilter {
    fk_name_markers: Vec<String>,
}

impl AutogenerateFilter {
    /// Creates a filter recognizing only the shard naming convention.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter that also ignores foreign keys whose name contains
    /// one of the configured markers and ends in a digit.
    pub fn from_settings(settings: &FilterSettings) -> Self {
        Self {
            fk_name_markers: settings.shard_fk_name_markers.clone(),
        }
    }

    /// Returns `true` if the object is a genuine schema object.
    ///
    /// Total over every descriptor: unnamed objects are always real.
    pub fn is_real_object(&self, object: &ObjectDescriptor<'_>) -> bool {
        match object.kind {
            ObjectKind::Table => !object.name.is_some_and(is_shard_table_name),
            ObjectKind::Index => !object.name.is_some_and(is_shard_index_name),
            ObjectKind::ForeignKey => {
                if object.referred_table.is_some_and(is_shard_table_name) {
                    return false;
                }
                !object.name.is_some_and(|name| self.is_shard_fk_name(name))
            }
            ObjectKind::Column | ObjectKind::UniqueConstraint => true,
        }
    }

    fn is_shard_fk_name(&self, name: &str) -> bool {
        name.ends_with(|c: char| c.is_ascii_digit())
            && self
                .fk_name_markers
                .iter()
                .any(|marker| !marker.is_empty() && name.contains(marker.as_str()))
    }
}

impl ObjectFilter for AutogenerateFilter {
    fn include(&self, object: &ObjectDescriptor<'_>) -> bool {
        let include = self.is_real_object(object);
        if !include {
            tracing::debug!(kind = ?object.kind, name = ?object.name, "Ignoring generated shard object");
        }
        include
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> AutogenerateFilter {
        AutogenerateFilter::new()
    }

    // ── Tables ──────────────────────────────────────────────────────

    #[test]
    fn test_shard_tables_are_hidden() {
        let f = filter();
        assert!(!f.is_real_object(&ObjectDescriptor::table("orders_p0", true)));
        assert!(!f.is_real_object(&ObjectDescriptor::table("orders_p12", true)));
        assert!(!f.is_real_object(&ObjectDescriptor::table("call_history_p3", false)));
    }

    #[test]
    fn test_regular_tables_are_real() {
        let f = filter();
        for name in ["orders", "orders_p", "orders_pending", "orders_p1x", "_p1"] {
            assert!(f.is_real_object(&ObjectDescriptor::table(name, true)), "{name}");
        }
    }

    #[test]
    fn test_base_name_may_contain_p_segment() {
        assert!(is_shard_table_name("shop_products_p2"));
        assert!(!is_shard_table_name("shop_p2_archive"));
    }

    // ── Indexes ─────────────────────────────────────────────────────

    #[test]
    fn test_shard_indexes_are_hidden() {
        let f = filter();
        assert!(!f.is_real_object(&ObjectDescriptor::index("orders_p3_created_at_idx", true)));
        assert!(!f.is_real_object(&ObjectDescriptor::index("orders_p0_price_idx", true)));
        assert!(!f.is_real_object(&ObjectDescriptor::index("shop_products_p1_sku_idx", true)));
    }

    #[test]
    fn test_regular_indexes_are_real() {
        let f = filter();
        for name in [
            "orders_primary_idx",
            "orders_created_at_idx",
            "orders_p3_created_at_key",
            "orders_p3_idx",
            "orders_pkey",
        ] {
            assert!(f.is_real_object(&ObjectDescriptor::index(name, true)), "{name}");
        }
    }

    // ── Foreign keys ────────────────────────────────────────────────

    #[test]
    fn test_fk_to_shard_is_hidden() {
        let f = filter();
        let fk = ObjectDescriptor::foreign_key(Some("items_order_id_fkey"), "orders_p1", true);
        assert!(!f.is_real_object(&fk));
        let fk = ObjectDescriptor::foreign_key(None, "orders_p1", true);
        assert!(!f.is_real_object(&fk));
    }

    #[test]
    fn test_fk_to_parent_is_real() {
        let fk = ObjectDescriptor::foreign_key(Some("items_order_id_fkey"), "orders", true);
        assert!(filter().is_real_object(&fk));
    }

    #[test]
    fn test_fk_name_markers() {
        let f = AutogenerateFilter::from_settings(&FilterSettings {
            shard_fk_name_markers: vec!["call_history_friendly_id_fkey".into()],
        });
        let hidden = ObjectDescriptor::foreign_key(
            Some("action_history_organization_id_call_history_friendly_id_fkey3"),
            "call_history",
            true,
        );
        assert!(!f.is_real_object(&hidden));

        let real = ObjectDescriptor::foreign_key(
            Some("action_history_organization_id_call_history_friendly_id_fkey"),
            "call_history",
            true,
        );
        assert!(f.is_real_object(&real));
        assert!(filter().is_real_object(&hidden));
    }

    // ── Totality ────────────────────────────────────────────────────

    #[test]
    fn test_unnamed_and_other_objects_are_real() {
        let f = filter();
        let unnamed = ObjectDescriptor {
            kind: ObjectKind::Table,
            name: None,
            referred_table: None,
            reflected: true,
        };
        assert!(f.is_real_object(&unnamed));
        let column = ObjectDescriptor {
            kind: ObjectKind::Column,
            name: Some("orders_p0"),
            referred_table: None,
            reflected: false,
        };
        assert!(f.is_real_object(&column));
        assert!(f.include(&column));
        assert!(IncludeAll.include(&ObjectDescriptor::table("orders_p0", true)));
    }
}
