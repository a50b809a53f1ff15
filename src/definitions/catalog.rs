//! Record-type codes derived from table names
//!
//! `dbo.PUBACC_HD` carries record type `HD`: the segment after the final
//! underscore, upper-cased.

use std::collections::BTreeMap;

use super::Schema;
use crate::error::{UlsError, UlsResult};

/// Record-type code for a table name
///
/// A name without an underscore yields the whole name upper-cased.
pub fn record_type_for_table(table_name: &str) -> String {
    table_name
        .rsplit('_')
        .next()
        .unwrap_or(table_name)
        .to_uppercase()
}

/// Set of valid record-type codes, each mapped back to its table
#[derive(Debug, Clone, Default)]
pub struct RecordTypeCatalog {
    tables: BTreeMap<String, String>,
}

impl RecordTypeCatalog {
    /// Build from table names; on a code collision the first table wins
    pub fn from_table_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut tables = BTreeMap::new();
        for name in names {
            let code = record_type_for_table(name);
            if let Some(existing) = tables.get(&code) {
                tracing::warn!(
                    "Tables {} and {} both map to record type {}; keeping {}",
                    existing,
                    name,
                    code,
                    existing
                );
                continue;
            }
            tables.insert(code, name.to_string());
        }
        Self { tables }
    }

    pub fn from_schema(schema: &Schema) -> Self {
        Self::from_table_names(schema.table_names())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.tables.contains_key(code)
    }

    /// Catalog membership tested on raw line bytes
    pub fn contains_bytes(&self, code: &[u8]) -> bool {
        std::str::from_utf8(code).is_ok_and(|code| self.contains(code))
    }

    /// Table a record type was derived from
    pub fn table_for(&self, code: &str) -> Option<&str> {
        self.tables.get(code).map(String::as_str)
    }

    /// Ordered columns for a record type
    ///
    /// A table with no recovered columns is treated the same as a missing
    /// table: reconciling against an empty header would corrupt the file.
    pub fn columns_for<'s>(&self, code: &str, schema: &'s Schema) -> UlsResult<&'s [String]> {
        let columns = self
            .table_for(code)
            .and_then(|table| schema.columns(table))
            .ok_or_else(|| UlsError::RecordTypeUnknown(code.to_string()))?;
        if columns.is_empty() {
            tracing::warn!("Record type {} has an empty definition", code);
            return Err(UlsError::RecordTypeUnknown(code.to_string()));
        }
        Ok(columns)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::parse_definitions;

    #[test]
    fn test_record_type_for_table() {
        assert_eq!(record_type_for_table("dbo.PUBACC_HD"), "HD");
        assert_eq!(record_type_for_table("dbo.PUBACC_a2"), "A2");
        assert_eq!(record_type_for_table("plain"), "PLAIN");
        assert_eq!(record_type_for_table("trailing_"), "");
    }

    #[test]
    fn test_catalog_from_schema() {
        let schema = parse_definitions(
            "create table dbo.PUBACC_XX\n(\n  c1 int,\n  c2 int,\n  c3 int\n)\n",
        );
        let catalog = RecordTypeCatalog::from_schema(&schema);
        assert_eq!(catalog.codes().collect::<Vec<_>>(), ["XX"]);
        assert_eq!(catalog.table_for("XX"), Some("dbo.PUBACC_XX"));
        assert_eq!(catalog.columns_for("XX", &schema).unwrap(), ["c1", "c2", "c3"]);
        assert!(catalog.contains_bytes(b"XX"));
        assert!(!catalog.contains_bytes(b"xx"));
    }

    #[test]
    fn test_collision_keeps_first_table() {
        let catalog = RecordTypeCatalog::from_table_names(["dbo.PUBACC_HD", "dbo.OTHER_hd"]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.table_for("HD"), Some("dbo.PUBACC_HD"));
    }

    #[test]
    fn test_unknown_and_empty_record_types() {
        let schema = parse_definitions("create table dbo.PUBACC_ZZ\n(\n)\n");
        let catalog = RecordTypeCatalog::from_schema(&schema);
        assert!(catalog.contains("ZZ"));
        assert!(matches!(
            catalog.columns_for("ZZ", &schema),
            Err(UlsError::RecordTypeUnknown(code)) if code == "ZZ"
        ));
        assert!(matches!(
            catalog.columns_for("HD", &schema),
            Err(UlsError::RecordTypeUnknown(_))
        ));
    }
}
