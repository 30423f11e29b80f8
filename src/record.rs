//! Domain records and folder-level metadata

use serde::Serialize;

use crate::config::MetadataDefaults;
use crate::table::CanonicalRow;

/// One requested domain, numbered densely from 1 in merged input order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainRecord {
    pub index: usize,
    pub domain: String,
    pub category: String,
}

/// Header-context fields, taken from the first table row only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseMetadata {
    pub contact_email: String,
    pub legal_basis: String,
    pub requesting_unit: String,
    pub complaint_channel: String,
}

impl CaseMetadata {
    pub fn from_defaults(defaults: &MetadataDefaults) -> Self {
        Self {
            contact_email: defaults.contact_email.clone(),
            legal_basis: defaults.legal_basis.clone(),
            requesting_unit: defaults.requesting_unit.clone(),
            complaint_channel: defaults.complaint_channel.clone(),
        }
    }

    /// Metadata of `first`, each absent field replaced by its default
    pub fn from_first_row(first: Option<&CanonicalRow>, defaults: &MetadataDefaults) -> Self {
        let Some(row) = first else {
            return Self::from_defaults(defaults);
        };
        let pick = |value: &Option<String>, fallback: &String| value.clone().unwrap_or_else(|| fallback.clone());
        Self {
            contact_email: pick(&row.contact_email, &defaults.contact_email),
            legal_basis: pick(&row.legal_basis, &defaults.legal_basis),
            requesting_unit: pick(&row.requesting_unit, &defaults.requesting_unit),
            complaint_channel: pick(&row.complaint_channel, &defaults.complaint_channel),
        }
    }
}

/// Number the canonical rows and fill missing categories from the defaults
pub fn build_records(rows: &[CanonicalRow], defaults: &MetadataDefaults) -> Vec<DomainRecord> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| DomainRecord {
            index: i + 1,
            domain: row.domain.clone(),
            category: row.category.clone().unwrap_or_else(|| defaults.category.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> MetadataDefaults {
        MetadataDefaults {
            category: "未分類".to_string(),
            contact_email: "未提供".to_string(),
            legal_basis: "未提供".to_string(),
            requesting_unit: "未提供".to_string(),
            complaint_channel: "未提供".to_string(),
        }
    }

    fn row(domain: &str, category: Option<&str>) -> CanonicalRow {
        CanonicalRow {
            domain: domain.to_string(),
            category: category.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_indices_are_dense_and_one_based() {
        let rows = vec![row("a.com", Some("賭博")), row("a.com", None), row("c.com", None)];
        let records = build_records(&rows, &defaults());
        let indices: Vec<usize> = records.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(records[0].category, "賭博");
        assert_eq!(records[1].category, "未分類");
    }

    #[test]
    fn test_metadata_from_first_row_with_fallback() {
        let first = CanonicalRow {
            domain: "a.com".to_string(),
            contact_email: Some("officer@165.gov.tw".to_string()),
            legal_basis: Some("詐欺犯罪危害防制條例".to_string()),
            ..Default::default()
        };
        let meta = CaseMetadata::from_first_row(Some(&first), &defaults());
        assert_eq!(meta.contact_email, "officer@165.gov.tw");
        assert_eq!(meta.legal_basis, "詐欺犯罪危害防制條例");
        assert_eq!(meta.requesting_unit, "未提供");
    }

    #[test]
    fn test_metadata_without_rows_uses_defaults() {
        assert_eq!(CaseMetadata::from_first_row(None, &defaults()), CaseMetadata::from_defaults(&defaults()));
    }
}
