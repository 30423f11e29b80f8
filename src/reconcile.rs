//! Cross-checks between the order document and the parsed tables

use tracing::{info, warn};

use crate::case_id::ExtractedCase;
use crate::error::Issue;
use crate::record::DomainRecord;

/// Compare the first table domain against the domain named in the order text.
/// Nothing is checked when the order text names no domain.
pub fn check_first_domain(records: &[DomainRecord], reference_domain: Option<&str>) -> Option<Issue> {
    let document = reference_domain?;
    let first = records.first().map(|r| r.domain.as_str());
    if first == Some(document) {
        info!("First domain matches the order document: {}", document);
        return None;
    }
    warn!("First domain {:?} does not match order document domain {}", first, document);
    Some(Issue::FirstDomainMismatch {
        table: first.map(str::to_string),
        document: document.to_string(),
    })
}

/// Compare the merged row count against the declared quantity.
/// Nothing is checked when no quantity was declared.
pub fn check_quantity(records: &[DomainRecord], declared: Option<u64>) -> Option<Issue> {
    let declared = declared?;
    let actual = records.len();
    if u64::try_from(actual).is_ok_and(|n| n == declared) {
        info!("Domain count {} matches the order document", actual);
        return None;
    }
    warn!("Domain count {} does not match declared {}", actual, declared);
    Some(Issue::QuantityMismatch { declared, actual })
}

/// Run both checks; missing quantity or domain was already reported by extraction
pub fn reconcile(records: &[DomainRecord], case: &ExtractedCase) -> Vec<Issue> {
    check_first_domain(records, case.reference_domain.as_deref())
        .into_iter()
        .chain(check_quantity(records, case.declared_quantity))
        .collect()
}
