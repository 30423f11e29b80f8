//! Domain classification against the reference sets
//!
//! The three checks are independent: one domain may land in every list.

use tracing::debug;

use crate::domain_utils::{is_malformed, tld_of};
use crate::error::Issue;
use crate::record::DomainRecord;
use crate::reference::{ReferenceSets, TldSet, WhitelistSet};

/// Classification result; each list keeps input order and duplicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationFindings {
    pub records: Vec<DomainRecord>,
    pub malformed: Vec<String>,
    pub whitelist_hits: Vec<String>,
    pub invalid_tlds: Vec<String>,
}

impl ValidationFindings {
    /// One count issue per non-empty list
    pub fn issues(&self) -> Vec<Issue> {
        let mut issues = Vec::new();
        if !self.malformed.is_empty() {
            issues.push(Issue::MalformedDomains(self.malformed.len()));
        }
        if !self.whitelist_hits.is_empty() {
            issues.push(Issue::WhitelistHits(self.whitelist_hits.len()));
        }
        if !self.invalid_tlds.is_empty() {
            issues.push(Issue::InvalidTlds(self.invalid_tlds.len()));
        }
        issues
    }
}

/// Classifies domains using reference sets loaded once per run
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    tlds: &'a TldSet,
    whitelist: &'a WhitelistSet,
}

impl<'a> Validator<'a> {
    pub fn new(tlds: &'a TldSet, whitelist: &'a WhitelistSet) -> Self {
        Self { tlds, whitelist }
    }

    pub fn from_sets(sets: &'a ReferenceSets) -> Self {
        Self::new(&sets.tlds, &sets.whitelist)
    }

    pub fn is_whitelisted(&self, domain: &str) -> bool {
        self.whitelist.contains(domain)
    }

    pub fn is_invalid_tld(&self, domain: &str) -> bool {
        !self.tlds.contains(tld_of(domain))
    }

    pub fn validate(&self, records: Vec<DomainRecord>) -> ValidationFindings {
        let mut findings = ValidationFindings::default();

        for record in &records {
            let domain = record.domain.as_str();
            if is_malformed(domain) {
                findings.malformed.push(domain.to_string());
            }
            if self.is_whitelisted(domain) {
                findings.whitelist_hits.push(domain.to_string());
            }
            if self.is_invalid_tld(domain) {
                findings.invalid_tlds.push(domain.to_string());
            }
        }

        debug!(
            "Validated {} domains: {} malformed, {} whitelisted, {} invalid TLD",
            records.len(),
            findings.malformed.len(),
            findings.whitelist_hits.len(),
            findings.invalid_tlds.len()
        );

        findings.records = records;
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(domains: &[&str]) -> Vec<DomainRecord> {
        domains
            .iter()
            .enumerate()
            .map(|(i, d)| DomainRecord { index: i + 1, domain: d.to_string(), category: String::new() })
            .collect()
    }

    fn sets() -> (TldSet, WhitelistSet) {
        (["com", "tw", "net"].into_iter().collect(), ["gov.tw", "google.com"].into_iter().collect())
    }

    #[test]
    fn test_invalid_tld() {
        let (tlds, whitelist) = sets();
        let validator = Validator::new(&tlds, &whitelist);
        assert!(validator.is_invalid_tld("example.zz"));
        assert!(!validator.is_invalid_tld("example.com"));
        assert!(validator.is_invalid_tld("localhost"));
    }

    #[test]
    fn test_categories_are_not_exclusive() {
        let (tlds, _) = sets();
        let whitelist: WhitelistSet = ["bad..zz"].into_iter().collect();
        let validator = Validator::new(&tlds, &whitelist);

        let findings = validator.validate(records(&["bad..zz"]));
        assert_eq!(findings.malformed, vec!["bad..zz"]);
        assert_eq!(findings.whitelist_hits, vec!["bad..zz"]);
        assert_eq!(findings.invalid_tlds, vec!["bad..zz"]);
    }

    #[test]
    fn test_findings_keep_order_and_duplicates() {
        let (tlds, whitelist) = sets();
        let validator = Validator::new(&tlds, &whitelist);

        let findings = validator.validate(records(&["a.zz", "google.com", "ok.com", "a.zz", "http://x.com"]));
        assert_eq!(findings.records.len(), 5);
        assert_eq!(findings.invalid_tlds, vec!["a.zz", "a.zz"]);
        assert_eq!(findings.whitelist_hits, vec!["google.com"]);
        assert_eq!(findings.malformed, vec!["http://x.com"]);
        assert_eq!(
            findings.issues(),
            vec![Issue::MalformedDomains(1), Issue::WhitelistHits(1), Issue::InvalidTlds(2)]
        );
    }

    #[test]
    fn test_clean_domains_raise_no_issues() {
        let (tlds, whitelist) = sets();
        let findings = Validator::new(&tlds, &whitelist).validate(records(&["shop.example.com", "x.net"]));
        assert!(findings.issues().is_empty());
    }
}
