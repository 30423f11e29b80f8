//! Case identifier extraction from order document text
//!
//! The case number is matched against whitespace-stripped text so numbers
//! broken across lines by the PDF text layer still match. The declared
//! quantity and the referenced domain are matched against the raw text,
//! since their patterns depend on the spacing around them.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::WorkflowProfile;
use crate::error::{FolderError, Issue, Outcome};

static DIGITS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Identifiers pulled out of an order document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCase {
    pub document_number: String,
    pub declared_quantity: Option<u64>,
    pub reference_domain: Option<String>,
}

/// Compiled pattern set of one workflow
#[derive(Debug, Clone)]
pub struct CaseIdentifierExtractor {
    case_patterns: Vec<Regex>,
    quantity: Option<Regex>,
    reference_domain: Option<Regex>,
}

fn compile(pattern: &str) -> Result<Regex, FolderError> {
    Regex::new(pattern).map_err(|e| FolderError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Remove every whitespace character, including line breaks and full-width spaces
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

impl CaseIdentifierExtractor {
    pub fn new<S: AsRef<str>>(
        case_patterns: &[S],
        quantity: Option<&str>,
        reference_domain: Option<&str>,
    ) -> Result<Self, FolderError> {
        Ok(Self {
            case_patterns: case_patterns.iter().map(|p| compile(p.as_ref())).collect::<Result<_, _>>()?,
            quantity: quantity.map(compile).transpose()?,
            reference_domain: reference_domain.map(compile).transpose()?,
        })
    }

    pub fn from_profile(profile: &WorkflowProfile) -> Result<Self, FolderError> {
        Self::new(
            profile.case_number_patterns.as_slice(),
            profile.quantity_pattern.as_deref(),
            profile.reference_domain_pattern.as_deref(),
        )
    }

    /// First case-number pattern that matches the whitespace-stripped text
    pub fn case_number(&self, text: &str) -> Option<String> {
        let compact = strip_whitespace(text);
        self.case_patterns
            .iter()
            .find_map(|re| re.find(&compact))
            .map(|m| m.as_str().to_string())
    }

    /// Declared domain quantity; capture group 1 when present, else the first digit run
    pub fn declared_quantity(&self, text: &str) -> Option<u64> {
        let re = self.quantity.as_ref()?;
        let caps = re.captures(text)?;
        let digits = match caps.get(1) {
            Some(group) => group.as_str().to_string(),
            None => DIGITS_REGEX.find(caps.get(0)?.as_str())?.as_str().to_string(),
        };
        let parsed = parse_declared_digits(&digits);
        if parsed.is_none() {
            warn!("Declared quantity {:?} is not a number", digits);
        }
        parsed
    }

    /// Domain named in the order text, lower-cased
    pub fn reference_domain(&self, text: &str) -> Option<String> {
        let re = self.reference_domain.as_ref()?;
        let caps = re.captures(text)?;
        let found = caps.get(1).or_else(|| caps.get(0))?;
        Some(found.as_str().trim().to_lowercase())
    }

    /// Extract all identifiers. A missing case number is fatal; a missing
    /// quantity or reference domain is an issue when the workflow asks for it.
    pub fn extract(&self, text: &str) -> Result<Outcome<ExtractedCase>, FolderError> {
        let document_number = self.case_number(text).ok_or(FolderError::MissingCaseNumber)?;
        debug!("Extracted document number {}", document_number);

        let mut issues = Vec::new();

        let declared_quantity = self.declared_quantity(text);
        if self.quantity.is_some() && declared_quantity.is_none() {
            warn!("Order document {} declares no domain quantity", document_number);
            issues.push(Issue::MissingQuantity);
        }

        let reference_domain = self.reference_domain(text);
        if self.reference_domain.is_some() && reference_domain.is_none() {
            warn!("Order document {} names no reference domain", document_number);
            issues.push(Issue::MissingReferenceDomain);
        }

        Ok(Outcome::with_issues(
            ExtractedCase { document_number, declared_quantity, reference_domain },
            issues,
        ))
    }
}

/// Parse a digit run that may use full-width digits, as typed in Chinese documents
fn parse_declared_digits(digits: &str) -> Option<u64> {
    let ascii: String = digits
        .trim()
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            other => other,
        })
        .collect();
    ascii.parse().ok()
}
