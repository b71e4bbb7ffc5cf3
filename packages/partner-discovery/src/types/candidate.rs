//! Partner candidates produced by extraction.

use serde::{Deserialize, Serialize};

/// A partner or integration found on a directory page.
///
/// Built by an extractor from raw service output and never mutated
/// afterwards. Field names serialize in camelCase, which is the shape the
/// persistence layer consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerCandidate {
    /// Display name of the partner (required, non-empty after trim)
    pub partner_name: String,

    /// Partner's own website, if the directory linked one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// Directory category (e.g. "CRM", "Payments")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Partner type (e.g. "Brand", "Person", "Place")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_type: Option<String>,

    /// Free-form description from the listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Estimated audience reach
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_reach: Option<u64>,

    /// Page the candidate was extracted from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl PartnerCandidate {
    /// Create a candidate with just a name.
    pub fn new(partner_name: impl Into<String>) -> Self {
        Self {
            partner_name: partner_name.into(),
            website: None,
            category: None,
            partner_type: None,
            notes: None,
            inferred_reach: None,
            source_url: None,
        }
    }

    /// Set the website.
    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the partner type.
    pub fn with_partner_type(mut self, partner_type: impl Into<String>) -> Self {
        self.partner_type = Some(partner_type.into());
        self
    }

    /// Set the notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Set the inferred reach.
    pub fn with_inferred_reach(mut self, reach: u64) -> Self {
        self.inferred_reach = Some(reach);
        self
    }

    /// Set the source URL.
    pub fn with_source_url(mut self, source_url: impl Into<String>) -> Self {
        self.source_url = Some(source_url.into());
        self
    }

    /// Whether this candidate is worth keeping.
    ///
    /// A blank name, or a listing with neither a website nor notes, is
    /// treated as extraction noise (stray logos, nav items).
    pub fn is_usable(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        !self.partner_name.trim().is_empty() && (present(&self.website) || present(&self.notes))
    }
}
