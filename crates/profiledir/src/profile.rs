//! Core profile types for profiledir.
//!
//! This module defines the profile record and the set of caller-supplied
//! fields used to create or update one.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::DataUrl;
use crate::error::Result;

/// Maximum number of address characters shown in summaries.
const ADDRESS_PREVIEW_CHARS: usize = 50;

/// A single profile in the directory.
///
/// Serialized with camelCase keys in declaration order. Missing text fields
/// deserialize as empty strings and a missing document as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Unique identifier, fixed at creation.
    pub id: i64,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Contact email.
    #[serde(default)]
    pub email: String,

    /// Date of birth as entered.
    #[serde(default)]
    pub dob: String,

    /// Postal address.
    #[serde(default)]
    pub address: String,

    /// Label for the kind of document (e.g. "Passport").
    #[serde(default)]
    pub document_name: String,

    /// Original file name of the uploaded document, empty if none.
    #[serde(default)]
    pub document_file_name: String,

    /// Embedded document, if one was uploaded.
    #[serde(default)]
    pub document_content: Option<DataUrl>,
}

/// Caller-supplied text fields for a create or update.
///
/// Every field replaces the stored value on update. Document file name and
/// content are not part of the field set; they come from the raw file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSet {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Date of birth.
    pub dob: String,
    /// Postal address.
    pub address: String,
    /// Label for the kind of document.
    pub document_name: String,
}

impl FieldSet {
    /// Create a field set with just a name and email.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Set the date of birth.
    #[must_use]
    pub fn with_dob(mut self, dob: impl Into<String>) -> Self {
        self.dob = dob.into();
        self
    }

    /// Set the address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Set the document label.
    #[must_use]
    pub fn with_document_name(mut self, document_name: impl Into<String>) -> Self {
        self.document_name = document_name.into();
        self
    }
}

impl From<&Profile> for FieldSet {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            email: profile.email.clone(),
            dob: profile.dob.clone(),
            address: profile.address.clone(),
            document_name: profile.document_name.clone(),
        }
    }
}

impl Profile {
    /// Build a new profile from fields and optional document metadata.
    #[must_use]
    pub fn new(
        id: i64,
        fields: FieldSet,
        document_file_name: String,
        document_content: Option<DataUrl>,
    ) -> Self {
        let FieldSet {
            name,
            email,
            dob,
            address,
            document_name,
        } = fields;
        Self {
            id,
            name,
            email,
            dob,
            address,
            document_name,
            document_file_name,
            document_content,
        }
    }

    /// Overwrite the text fields, keeping id and document untouched.
    pub fn apply_fields(&mut self, fields: FieldSet) {
        self.name = fields.name;
        self.email = fields.email;
        self.dob = fields.dob;
        self.address = fields.address;
        self.document_name = fields.document_name;
    }

    /// Whether an embedded document is stored.
    #[must_use]
    pub fn has_document(&self) -> bool {
        self.document_content.is_some()
    }

    /// Date of birth for display.
    #[must_use]
    pub fn dob_label(&self) -> &str {
        if self.dob.is_empty() {
            "Date Not Set"
        } else {
            &self.dob
        }
    }

    /// Address for display, truncated to a short preview.
    #[must_use]
    pub fn address_preview(&self) -> String {
        if self.address.is_empty() {
            return "Address Missing".to_string();
        }
        let preview: String = self.address.chars().take(ADDRESS_PREVIEW_CHARS).collect();
        format!("{preview}...")
    }

    /// Document label for display.
    #[must_use]
    pub fn document_label(&self) -> &str {
        if self.document_name.is_empty() {
            "No Document Listed"
        } else {
            &self.document_name
        }
    }

    /// Document file name for display.
    #[must_use]
    pub fn document_file_label(&self) -> &str {
        if self.document_file_name.is_empty() {
            "N/A"
        } else {
            &self.document_file_name
        }
    }

    /// Render the profile as pretty JSON with four-space indentation.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_export_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| crate::Error::internal(e.to_string()))
    }

    /// File name used when exporting this profile as JSON.
    ///
    /// Whitespace becomes `_`; anything else outside ASCII `[A-Za-z0-9_]`
    /// is dropped.
    #[must_use]
    pub fn export_file_name(&self) -> String {
        static WHITESPACE: OnceLock<Regex> = OnceLock::new();
        static NON_WORD: OnceLock<Regex> = OnceLock::new();

        let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s").expect("valid regex"));
        let non_word =
            NON_WORD.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid regex"));

        let underscored = whitespace.replace_all(&self.name, "_");
        let cleaned = non_word.replace_all(&underscored, "");
        format!("{cleaned}_Profile.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile() -> Profile {
        Profile::new(
            1_700_000_000_000,
            FieldSet::new("Ada Lovelace", "ada@example.com")
                .with_dob("1815-12-10")
                .with_address("12 St James's Square, London")
                .with_document_name("Passport"),
            String::new(),
            None,
        )
    }

    #[test]
    fn test_profile_new() {
        let profile = sample_profile();
        assert_eq!(profile.id, 1_700_000_000_000);
        assert_eq!(profile.name, "Ada Lovelace");
        assert_eq!(profile.document_name, "Passport");
        assert!(profile.document_file_name.is_empty());
        assert!(!profile.has_document());
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let json = serde_json::to_string(&sample_profile()).unwrap();
        assert!(json.starts_with(r#"{"id":1700000000000,"name":"Ada Lovelace""#));
        assert!(json.contains(r#""documentName":"Passport""#));
        assert!(json.contains(r#""documentFileName":"""#));
        assert!(json.ends_with(r#""documentContent":null}"#));
    }

    #[test]
    fn test_deserialize_missing_fields() {
        let profile: Profile = serde_json::from_str(r#"{"id":5,"name":"A"}"#).unwrap();
        assert_eq!(profile.id, 5);
        assert_eq!(profile.name, "A");
        assert!(profile.email.is_empty());
        assert!(profile.document_file_name.is_empty());
        assert!(profile.document_content.is_none());
    }

    #[test]
    fn test_deserialize_with_document() {
        let json = r#"{"id":7,"name":"B","documentFileName":"id.png","documentContent":"data:image/png;base64,AAEC"}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert!(profile.has_document());
        assert_eq!(
            profile.document_content.unwrap().as_str(),
            "data:image/png;base64,AAEC"
        );
    }

    #[test]
    fn test_apply_fields_keeps_document() {
        let mut profile = sample_profile();
        profile.document_file_name = "scan.pdf".to_string();
        profile.document_content = Some(DataUrl::encode("application/pdf", b"%PDF"));

        profile.apply_fields(FieldSet::new("Ada King", "ada@king.example"));

        assert_eq!(profile.name, "Ada King");
        assert!(profile.dob.is_empty());
        assert_eq!(profile.document_file_name, "scan.pdf");
        assert!(profile.has_document());
    }

    #[test]
    fn test_field_set_from_profile() {
        let profile = sample_profile();
        let fields = FieldSet::from(&profile);
        assert_eq!(fields.name, profile.name);
        assert_eq!(fields.address, profile.address);
        assert_eq!(fields.document_name, profile.document_name);
    }

    #[test]
    fn test_display_labels_defaults() {
        let profile = Profile::new(1, FieldSet::new("A", "a@x.com"), String::new(), None);
        assert_eq!(profile.dob_label(), "Date Not Set");
        assert_eq!(profile.address_preview(), "Address Missing");
        assert_eq!(profile.document_label(), "No Document Listed");
        assert_eq!(profile.document_file_label(), "N/A");
    }

    #[test]
    fn test_address_preview_truncates() {
        let mut profile = sample_profile();
        profile.address = "x".repeat(80);
        let preview = profile.address_preview();
        assert_eq!(preview.len(), 53);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_export_json_uses_four_space_indent() {
        let json = sample_profile().to_export_json().unwrap();
        assert!(json.starts_with("{\n    \"id\": 1700000000000,"));
        assert!(json.contains("\n    \"documentContent\": null\n}"));
    }

    #[test]
    fn test_export_file_name() {
        let profile = sample_profile();
        assert_eq!(profile.export_file_name(), "Ada_Lovelace_Profile.json");

        let mut odd = sample_profile();
        odd.name = "O'Brien, Jr.  (2)".to_string();
        assert_eq!(odd.export_file_name(), "OBrien_Jr__2_Profile.json");
    }

    #[test]
    fn test_export_file_name_drops_non_ascii_letters() {
        let mut profile = sample_profile();
        profile.name = "José Núñez".to_string();
        assert_eq!(profile.export_file_name(), "Jos_Nez_Profile.json");
    }
}
