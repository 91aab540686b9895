//! Field-level constraints, kept apart from the record shapes.
//!
//! Each entity owns a [`RuleTable`] keyed by the external (camelCase) field
//! name. Inputs run their raw values through the table before anything is
//! written, so trimming, casing and presence checks are applied the same way
//! on create and update.

use serde::{Deserialize, Deserializer};

use crate::error::{HrError, HrResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Normalize {
    Keep,
    Trim,
    TrimUpper,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldRule {
    pub field: &'static str,
    pub required: bool,
    pub normalize: Normalize,
    pub unique: bool,
}

impl FieldRule {
    pub const fn optional(field: &'static str) -> Self {
        Self {
            field,
            required: false,
            normalize: Normalize::Keep,
            unique: false,
        }
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn trimmed(self) -> Self {
        Self {
            normalize: Normalize::Trim,
            ..self
        }
    }

    pub const fn upper(self) -> Self {
        Self {
            normalize: Normalize::TrimUpper,
            ..self
        }
    }

    pub const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }

    /// Normalizes a text value. Trimmed values that end up empty count as absent.
    pub fn apply(&self, value: Option<String>) -> HrResult<Option<String>> {
        let normalized = value.and_then(|raw| self.normalize(raw));
        self.check_present(normalized.is_some())?;
        Ok(normalized)
    }

    pub fn normalize(&self, raw: String) -> Option<String> {
        match self.normalize {
            Normalize::Keep => Some(raw),
            Normalize::Trim => non_empty(raw.trim().to_string()),
            Normalize::TrimUpper => non_empty(raw.trim().to_uppercase()),
        }
    }

    pub fn check_present(&self, present: bool) -> HrResult<()> {
        if self.required && !present {
            return Err(HrError::MissingRequiredField { field: self.field });
        }
        Ok(())
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[derive(Clone, Copy, Debug)]
pub struct RuleTable {
    pub entity: &'static str,
    pub rules: &'static [FieldRule],
}

impl RuleTable {
    pub fn get(&self, field: &str) -> Option<&'static FieldRule> {
        self.rules.iter().find(|rule| rule.field == field)
    }

    fn rule(&self, field: &'static str) -> FieldRule {
        self.get(field)
            .copied()
            .unwrap_or(FieldRule::optional(field))
    }

    pub fn is_unique(&self, field: &'static str) -> bool {
        self.rule(field).unique
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &'static str> {
        self.rules
            .iter()
            .filter(|rule| rule.unique)
            .map(|rule| rule.field)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> {
        self.rules
            .iter()
            .filter(|rule| rule.required)
            .map(|rule| rule.field)
    }

    /// Normalized form of a lookup key, without presence checks.
    pub fn lookup_key(&self, field: &'static str, raw: &str) -> Option<String> {
        self.rule(field).normalize(raw.to_string())
    }

    pub fn text(&self, field: &'static str, value: Option<String>) -> HrResult<Option<String>> {
        self.rule(field).apply(value)
    }

    /// Text for a field the table marks required. Presence is decided by the
    /// table; a field it does not mark required is refused as misconfigured.
    pub fn required_text(&self, field: &'static str, value: Option<String>) -> HrResult<String> {
        let normalized = self.text(field, value)?;
        self.unwrap_required(field, normalized)
    }

    pub fn required_value<T>(&self, field: &'static str, value: Option<T>) -> HrResult<T> {
        self.rule(field).check_present(value.is_some())?;
        self.unwrap_required(field, value)
    }

    fn unwrap_required<T>(&self, field: &'static str, value: Option<T>) -> HrResult<T> {
        value.ok_or_else(|| {
            HrError::mismatch(
                field,
                format!("no value and no required rule in the {} table", self.entity),
            )
        })
    }

    /// Normalization for changes: a provided value must still satisfy the rule,
    /// an omitted one leaves the stored value alone.
    pub fn changed_text(
        &self,
        field: &'static str,
        value: Option<String>,
    ) -> HrResult<Option<String>> {
        match value {
            Some(raw) => self.text(field, Some(raw)),
            None => Ok(None),
        }
    }

    /// Like [`Self::changed_text`] for nullable columns: `Some(None)` clears the value.
    pub fn changed_nullable_text(
        &self,
        field: &'static str,
        value: Option<Option<String>>,
    ) -> HrResult<Option<Option<String>>> {
        match value {
            Some(inner) => self.text(field, inner).map(Some),
            None => Ok(None),
        }
    }
}

/// Distinguishes an explicit `null` from an omitted field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub(crate) fn non_negative(field: &'static str, value: i32) -> HrResult<i32> {
    if value < 0 {
        return Err(HrError::mismatch(field, "must not be negative"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: RuleTable = RuleTable {
        entity: "sample",
        rules: &[
            FieldRule::optional("code").required().upper().unique(),
            FieldRule::optional("name").required().trimmed(),
            FieldRule::optional("alias").trimmed(),
            FieldRule::optional("notes"),
        ],
    };

    #[test]
    fn uppercases_and_trims_codes() {
        let code = TABLE.required_text("code", Some("  eng-01 ".into())).unwrap();
        assert_eq!(code, "ENG-01");
    }

    #[test]
    fn blank_required_text_is_missing() {
        let err = TABLE.required_text("name", Some("   ".into())).unwrap_err();
        assert!(matches!(err, HrError::MissingRequiredField { field: "name" }));
    }

    #[test]
    fn blank_optional_text_becomes_absent() {
        assert_eq!(TABLE.text("alias", Some(" \t".into())).unwrap(), None);
    }

    #[test]
    fn untouched_fields_keep_whitespace() {
        let notes = TABLE.text("notes", Some("  indented".into())).unwrap();
        assert_eq!(notes.as_deref(), Some("  indented"));
    }

    #[test]
    fn clearing_a_required_field_fails() {
        let err = TABLE
            .changed_nullable_text("name", Some(None))
            .unwrap_err();
        assert!(matches!(err, HrError::MissingRequiredField { field: "name" }));
        assert_eq!(TABLE.changed_text("name", None).unwrap(), None);
    }

    #[test]
    fn presence_follows_the_table() {
        let err = TABLE.required_value::<u32>("code", None).unwrap_err();
        assert!(matches!(err, HrError::MissingRequiredField { field: "code" }));

        let err = TABLE.required_value::<u32>("notes", None).unwrap_err();
        assert!(matches!(err, HrError::TypeMismatch { .. }));
        assert_eq!(TABLE.required_value("notes", Some(3)).unwrap(), 3);

        let err = TABLE.required_text("alias", Some("  ".into())).unwrap_err();
        assert!(matches!(err, HrError::TypeMismatch { .. }));
    }

    #[test]
    fn uniqueness_is_read_from_the_table() {
        assert!(TABLE.is_unique("code"));
        assert!(!TABLE.is_unique("name"));
        assert!(!TABLE.is_unique("unlisted"));
    }

    #[test]
    fn lists_unique_and_required_fields() {
        assert_eq!(TABLE.unique_fields().collect::<Vec<_>>(), vec!["code"]);
        assert_eq!(
            TABLE.required_fields().collect::<Vec<_>>(),
            vec!["code", "name"]
        );
    }
}
