//! Participant Record - who takes part in experiments

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record_meta::RecordMeta;
use crate::store::{Record, RecordKey, RecordKind};

/// Participant Record holds a participant's identity and demographics.
///
/// The participant id is the unique key. Demographic fields are plain
/// data; `attributes` holds any study-specific extras.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantRecord {
    kind: RecordKind,
    participant_id: String,
    #[serde(flatten)]
    meta: RecordMeta,
    #[serde(flatten)]
    profile: ParticipantProfile,
}

impl ParticipantRecord {
    /// Create a participant record with the given profile.
    #[must_use]
    pub fn new(participant_id: impl Into<String>, profile: ParticipantProfile) -> Self {
        Self {
            kind: RecordKind::Participant,
            participant_id: participant_id.into(),
            meta: RecordMeta::new(),
            profile,
        }
    }

    /// Get the participant ID.
    #[must_use]
    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// Identification metadata.
    #[must_use]
    pub const fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    /// Demographics.
    #[must_use]
    pub const fn profile(&self) -> &ParticipantProfile {
        &self.profile
    }

    pub(crate) fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    pub(crate) fn profile_mut(&mut self) -> &mut ParticipantProfile {
        &mut self.profile
    }
}

impl Record for ParticipantRecord {
    const KIND: RecordKind = RecordKind::Participant;

    fn key(&self) -> RecordKey {
        RecordKey::participant(&self.participant_id)
    }
}

/// Demographic fields of a participant.
///
/// Built with chained setters:
///
/// ```rust
/// use expflow::experiment::ParticipantProfile;
///
/// let profile = ParticipantProfile::new()
///     .age(24.0)
///     .language("en-GB")
///     .group("control");
/// assert_eq!(profile.group_name(), Some("control"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParticipantProfile {
    #[serde(default)]
    dob: Option<NaiveDate>,
    #[serde(default)]
    age: Option<f64>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    comments: Option<String>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, serde_json::Value>,
}

impl ParticipantProfile {
    /// Empty profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the date of birth.
    #[must_use]
    pub const fn dob(mut self, dob: NaiveDate) -> Self {
        self.dob = Some(dob);
        self
    }

    /// Set the age in years.
    #[must_use]
    pub const fn age(mut self, age: f64) -> Self {
        self.age = Some(age);
        self
    }

    /// Set the gender.
    #[must_use]
    pub fn gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    /// Set the language and region code.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set free-text comments.
    #[must_use]
    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// Set the participant group.
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Set a study-specific attribute.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Date of birth.
    #[must_use]
    pub const fn date_of_birth(&self) -> Option<NaiveDate> {
        self.dob
    }

    /// Age in years.
    #[must_use]
    pub const fn age_years(&self) -> Option<f64> {
        self.age
    }

    /// Gender.
    #[must_use]
    pub fn gender_label(&self) -> Option<&str> {
        self.gender.as_deref()
    }

    /// Language and region code.
    #[must_use]
    pub fn language_code(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Free-text comments.
    #[must_use]
    pub fn comment_text(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    /// Participant group.
    #[must_use]
    pub fn group_name(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Study-specific attributes.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.attributes
    }

    pub(crate) fn set_comments(&mut self, comments: Option<String>) {
        self.comments = comments;
    }

    pub(crate) fn append_comment(&mut self, line: &str) {
        self.comments = Some(match self.comments.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{line}"),
            _ => line.to_string(),
        });
    }

    pub(crate) fn set_group(&mut self, group: Option<String>) {
        self.group = group;
    }

    pub(crate) fn set_language(&mut self, language: Option<String>) {
        self.language = language;
    }

    pub(crate) fn set_attribute(&mut self, key: String, value: serde_json::Value) {
        self.attributes.insert(key, value);
    }
}
