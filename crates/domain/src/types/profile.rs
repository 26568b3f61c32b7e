//! Profile record types
//!
//! One [`ProfileRecord`] exists per identity in the remote store. Column
//! names match the `profiles` table.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::identity::{Identity, UserId};
use crate::constants::MAX_TEXT_FIELD_LENGTH;

/// Rejected local edit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { field: field.into(), reason: reason.into() }
    }
}

/// Gender as stored in the profile. Unset is stored as `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Gender {
    #[default]
    Unset,
    Male,
    Female,
    Other,
}

impl Gender {
    #[must_use]
    pub const fn as_str(self) -> Option<&'static str> {
        match self {
            Self::Unset => None,
            Self::Male => Some("male"),
            Self::Female => Some("female"),
            Self::Other => Some("other"),
        }
    }
}

impl FromStr for Gender {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "notset" => Ok(Self::Unset),
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            other => Err(FieldError::new("gender", format!("unknown value '{other}'"))),
        }
    }
}

impl Serialize for Gender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str() {
            Some(value) => serializer.serialize_some(value),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Gender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.as_deref().map_or(Ok(Self::Unset), |value| {
            value.parse().map_err(serde::de::Error::custom)
        })
    }
}

/// Editable profile fields, addressed by column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    FullName,
    Gender,
    DateOfBirth,
    Location,
    Mobile,
    AlternateMobile,
    HintName,
}

impl ProfileField {
    pub const ALL: [Self; 7] = [
        Self::FullName,
        Self::Gender,
        Self::DateOfBirth,
        Self::Location,
        Self::Mobile,
        Self::AlternateMobile,
        Self::HintName,
    ];

    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::FullName => "full_name",
            Self::Gender => "gender",
            Self::DateOfBirth => "date_of_birth",
            Self::Location => "location",
            Self::Mobile => "mobile",
            Self::AlternateMobile => "alternate_mobile",
            Self::HintName => "hint_name",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for ProfileField {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Err(FieldError::new("email", "Email cannot be changed")),
            "id" | "updated_at" => Err(FieldError::new(s, "field is managed by the store")),
            _ => Self::ALL
                .into_iter()
                .find(|field| field.column() == s)
                .ok_or_else(|| FieldError::new(s, "unknown profile field")),
        }
    }
}

/// Minimal data used to materialize a missing profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSeed {
    pub email: Option<String>,
}

impl From<&Identity> for ProfileSeed {
    fn from(identity: &Identity) -> Self {
        Self { email: identity.email.clone() }
    }
}

/// Persisted, identity-keyed profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: UserId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub alternate_mobile: Option<String>,
    #[serde(default)]
    pub hint_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfileRecord {
    /// Empty record keyed by `id`.
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            full_name: None,
            gender: Gender::Unset,
            date_of_birth: None,
            location: None,
            mobile: None,
            alternate_mobile: None,
            hint_name: None,
            email: None,
            updated_at: None,
        }
    }

    /// Record inserted when an identity has no row yet.
    #[must_use]
    pub fn seeded(id: UserId, seed: ProfileSeed, now: DateTime<Utc>) -> Self {
        Self { email: seed.email, updated_at: Some(now), ..Self::new(id) }
    }

    /// Re-key the record to `identity` and refresh the denormalized email.
    #[must_use]
    pub fn owned_by(mut self, identity: &Identity) -> Self {
        self.id = identity.id.clone();
        self.email.clone_from(&identity.email);
        self
    }

    /// Current value of `field` as form text. Unset values read as `""`.
    #[must_use]
    pub fn get(&self, field: ProfileField) -> String {
        match field {
            ProfileField::FullName => self.full_name.clone().unwrap_or_default(),
            ProfileField::Gender => self.gender.as_str().unwrap_or_default().to_string(),
            ProfileField::DateOfBirth => {
                self.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
            }
            ProfileField::Location => self.location.clone().unwrap_or_default(),
            ProfileField::Mobile => self.mobile.clone().unwrap_or_default(),
            ProfileField::AlternateMobile => self.alternate_mobile.clone().unwrap_or_default(),
            ProfileField::HintName => self.hint_name.clone().unwrap_or_default(),
        }
    }

    /// Replace one field from form text. An empty value clears the field.
    ///
    /// # Errors
    /// Returns [`FieldError`] when the value is too long, not a valid date,
    /// or not a known gender. The record is unchanged on error.
    pub fn set(&mut self, field: ProfileField, value: &str) -> Result<(), FieldError> {
        match field {
            ProfileField::Gender => self.gender = value.parse()?,
            ProfileField::DateOfBirth => {
                self.date_of_birth = if value.trim().is_empty() {
                    None
                } else {
                    Some(NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
                        FieldError::new(field.column(), format!("invalid date: {e}"))
                    })?)
                };
            }
            ProfileField::FullName
            | ProfileField::Location
            | ProfileField::Mobile
            | ProfileField::AlternateMobile
            | ProfileField::HintName => {
                let text = optional_text(field, value)?;
                let slot = match field {
                    ProfileField::FullName => &mut self.full_name,
                    ProfileField::Location => &mut self.location,
                    ProfileField::Mobile => &mut self.mobile,
                    ProfileField::AlternateMobile => &mut self.alternate_mobile,
                    _ => &mut self.hint_name,
                };
                *slot = text;
            }
        }
        Ok(())
    }
}

fn optional_text(field: ProfileField, value: &str) -> Result<Option<String>, FieldError> {
    if value.chars().count() > MAX_TEXT_FIELD_LENGTH {
        return Err(FieldError::new(
            field.column(),
            format!("must be at most {MAX_TEXT_FIELD_LENGTH} characters"),
        ));
    }
    Ok((!value.is_empty()).then(|| value.to_string()))
}
