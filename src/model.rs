use serde::{Deserialize, Serialize};

use crate::error::{HuntError, Result};

/// Maximum characters in a treasure ID.
pub const MAX_ID_LEN: usize = 9;
/// Maximum characters in a username.
pub const MAX_USERNAME_LEN: usize = 49;
/// Maximum characters in a clue.
pub const MAX_CLUE_LEN: usize = 49;

/// One treasure record. Field order matches the on-disk row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Treasure {
    pub id: String,
    pub username: String,
    pub longitude: f64,
    pub latitude: f64,
    pub clue: String,
    pub value: i64,
}

impl Treasure {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        longitude: f64,
        latitude: f64,
        clue: impl Into<String>,
        value: i64,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            longitude,
            latitude,
            clue: clue.into(),
            value,
        }
    }

    /// Replace every whitespace character in the free-text fields with `_`
    /// so no field contains the row delimiter.
    pub fn normalize(&mut self) {
        self.username = underscore_whitespace(&self.username);
        self.clue = underscore_whitespace(&self.clue);
    }

    /// Check field bounds. Call after `normalize`.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(invalid("id", "must not be empty"));
        }
        if self.id.chars().any(char::is_whitespace) {
            return Err(invalid("id", "must not contain whitespace"));
        }
        check_len("id", &self.id, MAX_ID_LEN)?;

        if self.username.is_empty() {
            return Err(invalid("username", "must not be empty"));
        }
        check_len("username", &self.username, MAX_USERNAME_LEN)?;

        if self.clue.is_empty() {
            return Err(invalid("clue", "must not be empty"));
        }
        check_len("clue", &self.clue, MAX_CLUE_LEN)?;

        if !self.longitude.is_finite() {
            return Err(invalid("longitude", "must be a finite number"));
        }
        if !self.latitude.is_finite() {
            return Err(invalid("latitude", "must be a finite number"));
        }
        Ok(())
    }
}

/// A username and its running total within one hunt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntry {
    pub username: String,
    pub total: i64,
}

fn underscore_whitespace(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(invalid(field, &format!("{len} characters exceeds limit of {max}")));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: &str) -> HuntError {
    HuntError::InvalidField {
        field,
        reason: reason.to_string(),
    }
}

/// Reject hunt names that would escape the hunts root or name it.
pub fn validate_hunt_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(HuntError::InvalidHuntName(name.to_string()));
    }
    Ok(())
}
