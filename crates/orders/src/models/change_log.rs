//! Append-only order change log.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storekeep_core::UserId;

/// Before and after values of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: String,
    pub new: String,
}

impl FieldChange {
    #[must_use]
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }
}

/// What a caller hands to the change log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Changes {
    /// Field name to change.
    Fields(BTreeMap<String, FieldChange>),
    /// Pre-formatted message.
    Message(String),
}

impl Changes {
    /// Structured changes, dropping fields whose value did not change.
    #[must_use]
    pub fn fields<I, K>(changes: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldChange)>,
        K: Into<String>,
    {
        Self::Fields(
            changes
                .into_iter()
                .filter(|(_, change)| change.old != change.new)
                .map(|(field, change)| (field.into(), change))
                .collect(),
        )
    }

    /// A single free-text entry.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Fields(fields) => fields.is_empty(),
            Self::Message(message) => message.is_empty(),
        }
    }
}

/// Kind of a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeKind {
    Field {
        field: String,
        old: String,
        new: String,
    },
    Note {
        message: String,
    },
}

/// One log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub created_at: DateTime<Utc>,
    pub actor: UserId,
    #[serde(flatten)]
    pub kind: ChangeKind,
}

impl ChangeLogEntry {
    /// Human-readable form, e.g. `Status changed from "Pending" to "Processing".`
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.kind {
            ChangeKind::Field { field, old, new } => {
                format!("{field} changed from \"{old}\" to \"{new}\".")
            }
            ChangeKind::Note { message } => message.clone(),
        }
    }
}

/// Entries already persisted plus entries appended since the last save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLog {
    entries: Vec<ChangeLogEntry>,
    #[serde(skip)]
    persisted: usize,
}

impl ChangeLog {
    /// A log whose entries all come from storage.
    #[must_use]
    pub fn from_persisted(entries: Vec<ChangeLogEntry>) -> Self {
        let persisted = entries.len();
        Self { entries, persisted }
    }

    /// Append entries for `changes`. Returns how many were added.
    pub fn append(&mut self, actor: UserId, changes: Changes) -> usize {
        let created_at = Utc::now();
        let before = self.entries.len();
        match changes {
            Changes::Fields(fields) => {
                self.entries
                    .extend(fields.into_iter().map(|(field, change)| ChangeLogEntry {
                        created_at,
                        actor,
                        kind: ChangeKind::Field {
                            field,
                            old: change.old,
                            new: change.new,
                        },
                    }));
            }
            Changes::Message(message) if !message.is_empty() => {
                self.entries.push(ChangeLogEntry {
                    created_at,
                    actor,
                    kind: ChangeKind::Note { message },
                });
            }
            Changes::Message(_) => {}
        }
        self.entries.len() - before
    }

    #[must_use]
    pub fn entries(&self) -> &[ChangeLogEntry] {
        &self.entries
    }

    /// Entries not yet written to storage.
    #[must_use]
    pub fn pending(&self) -> &[ChangeLogEntry] {
        self.entries.get(self.persisted..).unwrap_or_default()
    }

    /// Record that every entry has been written.
    pub fn mark_persisted(&mut self) {
        self.persisted = self.entries.len();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
