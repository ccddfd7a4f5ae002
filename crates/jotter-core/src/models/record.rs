//! Record model: the single versioned unit kept in sync between replicas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::settings::Settings;
use crate::error::Result;
use crate::limit::InputLimiter;

/// Schema version written into every record's metadata
pub const SCHEMA_VERSION: u32 = 1;

/// Application version written into every record's metadata
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Which replica produced the most recent mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModifiedBy {
    #[default]
    Local,
    #[serde(alias = "cloud")]
    Remote,
}

/// The memo plus its settings and sync bookkeeping.
///
/// Serialized as a nested `meta` / `memo` / `settings` / `sync` document so
/// the same blob round-trips through the local database and the remote gist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RecordDocument", into = "RecordDocument")]
pub struct Record {
    /// Memo text, already length-checked by the caller
    pub body: String,
    /// Last local edit to the body or settings
    pub body_updated_at: DateTime<Utc>,
    pub settings: Settings,
    pub schema_version: u32,
    pub app_version: String,
    pub created_at: DateTime<Utc>,
    /// Count of local mutations; primary conflict-ordering signal
    pub revision: u64,
    pub last_modified_by: ModifiedBy,
    /// Set by the sync engine only
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Zero-state record used on first run and after a wipe.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            body: String::new(),
            body_updated_at: now,
            settings: Settings::default(),
            schema_version: SCHEMA_VERSION,
            app_version: APP_VERSION.to_string(),
            created_at: now,
            revision: 0,
            last_modified_by: ModifiedBy::Local,
            last_synced_at: None,
        }
    }

    /// Replace the body. Returns `false` without touching the record when the
    /// body is unchanged.
    pub fn set_body(&mut self, body: impl Into<String>, now: DateTime<Utc>) -> bool {
        let body = body.into();
        if body == self.body {
            return false;
        }
        self.body = body;
        self.touch_local(now);
        true
    }

    /// Append a line to the body, separated by a newline when the body is
    /// not empty.
    pub fn append_body(&mut self, line: &str, now: DateTime<Utc>) -> bool {
        if line.is_empty() {
            return false;
        }
        let mut body = self.body.clone();
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(line);
        self.set_body(body, now)
    }

    /// Replace the settings, cutting the body down to the new limit in the
    /// same mutation. Returns `false` when they are unchanged.
    pub fn set_settings(&mut self, settings: Settings, now: DateTime<Utc>) -> bool {
        if settings == self.settings {
            return false;
        }
        let fitted_len = InputLimiter::from_settings(&settings)
            .truncate(&self.body)
            .len();
        self.body.truncate(fitted_len);
        self.settings = settings;
        self.touch_local(now);
        true
    }

    /// True when this replica holds a local edit that has not been synced.
    #[must_use]
    pub fn needs_sync(&self) -> bool {
        self.last_modified_by == ModifiedBy::Local
            && self
                .last_synced_at
                .is_none_or(|synced_at| self.body_updated_at > synced_at)
    }

    /// Copy of this record with `last_synced_at` set, ready to be written to
    /// both replicas.
    #[must_use]
    pub fn stamped_synced(&self, now: DateTime<Utc>) -> Self {
        Self {
            last_synced_at: Some(now),
            ..self.clone()
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    fn touch_local(&mut self, now: DateTime<Utc>) {
        self.revision = self.revision.saturating_add(1);
        self.body_updated_at = self.body_updated_at.max(now);
        self.last_modified_by = ModifiedBy::Local;
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordDocument {
    #[serde(default)]
    meta: MetaSection,
    memo: MemoSection,
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    sync: SyncSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaSection {
    #[serde(default = "default_schema_version")]
    schema_version: u32,
    #[serde(default)]
    app_version: String,
    #[serde(default)]
    created_at: DateTime<Utc>,
}

impl Default for MetaSection {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            app_version: String::new(),
            created_at: DateTime::<Utc>::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemoSection {
    content: String,
    #[serde(default)]
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncSection {
    #[serde(default)]
    last_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    last_modified_by: ModifiedBy,
    #[serde(default)]
    revision: u64,
}

const fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl From<RecordDocument> for Record {
    fn from(document: RecordDocument) -> Self {
        Self {
            body: document.memo.content,
            body_updated_at: document.memo.updated_at,
            settings: document.settings,
            schema_version: document.meta.schema_version,
            app_version: document.meta.app_version,
            created_at: document.meta.created_at,
            revision: document.sync.revision,
            last_modified_by: document.sync.last_modified_by,
            last_synced_at: document.sync.last_synced_at,
        }
    }
}

impl From<Record> for RecordDocument {
    fn from(record: Record) -> Self {
        Self {
            meta: MetaSection {
                schema_version: record.schema_version,
                app_version: record.app_version,
                created_at: record.created_at,
            },
            memo: MemoSection {
                content: record.body,
                updated_at: record.body_updated_at,
            },
            settings: record.settings,
            sync: SyncSection {
                last_synced_at: record.last_synced_at,
                last_modified_by: record.last_modified_by,
                revision: record.revision,
            },
        }
    }
}
