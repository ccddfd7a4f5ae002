use chrono::{DateTime, Utc};
use jotter_core::{InputLimiter, LimitType, ModifiedBy, Record, SyncState};
use serde::Serialize;

use crate::auth::TokenSource;
use crate::commands::common::{format_timestamp, open_session, reconcile, GlobalOptions, Session};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub profile: String,
    pub signed_in: bool,
    pub token_source: Option<&'static str>,
    pub offline: bool,
    pub state: SyncState,
    pub last_error: Option<String>,
    pub revision: u64,
    pub last_modified_by: ModifiedBy,
    pub created_at: DateTime<Utc>,
    pub body_updated_at: DateTime<Utc>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub needs_sync: bool,
    pub limit_type: LimitType,
    pub limit_value: u32,
    pub usage: usize,
    pub remainder: i64,
}

impl StatusReport {
    pub fn new(session: &Session, record: &Record) -> Self {
        let limiter = InputLimiter::from_settings(&record.settings);
        let status = session.engine.status();
        Self {
            profile: session.profile_name.clone(),
            signed_in: session.is_signed_in(),
            token_source: session.auth.source().map(token_source_label),
            offline: session.offline,
            state: status.state,
            last_error: status.last_error,
            revision: record.revision,
            last_modified_by: record.last_modified_by,
            created_at: record.created_at,
            body_updated_at: record.body_updated_at,
            last_synced_at: record.last_synced_at,
            needs_sync: record.needs_sync(),
            limit_type: record.settings.limit_type,
            limit_value: record.settings.limit_value,
            usage: limiter.usage(&record.body),
            remainder: limiter.remainder(&record.body),
        }
    }

    pub fn render_text(&self) -> String {
        let account = match (self.signed_in, self.token_source) {
            (true, Some(source)) => format!("signed in ({source})"),
            (true, None) => "signed in".to_string(),
            (false, _) if self.offline => "offline".to_string(),
            (false, _) => "signed out".to_string(),
        };

        let mut lines = vec![
            format!("Profile:        {}", self.profile),
            format!("Account:        {account}"),
            format!("Sync state:     {}", self.state),
        ];
        if let Some(error) = &self.last_error {
            lines.push(format!("Last error:     {error}"));
        }
        lines.extend([
            format!("Revision:       {}", self.revision),
            format!("Modified by:    {}", modified_by_label(self.last_modified_by)),
            format!("Created:        {}", format_timestamp(Some(self.created_at))),
            format!("Body updated:   {}", format_timestamp(Some(self.body_updated_at))),
            format!("Last synced:    {}", format_timestamp(self.last_synced_at)),
            format!("Needs sync:     {}", if self.needs_sync { "yes" } else { "no" }),
            format!(
                "Limit:          {}/{} {} ({} left)",
                self.usage,
                self.limit_value,
                self.limit_type.to_string().to_lowercase(),
                self.remainder
            ),
        ]);
        lines.join("\n")
    }
}

const fn token_source_label(source: TokenSource) -> &'static str {
    match source {
        TokenSource::Environment => "environment",
        TokenSource::Keychain => "keychain",
    }
}

const fn modified_by_label(modified_by: ModifiedBy) -> &'static str {
    match modified_by {
        ModifiedBy::Local => "local",
        ModifiedBy::Remote => "remote",
    }
}

pub async fn run_status(as_json: bool, options: &GlobalOptions) -> Result<(), CliError> {
    let mut session = open_session(options).await?;
    let record = reconcile(&mut session).await?;
    let report = StatusReport::new(&session, &record);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.render_text());
    }
    Ok(())
}
