use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jotter_core::auth::AuthProvider;
use jotter_core::config::RemoteConfig;
use jotter_core::db::Database;
use jotter_core::store::{GistStore, LibSqlHandleStore, LibSqlLocalStore};
use jotter_core::{InputLimiter, Record, Settings, SyncEngine};

use crate::auth::CliAuth;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub type CliRemote = GistStore<Arc<CliAuth>, LibSqlHandleStore>;
pub type CliEngine = SyncEngine<LibSqlLocalStore, CliRemote>;

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub db_path: PathBuf,
    pub profile: Option<String>,
    pub offline: bool,
}

/// Everything a memo command needs: the engine plus the settings it was
/// built from.
pub struct Session {
    pub engine: CliEngine,
    pub auth: Arc<CliAuth>,
    pub config: RemoteConfig,
    pub profile_name: String,
    pub offline: bool,
}

impl Session {
    pub fn is_signed_in(&self) -> bool {
        self.auth.is_authenticated()
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os("JOTTER_DB_PATH").map(PathBuf::from)) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("jotter").join("jotter.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub async fn open_database(path: &Path) -> Result<Arc<Database>, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(Database::open(path).await?))
}

pub fn load_remote_config(profile: Option<&str>) -> Result<(String, RemoteConfig), CliError> {
    let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = profiles.resolve_profile_name(profile);
    let config = profiles
        .effective_profile(&profile_name)
        .resolve()
        .map_err(|error| CliError::Config(error.to_string()))?;
    Ok((profile_name, config))
}

pub async fn open_session(options: &GlobalOptions) -> Result<Session, CliError> {
    let (profile_name, config) = load_remote_config(options.profile.as_deref())?;
    let db = open_database(&options.db_path).await?;

    let auth = if options.offline {
        Arc::new(CliAuth::offline())
    } else {
        Arc::new(CliAuth::for_profile(&profile_name)?)
    };

    let local = LibSqlLocalStore::new(Arc::clone(&db));
    let remote = GistStore::new(&config, Arc::clone(&auth), LibSqlHandleStore::new(db))?;

    Ok(Session {
        engine: SyncEngine::new(local, remote),
        auth,
        config,
        profile_name,
        offline: options.offline,
    })
}

/// Converge at startup. A failed sync is reported but does not stop the
/// command as long as a local copy is available.
pub async fn reconcile(session: &mut Session) -> Result<Record, CliError> {
    match session.engine.reconcile_on_startup().await {
        Ok(record) => Ok(record),
        Err(failure) => match failure.local {
            Some(local) => {
                eprintln!("Warning: {}; using the local copy", failure.error);
                Ok(local)
            }
            None => Err(failure.into()),
        },
    }
}

/// Push after a local edit and tell the user where the change ended up.
pub async fn push_after_edit(session: &mut Session) {
    if session.offline {
        println!("Saved locally (offline)");
        return;
    }
    if !session.is_signed_in() {
        println!("Saved locally. Run `jot auth login` to sync with GitHub.");
        return;
    }

    if session.engine.push_local_to_remote().await {
        println!("Saved and synced");
    } else {
        let reason = session
            .engine
            .status()
            .last_error
            .unwrap_or_else(|| "unknown error".to_string());
        eprintln!("Warning: saved locally but sync failed: {reason}");
    }
}

/// Trim `text` to the limit in `settings`. Returns the text and whether it
/// was cut.
pub fn fit_to_limit(text: &str, settings: &Settings) -> (String, bool) {
    let limiter = InputLimiter::from_settings(settings);
    if limiter.is_exceeded(text) {
        (limiter.truncate(text).to_string(), true)
    } else {
        (text.to_string(), false)
    }
}

pub fn warn_truncated(settings: &Settings) {
    eprintln!(
        "Warning: memo exceeds the {} {} limit and was truncated",
        settings.limit_value,
        settings.limit_type.to_string().to_lowercase()
    );
}

pub fn resolve_text(parts: &[String]) -> Result<String, CliError> {
    if let Some(text) = normalize_content(&parts.join(" ")) {
        return Ok(text);
    }
    if let Some(text) = read_piped_stdin()? {
        return Ok(text);
    }
    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn format_timestamp(value: Option<chrono::DateTime<chrono::Utc>>) -> String {
    value.map_or_else(
        || "never".to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}
