use jotter_core::auth::{AccessToken, AuthProvider, GitHubAuthClient};
use jotter_core::store::{HandleStore, LibSqlHandleStore};

use crate::auth::{CliAuth, TokenSource};
use crate::cli::AuthCommands;
use crate::commands::common::{load_remote_config, open_database, GlobalOptions};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, options: &GlobalOptions) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { profile, token } => {
            run_login(profile.as_deref().or(options.profile.as_deref()), token, options).await
        }
        AuthCommands::Status { profile } => {
            run_status(profile.as_deref().or(options.profile.as_deref()), options).await
        }
        AuthCommands::Logout { profile } => {
            run_logout(profile.as_deref().or(options.profile.as_deref()), options).await
        }
    }
}

async fn run_login(
    profile: Option<&str>,
    token: Option<String>,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    if options.offline {
        return Err(CliError::Auth("cannot sign in while offline".to_string()));
    }

    let (profile_name, config) = load_remote_config(profile)?;
    let client = GitHubAuthClient::new(&config)?;

    let token = if let Some(raw) = token {
        AccessToken::new(raw)
            .ok_or_else(|| CliError::Auth("token must not be empty".to_string()))?
    } else {
        let device = client.request_device_code().await?;
        eprintln!(
            "Open {} and enter the code {}",
            device.verification_uri, device.user_code
        );
        eprintln!("Waiting for authorization...");
        client.poll_for_token(&device).await?
    };

    let user = client.verify_token(&token).await?;
    CliAuth::for_profile(&profile_name)?.sign_in(token)?;
    println!("Signed in profile '{profile_name}' as {}", user.login);
    Ok(())
}

async fn run_status(profile: Option<&str>, options: &GlobalOptions) -> Result<(), CliError> {
    let (profile_name, config) = load_remote_config(profile)?;
    let auth = CliAuth::for_profile(&profile_name)?;

    let (Some(token), Some(source)) = (auth.token(), auth.source()) else {
        println!("Profile '{profile_name}' is not signed in.");
        return Ok(());
    };
    let source_label = match source {
        TokenSource::Environment => "JOTTER_GITHUB_TOKEN",
        TokenSource::Keychain => "keychain",
    };

    if options.offline {
        println!("Profile '{profile_name}' has a token from {source_label} (not verified offline)");
        return Ok(());
    }

    match GitHubAuthClient::new(&config)?.verify_token(&token).await {
        Ok(user) => println!(
            "Profile '{profile_name}' is signed in as {} (token from {source_label})",
            user.login
        ),
        Err(error) => println!(
            "Profile '{profile_name}' has a token from {source_label}, but GitHub rejected it: {error}"
        ),
    }
    Ok(())
}

async fn run_logout(profile: Option<&str>, options: &GlobalOptions) -> Result<(), CliError> {
    let (profile_name, _) = load_remote_config(profile)?;
    CliAuth::for_profile(&profile_name)?.sign_out()?;

    // The cached gist id belongs to the account that just signed out.
    let db = open_database(&options.db_path).await?;
    LibSqlHandleStore::new(db).clear_handle().await?;

    println!("Signed out profile '{profile_name}'");
    if std::env::var_os("JOTTER_GITHUB_TOKEN").is_some() {
        println!("JOTTER_GITHUB_TOKEN is still set and will keep this shell signed in.");
    }
    Ok(())
}
