use jotter_core::util::{is_http_url, normalize_text_option};

use crate::cli::ConfigCommands;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// Values passed to `jot config init`.
#[derive(Debug, Default)]
pub struct ConfigInitArgs {
    pub client_id: Option<String>,
    pub api_base_url: Option<String>,
    pub gist_file: Option<String>,
    pub debounce_ms: Option<u64>,
    pub no_activate: bool,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            client_id,
            api_base_url,
            gist_file,
            debounce_ms,
            no_activate,
        } => {
            let args = ConfigInitArgs {
                client_id,
                api_base_url,
                gist_file,
                debounce_ms,
                no_activate,
            };
            run_config_init(profile.as_deref().or(global_profile), args)
        }
        ConfigCommands::Show { profile } => run_config_show(profile.as_deref().or(global_profile)),
    }
}

pub fn run_config_init(profile_name: Option<&str>, args: ConfigInitArgs) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    let activate = !args.no_activate;
    apply_init_args(config.profile_mut_or_default(&profile_name), args)?;
    if activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let has_client_id = config
        .profile(&profile_name)
        .is_some_and(|profile| profile.github_client_id.is_some());
    if has_client_id {
        println!("Run `jot auth login` to sign in with GitHub.");
    } else {
        println!(
            "No OAuth client id set; sign in with `jot auth login --token <TOKEN>` or rerun with --client-id."
        );
    }
    Ok(())
}

/// Write explicit values into `profile`, then check the result resolves.
pub fn apply_init_args(profile: &mut CliProfile, args: ConfigInitArgs) -> Result<(), CliError> {
    if let Some(value) = normalize_text_option(args.client_id) {
        profile.github_client_id = Some(value);
    }
    if let Some(value) = normalize_text_option(args.api_base_url) {
        if !is_http_url(&value) {
            return Err(CliError::Config(
                "api_base_url must include http:// or https://".to_string(),
            ));
        }
        profile.github_api_base_url = Some(value);
    }
    if let Some(value) = normalize_text_option(args.gist_file) {
        profile.gist_file_name = Some(value);
    }
    if let Some(value) = args.debounce_ms {
        profile.push_debounce_ms = Some(value);
    }

    profile
        .resolve()
        .map(|_| ())
        .map_err(|error| CliError::Config(error.to_string()))
}

pub fn run_config_show(profile_name: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let resolved = config
        .effective_profile(&profile_name)
        .resolve()
        .map_err(|error| CliError::Config(error.to_string()))?;

    let active = config.active_profile.as_deref() == Some(profile_name.as_str());
    println!(
        "Profile:        {profile_name}{}",
        if active { " (active)" } else { "" }
    );
    println!("API base URL:   {}", resolved.api_base_url);
    println!("OAuth base URL: {}", resolved.oauth_base_url);
    println!(
        "Client id:      {}",
        resolved.client_id.as_deref().unwrap_or("(not set)")
    );
    println!("Gist file:      {}", resolved.file_name);
    println!("Push debounce:  {} ms", resolved.push_debounce.as_millis());
    Ok(())
}
