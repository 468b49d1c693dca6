use std::path::PathBuf;

use tasksync_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config_profiles::{default_config_path, CliProfilesConfig};
use crate::error::CliError;

/// Values given to `config init`; `None` keeps what the profile has.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub api_url: Option<String>,
    pub store_path: Option<PathBuf>,
    pub draft_debounce_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_config_show(global_profile),
        ConfigCommands::Init {
            profile,
            api_url,
            store_path,
            draft_debounce_ms,
            request_timeout_secs,
            no_activate,
        } => {
            let update = ProfileUpdate {
                api_url,
                store_path,
                draft_debounce_ms,
                request_timeout_secs,
            };
            run_config_init(profile.as_deref().or(global_profile), update, no_activate)
        }
    }
}

fn run_config_show(global_profile: Option<&str>) -> Result<(), CliError> {
    let path = default_config_path().map_err(CliError::Config)?;
    let config = CliProfilesConfig::load_from_path(&path).map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();
    let store_path = profile.resolve_store_path(None).map_err(CliError::Config)?;
    let settings = profile.resolve_settings().map_err(CliError::Config)?;

    println!("Config file: {}", path.display());
    if config.profile(&profile_name).is_none() {
        println!("Profile '{profile_name}' is not configured; showing defaults.");
    } else {
        println!("Profile: {profile_name}");
    }
    println!("Store: {}", store_path.display());
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

fn run_config_init(
    profile_name: Option<&str>,
    update: ProfileUpdate,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    apply_profile_update(&mut config, &profile_name, update)?;
    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );
    println!("Run `tasksync auth login --api-key <key>` to store a Linear API key.");
    Ok(())
}

/// Merge `update` into the named profile, rejecting invalid settings.
pub fn apply_profile_update(
    config: &mut CliProfilesConfig,
    profile_name: &str,
    update: ProfileUpdate,
) -> Result<(), CliError> {
    let mut profile = config.profile(profile_name).cloned().unwrap_or_default();

    if let Some(api_url) = normalize_text_option(update.api_url) {
        profile.settings.api_url = api_url.trim_end_matches('/').to_string();
    }
    if let Some(store_path) = update.store_path {
        profile.store_path = Some(store_path);
    }
    if let Some(debounce) = update.draft_debounce_ms {
        profile.settings.draft_debounce_ms = debounce;
    }
    if let Some(timeout) = update.request_timeout_secs {
        profile.settings.request_timeout_secs = timeout;
    }

    profile
        .settings
        .validate()
        .map_err(|error| CliError::Config(error.to_string()))?;
    *config.profile_mut_or_default(profile_name) = profile;
    Ok(())
}
