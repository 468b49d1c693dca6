use tasksync_core::util::normalize_text_option;

use crate::auth::{find_api_key, mask_api_key, ApiKeyStore};
use crate::cli::AuthCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    match command {
        AuthCommands::Login { profile, api_key } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            let api_key = normalize_text_option(Some(api_key)).ok_or(CliError::EmptyApiKey)?;
            ApiKeyStore::new(&profile_name).save(&api_key)?;
            println!(
                "Stored API key {} for profile '{}'",
                mask_api_key(&api_key),
                profile_name
            );
            Ok(())
        }
        AuthCommands::Status { profile } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            match find_api_key(&profile_name)? {
                Some((key, source)) => println!(
                    "Profile '{}' uses API key {} from {}",
                    profile_name,
                    mask_api_key(&key),
                    source.label()
                ),
                None => println!("Profile '{profile_name}' has no API key."),
            }
            Ok(())
        }
        AuthCommands::Logout { profile } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            ApiKeyStore::new(&profile_name).clear()?;
            println!("Removed stored API key for profile '{profile_name}'");
            Ok(())
        }
    }
}
