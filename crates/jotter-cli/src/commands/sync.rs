use crate::commands::common::{open_session, GlobalOptions};
use crate::error::CliError;

/// Explicit sync. Pushes by default; `--pull` adopts the remote copy when it
/// is newer.
pub async fn run_sync(pull: bool, options: &GlobalOptions) -> Result<(), CliError> {
    if options.offline {
        println!("Offline mode: nothing to sync");
        return Ok(());
    }

    let mut session = open_session(options).await?;
    if !session.is_signed_in() {
        return Err(CliError::NotSignedIn);
    }

    if pull {
        let adopted = session.engine.pull_remote_to_local().await?;
        if adopted {
            println!("Pulled from GitHub");
        } else {
            println!("No remote memo yet");
        }
        return Ok(());
    }

    if session.engine.push_local_to_remote().await {
        println!("Synced with GitHub");
        Ok(())
    } else {
        let reason = session
            .engine
            .status()
            .last_error
            .unwrap_or_else(|| "no local memo to push".to_string());
        Err(CliError::PushFailed(reason))
    }
}
