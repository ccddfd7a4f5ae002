use crate::commands::common::{open_session, GlobalOptions};
use crate::error::CliError;

/// Reset the local replica. The remote copy is left alone, so the next
/// startup pulls it back when signed in.
pub async fn run_wipe(confirmed: bool, options: &GlobalOptions) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::WipeNotConfirmed);
    }

    let mut session = open_session(options).await?;
    let record = session.engine.wipe_local().await?;
    println!("Local memo wiped (revision {})", record.revision);
    Ok(())
}
