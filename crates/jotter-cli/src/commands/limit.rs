use jotter_core::{LimitType, LocalEdit, Settings};

use crate::commands::common::{
    fit_to_limit, open_session, push_after_edit, reconcile, warn_truncated, GlobalOptions,
};
use crate::error::CliError;

pub async fn run_limit(
    limit_type: LimitType,
    limit_value: u32,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let mut session = open_session(options).await?;
    let record = reconcile(&mut session).await?;
    let settings = Settings::new(limit_type, limit_value);

    if settings == record.settings {
        println!("Limit unchanged: {limit_value} {limit_type}");
        return Ok(());
    }

    // The body is cut to the new limit as part of the same edit.
    let (_, truncated) = fit_to_limit(&record.body, &settings);
    session
        .engine
        .apply_local_edit(LocalEdit::SetSettings(settings))
        .await?;
    if truncated {
        warn_truncated(&settings);
    }

    println!("Limit set to {limit_value} {limit_type}");
    push_after_edit(&mut session).await;
    Ok(())
}
