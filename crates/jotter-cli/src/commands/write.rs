use jotter_core::LocalEdit;

use crate::commands::common::{
    fit_to_limit, open_session, push_after_edit, reconcile, resolve_text, warn_truncated,
    GlobalOptions,
};
use crate::error::CliError;

pub async fn run_write(text_parts: &[String], options: &GlobalOptions) -> Result<(), CliError> {
    let text = resolve_text(text_parts)?;
    let mut session = open_session(options).await?;
    let record = reconcile(&mut session).await?;

    let (body, truncated) = fit_to_limit(&text, &record.settings);
    if truncated {
        warn_truncated(&record.settings);
    }

    let updated = session
        .engine
        .apply_local_edit(LocalEdit::SetBody(body))
        .await?;
    if updated.revision == record.revision {
        println!("Memo unchanged");
        return Ok(());
    }

    push_after_edit(&mut session).await;
    Ok(())
}

pub async fn run_append(text_parts: &[String], options: &GlobalOptions) -> Result<(), CliError> {
    let line = resolve_text(text_parts)?;
    let mut session = open_session(options).await?;
    let record = reconcile(&mut session).await?;

    let mut candidate = record.clone();
    candidate.append_body(&line, chrono::Utc::now());
    let (body, truncated) = fit_to_limit(&candidate.body, &record.settings);

    let edit = if truncated {
        warn_truncated(&record.settings);
        LocalEdit::SetBody(body)
    } else {
        LocalEdit::AppendBody(line)
    };

    let updated = session.engine.apply_local_edit(edit).await?;
    if updated.revision == record.revision {
        println!("Memo is full; nothing appended");
        return Ok(());
    }

    push_after_edit(&mut session).await;
    Ok(())
}
