use std::sync::Arc;

use jotter_core::{Connectivity, LocalEdit, PushScheduler, Record};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex as AsyncMutex;

use crate::commands::common::{
    fit_to_limit, normalize_content, open_session, reconcile, warn_truncated, GlobalOptions,
};
use crate::error::CliError;

/// Append stdin lines to the memo as they arrive. Pushes are debounced so a
/// burst of lines ends up in a single gist update; EOF flushes the last one.
pub async fn run_compose(options: &GlobalOptions) -> Result<(), CliError> {
    let mut session = open_session(options).await?;
    let mut current = reconcile(&mut session).await?;
    let signed_in = session.is_signed_in();
    let debounce = session.config.push_debounce;

    let engine = Arc::new(AsyncMutex::new(session.engine));
    let scheduler = PushScheduler::new(
        Arc::clone(&engine),
        debounce,
        Connectivity::new(!options.offline && signed_in),
    );

    eprintln!("Composing; end input with Ctrl-D");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut appended = 0_usize;
    while let Some(line) = lines.next_line().await? {
        let Some(line) = normalize_content(&line) else {
            continue;
        };

        let Some(edit) = next_edit(&current, line) else {
            eprintln!("Memo is full; dropping input");
            continue;
        };

        let updated = engine.lock().await.apply_local_edit(edit).await?;
        if updated.revision != current.revision {
            appended += 1;
            scheduler.schedule();
        }
        current = updated;
    }

    if appended == 0 {
        println!("Nothing appended");
        return Ok(());
    }

    if scheduler.flush().await {
        println!("Appended {appended} line(s) and synced");
    } else if options.offline || !signed_in {
        println!("Appended {appended} line(s) locally");
    } else {
        let reason = engine
            .lock()
            .await
            .status()
            .last_error
            .unwrap_or_else(|| "unknown error".to_string());
        eprintln!("Warning: appended {appended} line(s) locally but sync failed: {reason}");
    }
    Ok(())
}

/// Pick the edit for one composed line, truncating when the memo would
/// exceed its limit. `None` when nothing of the line fits.
fn next_edit(current: &Record, line: String) -> Option<LocalEdit> {
    let mut candidate = current.clone();
    candidate.append_body(&line, chrono::Utc::now());
    let (body, truncated) = fit_to_limit(&candidate.body, &current.settings);

    if !truncated {
        return Some(LocalEdit::AppendBody(line));
    }
    if body == current.body {
        return None;
    }
    warn_truncated(&current.settings);
    Some(LocalEdit::SetBody(body))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use jotter_core::{LimitType, Settings};

    use super::*;

    fn record_with(body: &str, limit: u32) -> Record {
        let mut record = Record::new(Utc::now());
        record.body = body.to_string();
        record.settings = Settings::new(LimitType::Char, limit);
        record
    }

    #[test]
    fn line_that_fits_is_appended() {
        let record = record_with("abc", 10);
        assert!(matches!(
            next_edit(&record, "de".to_string()),
            Some(LocalEdit::AppendBody(line)) if line == "de"
        ));
    }

    #[test]
    fn overflowing_line_is_truncated() {
        let record = record_with("abc", 6);
        assert!(matches!(
            next_edit(&record, "defgh".to_string()),
            Some(LocalEdit::SetBody(body)) if body == "abc\nde"
        ));
    }

    #[test]
    fn full_memo_drops_the_line() {
        let record = record_with("abcdef", 6);
        assert!(next_edit(&record, "x".to_string()).is_none());
    }
}
