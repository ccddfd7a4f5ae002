use crate::commands::common::{open_session, reconcile, GlobalOptions};
use crate::error::CliError;

pub async fn run_show(as_json: bool, options: &GlobalOptions) -> Result<(), CliError> {
    let mut session = open_session(options).await?;
    let record = reconcile(&mut session).await?;

    if as_json {
        println!("{}", record.to_json_pretty()?);
    } else if !record.body.is_empty() {
        println!("{}", record.body);
    }
    Ok(())
}
