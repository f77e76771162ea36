use clap::Subcommand;
use serde_json::json;

use crate::session;

#[derive(Subcommand)]
pub enum IdentityAction {
    /// Print this device's identity and sync status
    Show,
}

pub fn run(action: IdentityAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        IdentityAction::Show => {
            let mut session = session::open()?;
            let status = session.sync.status();
            let report = json!({
                "identity": status.identity,
                "authority": status.authority,
                "remote_configured": session.sync.has_remote(),
                "app_id": &session.config.app_id,
                "records": status.record_count,
                "notice": status.notice.as_ref().map(|n| n.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            session.sync.shutdown();
        }
    }
    Ok(())
}
