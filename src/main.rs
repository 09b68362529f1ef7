use std::sync::Arc;

use sca_dashboard::app::{self, AppState};
use sca_dashboard::gateway::AnalyzerProcess;
use sca_dashboard::mailer::{MailSettings, SmtpNotifier};
use sca_dashboard::session::SessionRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let state = Arc::new(AppState {
        sessions: SessionRegistry::new(),
        compute: Arc::new(AnalyzerProcess::from_env()),
        notifier: Arc::new(SmtpNotifier::new(MailSettings::from_env())),
    });

    let addr = std::env::var("SCA_LISTEN").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    app::run(state, &addr).await
}
