//! tui command - Open the interactive front-end

use anyhow::Result;

use super::Session;
use crate::engine;
use crate::ui::terminal::run_tui;
use crate::ui::App;

/// Run the interactive UI with the session's catalog and settings.
pub async fn tui(session: Session) -> Result<()> {
    let settings = engine::settings_from_config(&session.config, &session.ctx);
    tracing::info!(
        program = %settings.program,
        audit = settings.audit.is_some(),
        combos = ?session.combos_source,
        "starting interactive session"
    );
    run_tui(App::new(session.catalog), settings).await
}
