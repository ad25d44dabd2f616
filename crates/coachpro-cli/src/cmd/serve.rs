use anyhow::Context;
use coachpro_server::AppState;
use std::path::Path;

pub fn run(root: &Path, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let state = AppState::open(root.to_path_buf())
        .with_context(|| format!("cannot open CoachPro project at {}", root.display()))?;
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);
    if state.config.commerce.webhook_secret.is_none() {
        tracing::warn!("commerce.webhook_secret is not set; order webhooks will be rejected");
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { coachpro_server::serve(state, &host, port).await })
}
