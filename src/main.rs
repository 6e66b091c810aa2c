use std::sync::Arc;

use anyhow::Result;

use iphdash::api::HttpBackend;
use iphdash::logging::{log, obj, v_str, Domain, Level};
use iphdash::render::LogRender;
use iphdash::session::DashboardSession;
use iphdash::state::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[("api_base", v_str(&cfg.api_base))]),
    );

    let backend = Arc::new(HttpBackend::new(&cfg)?);
    let render = Arc::new(LogRender);
    let session = DashboardSession::new(cfg, backend, render);

    if let Err(e) = session.bootstrap().await {
        // One diagnostic pass before giving up, mirroring the retry
        // screen's connectivity-test affordance.
        let _ = session.connectivity_test().await;
        return Err(e);
    }

    tokio::signal::ctrl_c().await?;
    session.teardown();
    log(Level::Info, Domain::System, "shutdown", obj(&[]));
    Ok(())
}
