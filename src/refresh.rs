//! Periodic KPI refresh. Fires on a fixed interval for the lifetime of
//! the session; each cycle is independent and failures are swallowed
//! after logging so one bad fetch never kills the loop.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::api::Backend;
use crate::insights::kpi_view;
use crate::logging::{log, obj, v_num, v_str, Domain, Level};
use crate::render::Render;
use crate::state::SessionState;

pub struct RefreshHandle {
    handle: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn spawn_kpi_refresh(
    period: Duration,
    backend: Arc<dyn Backend>,
    state: Arc<Mutex<SessionState>>,
    render: Arc<dyn Render>,
) -> RefreshHandle {
    let handle = tokio::spawn(async move {
        // First fire one full period out, not immediately: bootstrap has
        // just loaded a fresh KPI snapshot.
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match backend.kpi().await {
                Ok(resp) => {
                    let view = kpi_view(&resp);
                    if let Ok(mut s) = state.lock() {
                        s.kpi = Some(view.clone());
                    }
                    render.show_kpi(&view);
                    log(
                        Level::Debug,
                        Domain::Refresh,
                        "kpi_refreshed",
                        obj(&[("next_prediction", v_num(view.next_prediction))]),
                    );
                }
                Err(e) => {
                    // Swallowed: never user-facing, never cancels the loop.
                    log(
                        Level::Warn,
                        Domain::Refresh,
                        "kpi_refresh_failed",
                        obj(&[("error", v_str(&e.to_string()))]),
                    );
                }
            }
        }
    });

    RefreshHandle { handle }
}
