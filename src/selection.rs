use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::capabilities::{DomHandle, ElementId, HttpClient};
use crate::error::DashboardError;
use crate::models::Notice;

pub const PRESENCE_WEEKDAY_PREFIX: &str = "/api/v1/presence_weekday/";

/// Called with the page and the raw per-user payload once it arrives.
pub type RenderCallback =
    Arc<dyn Fn(&dyn DomHandle, Value) -> Result<(), DashboardError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    Rendered,
    /// Placeholder chosen, nothing fetched
    NoSelection,
    /// A newer selection superseded this one before it could touch the page
    Stale,
    FetchFailed,
    RenderFailed,
}

/// Fetches the selected user's data and hands it to the render callback.
///
/// Every change takes a fresh request token. Page updates for a change run
/// under the token lock and only while its token is still the latest, so a
/// newer change waits for an update in progress and then wins.
pub struct UserSelectionController {
    http: Arc<dyn HttpClient>,
    dom: Arc<dyn DomHandle>,
    url_prefix: String,
    render: RenderCallback,
    latest: Mutex<u64>,
}

impl UserSelectionController {
    pub fn new(
        http: Arc<dyn HttpClient>,
        dom: Arc<dyn DomHandle>,
        url_prefix: impl Into<String>,
        render: RenderCallback,
    ) -> Self {
        Self {
            http,
            dom,
            url_prefix: url_prefix.into(),
            render,
            latest: Mutex::new(0),
        }
    }

    /// Listens for selection changes until the page drops the listener.
    /// A new change aborts the task serving the previous one.
    pub fn attach(self: Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.dom.on_change();
        tokio::spawn(async move {
            let mut inflight: Option<JoinHandle<SelectionOutcome>> = None;
            while let Some(value) = changes.recv().await {
                if let Some(previous) = inflight.take() {
                    previous.abort();
                }
                let token = self.next_token();
                let controller = self.clone();
                inflight = Some(tokio::spawn(async move {
                    controller.run(token, &value).await
                }));
            }
            debug!("selection listener closed");
        })
    }

    fn next_token(&self) -> u64 {
        let mut latest = self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *latest += 1;
        *latest
    }

    /// Runs `update` only if `token` is still the latest, holding the token
    /// lock for the whole update.
    fn if_current<R>(&self, token: u64, update: impl FnOnce() -> R) -> Option<R> {
        let latest = self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *latest != token {
            return None;
        }
        Some(update())
    }

    async fn run(&self, token: u64, value: &str) -> SelectionOutcome {
        if value.is_empty() {
            let reset = self.if_current(token, || {
                self.dom.hide(ElementId::Loading);
                self.dom.hide(ElementId::ChartContainer);
                self.dom.set_notice(None);
            });
            debug!(token, "placeholder selected");
            return match reset {
                Some(()) => SelectionOutcome::NoSelection,
                None => SelectionOutcome::Stale,
            };
        }

        let started = self.if_current(token, || {
            self.dom.set_notice(None);
            self.dom.show(ElementId::Loading);
            self.dom.hide(ElementId::ChartContainer);
        });
        if started.is_none() {
            return SelectionOutcome::Stale;
        }

        let url = format!("{}{}", self.url_prefix, value);
        let request_id = Uuid::new_v4();
        info!(%request_id, token, url = %url, "fetching user data");

        let result = self.http.get_json(&url).await;
        let outcome = self.if_current(token, || match result {
            Ok(body) => match (self.render)(self.dom.as_ref(), body) {
                Ok(()) => SelectionOutcome::Rendered,
                Err(e) => {
                    warn!(%request_id, error = %e, "user data could not be drawn");
                    self.dom.hide(ElementId::Loading);
                    self.dom.hide(ElementId::ChartContainer);
                    self.dom.set_notice(Some(Notice {
                        message: e.to_string(),
                        retry: None,
                    }));
                    SelectionOutcome::RenderFailed
                }
            },
            Err(e) => {
                warn!(%request_id, error = %e, "user data unavailable");
                self.dom.hide(ElementId::Loading);
                self.dom.set_notice(Some(Notice {
                    message: e.to_string(),
                    retry: Some(format!("/select?user_id={}", value)),
                }));
                SelectionOutcome::FetchFailed
            }
        });

        outcome.unwrap_or_else(|| {
            debug!(%request_id, token, "discarding stale response");
            SelectionOutcome::Stale
        })
    }
}

#[cfg(test)]
impl UserSelectionController {
    pub async fn handle_change(&self, value: &str) -> SelectionOutcome {
        let token = self.next_token();
        self.run(token, value).await
    }
}
