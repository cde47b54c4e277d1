use std::sync::Arc;

use tracing::{info, warn};

use crate::capabilities::{DomHandle, ElementId, HttpClient};
use crate::error::DashboardError;
use crate::models::{Notice, SelectOption, UserSummary};

pub const USERS_ENDPOINT: &str = "/api/v1/users";

/// Fills the selection control from the directory endpoint.
pub struct UserDirectoryLoader {
    http: Arc<dyn HttpClient>,
    dom: Arc<dyn DomHandle>,
    endpoint: String,
}

impl UserDirectoryLoader {
    pub fn new(http: Arc<dyn HttpClient>, dom: Arc<dyn DomHandle>) -> Self {
        Self {
            http,
            dom,
            endpoint: USERS_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Replaces the options with the directory, in response order.
    /// On failure the loading indicator is hidden and a retry link is shown.
    pub async fn load(&self) -> Result<Vec<UserSummary>, DashboardError> {
        self.dom.show(ElementId::Loading);
        match self.fetch().await {
            Ok(users) => {
                self.dom.replace_options(
                    users
                        .iter()
                        .map(|user| SelectOption {
                            value: user.user_id.to_string(),
                            label: user.name.clone(),
                        })
                        .collect(),
                );
                self.dom.set_notice(None);
                self.dom.show(ElementId::UserSelect);
                self.dom.hide(ElementId::Loading);
                info!(count = users.len(), endpoint = %self.endpoint, "user directory loaded");
                Ok(users)
            }
            Err(e) => {
                warn!(error = %e, "user directory unavailable");
                self.dom.hide(ElementId::Loading);
                self.dom.set_notice(Some(Notice {
                    message: e.to_string(),
                    retry: Some("/reload".to_string()),
                }));
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<UserSummary>, DashboardError> {
        let body = self.http.get_json(&self.endpoint).await?;
        serde_json::from_value(body).map_err(|e| DashboardError::fetch(&self.endpoint, e))
    }
}
