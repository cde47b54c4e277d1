use serde::{Deserialize, Serialize};

/// Directory entry as served by `/api/v1/users`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserSummary {
    pub user_id: i64,
    pub name: String,
}

/// Query input for `/select`
#[derive(Debug, Deserialize)]
pub struct SelectParams {
    #[serde(default)]
    pub user_id: String,
}

/// One `<option>` of the selection control
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Message shown in the error banner, with an optional retry target
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub retry: Option<String>,
}

/// Page state as exposed on `/api/page`
#[derive(Debug, Serialize)]
pub struct PageSnapshot {
    pub loading_visible: bool,
    pub select_visible: bool,
    pub chart_visible: bool,
    pub options: Vec<SelectOption>,
    pub selected: String,
    pub notice: Option<Notice>,
}
