//! Capability seams between the glue routines and their host.
//!
//! The loaders and renderers only talk to these traits, so the page, the
//! HTTP transport and the chart drawing can each be swapped for a test double.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::chart::{ChartOptions, DataTable};
use crate::error::DashboardError;
use crate::models::{Notice, SelectOption};

/// Elements the hosting page is expected to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementId {
    Loading,
    UserSelect,
    ChartContainer,
    ErrorBanner,
}

/// JSON GET transport.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value, DashboardError>;
}

/// The page elements the glue routines mutate.
pub trait DomHandle: Send + Sync {
    fn show(&self, id: ElementId);
    fn hide(&self, id: ElementId);
    fn is_visible(&self, id: ElementId) -> bool;

    fn append_option(&self, value: &str, label: &str);
    /// Swap the whole option list in one step. A selection that is no longer
    /// listed falls back to the placeholder and raises a change.
    fn replace_options(&self, options: Vec<SelectOption>);
    fn selected_value(&self) -> String;

    /// Replace the markup inside an element.
    fn set_content(&self, id: ElementId, markup: String);

    /// Put a message in the error banner, or clear it with `None`.
    fn set_notice(&self, notice: Option<Notice>);

    /// Register a listener for selection changes; each change delivers the new value.
    fn on_change(&self) -> UnboundedReceiver<String>;
}

/// Table construction and drawing. Drawing returns the markup for the container.
pub trait ChartLibrary: Send + Sync {
    fn build_table(&self, rows: &Value) -> Result<DataTable, DashboardError>;
    fn draw_pie_chart(&self, table: &DataTable, options: &ChartOptions) -> Result<String, DashboardError>;
    fn draw_column_chart(&self, table: &DataTable, options: &ChartOptions) -> Result<String, DashboardError>;
    fn draw_timeline_chart(&self, table: &DataTable, options: &ChartOptions) -> Result<String, DashboardError>;
}
