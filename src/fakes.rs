//! Test doubles for the capability traits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use crate::capabilities::{ChartLibrary, HttpClient};
use crate::chart::{ChartOptions, DataTable, SvgCharts};
use crate::error::DashboardError;

/// Canned JSON responses keyed by URL. Unknown URLs fail like a 404.
#[derive(Default)]
pub struct FakeHttp {
    responses: Mutex<HashMap<String, Result<Value, DashboardError>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, body: Value) {
        self.responses.lock().unwrap().insert(url.to_string(), Ok(body));
    }

    pub fn fail(&self, url: &str, reason: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(DashboardError::fetch(url, reason)));
    }

    /// Holds requests to `url` until the returned handle is notified.
    pub fn gate(&self, url: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(url.to_string(), notify.clone());
        notify
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn get_json(&self, url: &str) -> Result<Value, DashboardError> {
        self.calls.lock().unwrap().push(url.to_string());
        let gate = self.gates.lock().unwrap().get(url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(DashboardError::fetch(url, "404 Not Found")))
    }
}

/// SVG charts that remember every table they were asked to draw.
#[derive(Default)]
pub struct RecordingCharts {
    inner: SvgCharts,
    drawn: Mutex<Vec<DataTable>>,
}

impl RecordingCharts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drawn(&self) -> Vec<DataTable> {
        self.drawn.lock().unwrap().clone()
    }
}

impl ChartLibrary for RecordingCharts {
    fn build_table(&self, rows: &Value) -> Result<DataTable, DashboardError> {
        self.inner.build_table(rows)
    }

    fn draw_pie_chart(&self, table: &DataTable, options: &ChartOptions) -> Result<String, DashboardError> {
        self.drawn.lock().unwrap().push(table.clone());
        self.inner.draw_pie_chart(table, options)
    }

    fn draw_column_chart(&self, table: &DataTable, options: &ChartOptions) -> Result<String, DashboardError> {
        self.drawn.lock().unwrap().push(table.clone());
        self.inner.draw_column_chart(table, options)
    }

    fn draw_timeline_chart(&self, table: &DataTable, options: &ChartOptions) -> Result<String, DashboardError> {
        self.drawn.lock().unwrap().push(table.clone());
        self.inner.draw_timeline_chart(table, options)
    }
}
