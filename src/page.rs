use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::capabilities::{DomHandle, ElementId};
use crate::error::DashboardError;
use crate::models::{Notice, PageSnapshot, SelectOption};

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

struct PageInner {
    visible: HashSet<ElementId>,
    options: Vec<SelectOption>,
    selected: String,
    contents: HashMap<ElementId, String>,
    notice: Option<Notice>,
    listeners: Vec<UnboundedSender<String>>,
}

/// In-memory page holding the elements the dashboard drives.
/// Starts with only the loading indicator visible.
pub struct Page {
    inner: Mutex<PageInner>,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PageInner {
                visible: HashSet::from([ElementId::Loading]),
                options: Vec::new(),
                selected: String::new(),
                contents: HashMap::new(),
                notice: None,
                listeners: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PageInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// User picks a value in the selection control. Empty means the placeholder.
    pub fn select(&self, value: &str) -> Result<(), DashboardError> {
        let mut inner = self.lock();
        if !value.is_empty() && !inner.options.iter().any(|o| o.value == value) {
            return Err(DashboardError::UnknownUser(value.to_string()));
        }
        inner.selected = value.to_string();
        inner.listeners.retain(|tx| tx.send(value.to_string()).is_ok());
        debug!(value, listeners = inner.listeners.len(), "selection changed");
        Ok(())
    }

    pub fn snapshot(&self) -> PageSnapshot {
        let inner = self.lock();
        PageSnapshot {
            loading_visible: inner.visible.contains(&ElementId::Loading),
            select_visible: inner.visible.contains(&ElementId::UserSelect),
            chart_visible: inner.visible.contains(&ElementId::ChartContainer),
            options: inner.options.clone(),
            selected: inner.selected.clone(),
            notice: inner.notice.clone(),
        }
    }

    /// Full HTML document for the current state
    pub fn render_html(&self, title: &str) -> String {
        let inner = self.lock();
        let hidden = |id: ElementId| {
            if inner.visible.contains(&id) {
                ""
            } else {
                " hidden"
            }
        };

        let mut html = String::new();
        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title>",
            escape_html(title)
        );
        if inner.visible.contains(&ElementId::Loading) {
            html.push_str("<meta http-equiv=\"refresh\" content=\"1\">");
        }
        let _ = write!(html, "</head><body><h1>{}</h1>", escape_html(title));

        let _ = write!(
            html,
            "<div id=\"loading\"{}>Loading...</div>",
            hidden(ElementId::Loading)
        );

        let _ = write!(
            html,
            "<form method=\"get\" action=\"/select\"><select id=\"user_id\" name=\"user_id\" onchange=\"this.form.submit()\"{}>",
            hidden(ElementId::UserSelect)
        );
        let _ = write!(
            html,
            "<option value=\"\"{}>--</option>",
            if inner.selected.is_empty() { " selected" } else { "" }
        );
        for option in &inner.options {
            let _ = write!(
                html,
                "<option value=\"{}\"{}>{}</option>",
                escape_html(&option.value),
                if option.value == inner.selected { " selected" } else { "" },
                escape_html(&option.label)
            );
        }
        html.push_str("</select></form>");

        let _ = write!(html, "<div id=\"error\"{}>", hidden(ElementId::ErrorBanner));
        if let Some(notice) = &inner.notice {
            let _ = write!(html, "<p>{}</p>", escape_html(&notice.message));
            if let Some(retry) = &notice.retry {
                let _ = write!(html, "<a href=\"{}\">Retry</a>", escape_html(retry));
            }
        }
        html.push_str("</div>");

        let _ = write!(
            html,
            "<div id=\"chart_div\"{}>{}</div>",
            hidden(ElementId::ChartContainer),
            inner
                .contents
                .get(&ElementId::ChartContainer)
                .map(String::as_str)
                .unwrap_or("")
        );
        html.push_str("</body></html>\n");
        html
    }
}

#[cfg(test)]
impl Page {
    pub fn content(&self, id: ElementId) -> String {
        self.lock().contents.get(&id).cloned().unwrap_or_default()
    }

    pub fn options(&self) -> Vec<SelectOption> {
        self.lock().options.clone()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.lock().notice.clone()
    }
}

impl DomHandle for Page {
    fn show(&self, id: ElementId) {
        self.lock().visible.insert(id);
    }

    fn hide(&self, id: ElementId) {
        self.lock().visible.remove(&id);
    }

    fn is_visible(&self, id: ElementId) -> bool {
        self.lock().visible.contains(&id)
    }

    fn append_option(&self, value: &str, label: &str) {
        self.lock().options.push(SelectOption {
            value: value.to_string(),
            label: label.to_string(),
        });
    }

    fn replace_options(&self, options: Vec<SelectOption>) {
        let mut inner = self.lock();
        inner.options = options;
        if inner.selected.is_empty() {
            return;
        }
        let selected = inner.selected.clone();
        if !inner.options.iter().any(|o| o.value == selected) {
            inner.selected.clear();
            inner.listeners.retain(|tx| tx.send(String::new()).is_ok());
            debug!(previous = %selected, "selected user left the directory");
        }
    }

    fn selected_value(&self) -> String {
        self.lock().selected.clone()
    }

    fn set_content(&self, id: ElementId, markup: String) {
        self.lock().contents.insert(id, markup);
    }

    fn set_notice(&self, notice: Option<Notice>) {
        let mut inner = self.lock();
        if notice.is_some() {
            inner.visible.insert(ElementId::ErrorBanner);
        } else {
            inner.visible.remove(&ElementId::ErrorBanner);
        }
        inner.notice = notice;
    }

    fn on_change(&self) -> UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().listeners.push(tx);
        rx
    }
}
