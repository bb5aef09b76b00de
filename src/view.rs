//! View state for the Tools page: which tab is active and the theme.
//!
//! Both are plain values owned by [`crate::tools::DevTools`] and passed down,
//! so pipelines can be exercised without any UI mounted.

use serde::{Deserialize, Serialize};

/// The three mutually exclusive tool tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolTab {
    #[default]
    Qr,
    Resize,
    Document,
}

impl ToolTab {
    pub const ALL: [ToolTab; 3] = [ToolTab::Qr, ToolTab::Resize, ToolTab::Document];

    /// Tab caption.
    pub fn label(self) -> &'static str {
        match self {
            ToolTab::Qr => "QR Code Generator",
            ToolTab::Resize => "Image Resizer",
            ToolTab::Document => "Document to PDF",
        }
    }

    /// Short name used in logs and errors.
    pub fn key(self) -> &'static str {
        match self {
            ToolTab::Qr => "qr",
            ToolTab::Resize => "resize",
            ToolTab::Document => "pdf",
        }
    }
}

/// Light or dark presentation. Has no effect on pipeline output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Active tab plus theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolsView {
    active: ToolTab,
    theme: Theme,
}

impl ToolsView {
    pub fn new(active: ToolTab, theme: Theme) -> Self {
        Self { active, theme }
    }

    pub fn active(&self) -> ToolTab {
        self.active
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn is_active(&self, tab: ToolTab) -> bool {
        self.active == tab
    }

    /// Activate `tab`. Returns the tab that was left, if it changed.
    pub fn select(&mut self, tab: ToolTab) -> Option<ToolTab> {
        if self.active == tab {
            return None;
        }
        let previous = self.active;
        self.active = tab;
        Some(previous)
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_tab_is_active() {
        let mut view = ToolsView::default();
        for tab in ToolTab::ALL {
            view.select(tab);
            let active: Vec<_> = ToolTab::ALL.iter().filter(|t| view.is_active(**t)).collect();
            assert_eq!(active, vec![&tab]);
        }
    }

    #[test]
    fn select_reports_previous_tab() {
        let mut view = ToolsView::default();
        assert_eq!(view.select(ToolTab::Qr), None);
        assert_eq!(view.select(ToolTab::Document), Some(ToolTab::Qr));
        assert_eq!(view.active(), ToolTab::Document);
    }

    #[test]
    fn theme_toggles() {
        let mut view = ToolsView::default();
        assert_eq!(view.toggle_theme(), Theme::Dark);
        assert_eq!(view.toggle_theme(), Theme::Light);
    }
}
