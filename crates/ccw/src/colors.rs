//! Semantic color theme for consistent terminal output
//!
//! - `ACTIVE` => blue - headers, indices
//! - `SUCCESS` => green - live sessions, completed operations
//! - `WARNING` => yellow - confirmations, skipped items
//! - `FAIL` => red - dead sessions, errors

use std::sync::LazyLock;

use owo_colors::Style;

/// Semantic color definitions for terminal output
pub struct SemanticColors {
    pub active: Style,
    pub success: Style,
    pub warning: Style,
    pub fail: Style,
    /// Secondary details such as paths
    pub dim: Style,
}

impl Default for SemanticColors {
    fn default() -> Self {
        Self {
            active: Style::new().blue(),
            success: Style::new().green(),
            warning: Style::new().yellow(),
            fail: Style::new().red(),
            dim: Style::new().dimmed(),
        }
    }
}

/// Global default theme
pub static COLORS: LazyLock<SemanticColors> = LazyLock::new(SemanticColors::default);

/// Styled text when stdout is a terminal, plain text otherwise
pub fn paint(text: &str, style: Style) -> String {
    use owo_colors::OwoColorize;

    if console::Term::stdout().is_term() {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}
