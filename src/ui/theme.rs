use crossterm::style::Color;
use dialoguer::theme::Theme;
use std::fmt;

/// Design tokens for the stackpack CLI.
///
/// All colors and icons used in output must come from this module, so every
/// command renders the same way.
pub mod colors {
    use super::Color;

    pub const SUCCESS: Color = Color::Green;
    pub const ERROR: Color = Color::Red;
    pub const WARNING: Color = Color::Yellow;
    pub const INFO: Color = Color::Cyan;
    pub const DIM: Color = Color::DarkGrey;
}

pub mod icons {
    pub const SUCCESS: &str = "✓";
    pub const ERROR: &str = "✗";
    pub const WARNING: &str = "⚠";
    pub const PROGRESS: &str = "●";
    pub const ARROW: &str = "↳";

    // Selection states (for MultiSelect).
    pub const SELECTED: &str = "●";
    pub const UNSELECTED: &str = "○";
}

pub mod icons_ascii {
    pub const SUCCESS: &str = "[OK]";
    pub const ERROR: &str = "[FAIL]";
    pub const WARNING: &str = "[WARN]";
    pub const PROGRESS: &str = "[..]";
    pub const ARROW: &str = "[>]";

    // Selection states (for MultiSelect).
    pub const SELECTED: &str = "[x]";
    pub const UNSELECTED: &str = "[ ]";
}

/// Custom theme for dialoguer prompts using stackpack design tokens.
///
/// Wraps `ColorfulTheme` and only overrides multi-select item formatting to
/// use our selection icons, preserving all other behaviors.
pub struct StackpackTheme {
    unicode: bool,
    inner: dialoguer::theme::ColorfulTheme,
}

impl StackpackTheme {
    pub fn new(unicode: bool) -> Self {
        Self {
            unicode,
            inner: dialoguer::theme::ColorfulTheme::default(),
        }
    }

    pub fn selected_icon(&self) -> &'static str {
        if self.unicode {
            icons::SELECTED
        } else {
            icons_ascii::SELECTED
        }
    }

    pub fn unselected_icon(&self) -> &'static str {
        if self.unicode {
            icons::UNSELECTED
        } else {
            icons_ascii::UNSELECTED
        }
    }
}

impl Theme for StackpackTheme {
    fn format_prompt(&self, f: &mut dyn fmt::Write, prompt: &str) -> fmt::Result {
        self.inner.format_prompt(f, prompt)
    }

    fn format_error(&self, f: &mut dyn fmt::Write, err: &str) -> fmt::Result {
        self.inner.format_error(f, err)
    }

    fn format_confirm_prompt(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        default: Option<bool>,
    ) -> fmt::Result {
        self.inner.format_confirm_prompt(f, prompt, default)
    }

    fn format_confirm_prompt_selection(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        selection: Option<bool>,
    ) -> fmt::Result {
        self.inner
            .format_confirm_prompt_selection(f, prompt, selection)
    }

    fn format_select_prompt(&self, f: &mut dyn fmt::Write, prompt: &str) -> fmt::Result {
        self.inner.format_select_prompt(f, prompt)
    }

    fn format_select_prompt_item(
        &self,
        f: &mut dyn fmt::Write,
        text: &str,
        active: bool,
    ) -> fmt::Result {
        self.inner.format_select_prompt_item(f, text, active)
    }

    fn format_multi_select_prompt(&self, f: &mut dyn fmt::Write, prompt: &str) -> fmt::Result {
        self.inner.format_multi_select_prompt(f, prompt)
    }

    fn format_multi_select_prompt_item(
        &self,
        f: &mut dyn fmt::Write,
        text: &str,
        checked: bool,
        active: bool,
    ) -> fmt::Result {
        let icon = if checked {
            self.selected_icon()
        } else {
            self.unselected_icon()
        };
        if active {
            write!(f, "> {icon} {text}")
        } else {
            write!(f, "  {icon} {text}")
        }
    }
}
