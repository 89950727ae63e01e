//! Terminal output and interactive prompts.
//!
//! Info goes to stdout; errors, warnings, and debug output go to stderr, so
//! piped output stays clean.

pub mod theme;

use std::io;

use crossterm::style::Stylize;
use is_terminal::IsTerminal;
use unicode_width::UnicodeWidthStr;

use theme::{icons, icons_ascii, StackpackTheme};

pub struct Ui {
    pub color: bool,
    pub unicode: bool,
    pub debug: bool,
}

impl Ui {
    /// Detect terminal capabilities, honoring `--no-color`/`--debug` flags
    /// and the `NO_COLOR`, `STACKPACK_NO_COLOR`, `STACKPACK_DEBUG` variables.
    pub fn detect(no_color_flag: bool, debug_flag: bool) -> Self {
        let color = !no_color_flag
            && std::env::var_os("NO_COLOR").is_none()
            && std::env::var_os("STACKPACK_NO_COLOR").is_none()
            && io::stdout().is_terminal();
        let debug = debug_flag
            || std::env::var("STACKPACK_DEBUG").map(|v| v == "1").unwrap_or(false);
        Self {
            color,
            unicode: detect_unicode(),
            debug,
        }
    }

    pub fn is_interactive(&self) -> bool {
        io::stdin().is_terminal() && io::stdout().is_terminal()
    }

    fn icon(&self, unicode: &'static str, ascii: &'static str) -> &'static str {
        if self.unicode {
            unicode
        } else {
            ascii
        }
    }

    pub fn success(&self, msg: &str) {
        let icon = self.icon(icons::SUCCESS, icons_ascii::SUCCESS);
        if self.color {
            println!("{} {msg}", icon.green());
        } else {
            println!("{icon} {msg}");
        }
    }

    pub fn info(&self, msg: &str) {
        let icon = self.icon(icons::PROGRESS, icons_ascii::PROGRESS);
        if self.color {
            println!("{} {msg}", icon.cyan());
        } else {
            println!("{icon} {msg}");
        }
    }

    /// Indented follow-up line under a success/info message.
    pub fn detail(&self, msg: &str) {
        let icon = self.icon(icons::ARROW, icons_ascii::ARROW);
        if self.color {
            println!("  {} {}", icon.dark_grey(), msg);
        } else {
            println!("  {icon} {msg}");
        }
    }

    pub fn plain(&self, msg: &str) {
        println!("{msg}");
    }

    pub fn warn(&self, msg: &str) {
        let icon = self.icon(icons::WARNING, icons_ascii::WARNING);
        if self.color {
            eprintln!("{} {msg}", icon.yellow());
        } else {
            eprintln!("{icon} {msg}");
        }
    }

    pub fn error(&self, msg: &str) {
        let icon = self.icon(icons::ERROR, icons_ascii::ERROR);
        if self.color {
            eprintln!("{} {msg}", icon.red());
        } else {
            eprintln!("{icon} {msg}");
        }
    }

    pub fn debug(&self, msg: &str) {
        if self.debug {
            eprintln!("[debug] {msg}");
        }
    }

    /// Print a column-aligned table. Widths are display widths, so wide
    /// characters align correctly.
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        print!("{}", render_table(headers, rows));
    }

    /// Yes/no prompt. Falls back to `default` when not attached to a TTY.
    pub fn confirm(&self, prompt: &str, default: bool) -> io::Result<bool> {
        if !self.is_interactive() {
            return Ok(default);
        }
        dialoguer::Confirm::with_theme(&StackpackTheme::new(self.unicode))
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(|e| io::Error::other(e.to_string()))
    }

    /// Multi-select prompt returning selected indices. Empty when not a TTY.
    pub fn multi_select(&self, prompt: &str, items: &[String]) -> io::Result<Vec<usize>> {
        if !self.is_interactive() {
            return Ok(Vec::new());
        }
        dialoguer::MultiSelect::with_theme(&StackpackTheme::new(self.unicode))
            .with_prompt(prompt)
            .items(items)
            .interact()
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

fn detect_unicode() -> bool {
    for var in ["LC_ALL", "LC_CTYPE", "LANG"] {
        if let Ok(value) = std::env::var(var) {
            if !value.is_empty() {
                return value.to_uppercase().contains("UTF");
            }
        }
    }
    true
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.width());
            }
        }
    }

    let mut out = String::new();
    let render_row = |cells: &[String], out: &mut String| {
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate() {
            line.push_str(cell);
            if i + 1 < cells.len() {
                let pad = widths[i].saturating_sub(cell.width()) + 2;
                line.push_str(&" ".repeat(pad));
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    };

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    render_row(&header_cells, &mut out);
    for row in rows {
        render_row(row, &mut out);
    }
    out
}
