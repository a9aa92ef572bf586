//! Colors and glyphs for terminal output

use console::{Color, Style};

/// Design system colors as 256-color approximations
pub struct Palette {
    pub primary: Style,
    pub success: Style,
    pub warning: Style,
    pub accent: Style,
    pub muted: Style,
    pub fg: Style,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl Palette {
    pub fn new() -> Self {
        // PRIMARY #64B5F6 ≈ 117, SUCCESS #A5D6A7 ≈ 114, WARNING #FFF59D ≈ 229,
        // ACCENT #FFCA28 ≈ 220, MUTED #546E7A ≈ 242, FG #D4D4D7 ≈ 252
        Self {
            primary: Style::new().fg(Color::Color256(117)),
            success: Style::new().fg(Color::Color256(114)),
            warning: Style::new().fg(Color::Color256(229)),
            accent: Style::new().fg(Color::Color256(220)),
            muted: Style::new().fg(Color::Color256(242)),
            fg: Style::new().fg(Color::Color256(252)),
        }
    }
}

pub mod symbols {
    pub const LOADING: &str = "󰊍";
    pub const SUCCESS: &str = "󰄂";
    pub const WARNING: &str = "⚠";
    pub const SEARCH: &str = "󰍉";
    pub const FILE: &str = "󰈙";
    pub const FUNCTION: &str = "󰊕";
    pub const STRUCT: &str = "󰆧";
    pub const DIVIDER: &str = "─";
    pub const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
}
