//! Console color palette
//!
//! Colors are configured as small integer codes 0-15 using the classic
//! console numbering, where bit 0 is blue, bit 1 green, bit 2 red and bit 3
//! intensity. Each code maps to the matching owo-colors `AnsiColors`, which
//! renders the SGR sequences.

use std::fmt;

use owo_colors::{AnsiColors, DynColor, OwoColorize, Style};

/// ANSI reset that owo-colors appends after a styled segment
pub const RESET: &str = "\x1b[0m";

/// Color names accepted in configuration, indexed by code
pub const COLOR_NAMES: [&str; 16] = [
    "BLACK",
    "BLUE",
    "GREEN",
    "CYAN",
    "RED",
    "MAGENTA",
    "YELLOW",
    "WHITE",
    "BRIGHT_BLACK",
    "BRIGHT_BLUE",
    "BRIGHT_GREEN",
    "BRIGHT_CYAN",
    "BRIGHT_RED",
    "BRIGHT_MAGENTA",
    "BRIGHT_YELLOW",
    "BRIGHT_WHITE",
];

/// Terminal colors, indexed by code
const ANSI: [AnsiColors; 16] = [
    AnsiColors::Black,
    AnsiColors::Blue,
    AnsiColors::Green,
    AnsiColors::Cyan,
    AnsiColors::Red,
    AnsiColors::Magenta,
    AnsiColors::Yellow,
    AnsiColors::White,
    AnsiColors::BrightBlack,
    AnsiColors::BrightBlue,
    AnsiColors::BrightGreen,
    AnsiColors::BrightCyan,
    AnsiColors::BrightRed,
    AnsiColors::BrightMagenta,
    AnsiColors::BrightYellow,
    AnsiColors::BrightWhite,
];

/// A validated color code in `0..=15`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorCode(u8);

impl ColorCode {
    /// Highest valid code
    pub const MAX: u8 = 15;

    pub const BLUE: Self = Self(1);
    pub const BRIGHT_BLACK: Self = Self(8);
    pub const BRIGHT_RED: Self = Self(12);

    /// Create from a numeric code, `None` if out of range
    #[inline]
    pub const fn new(code: u8) -> Option<Self> {
        if code <= Self::MAX {
            Some(Self(code))
        } else {
            None
        }
    }

    /// Look up a color by name (case-insensitive, `-` and `_` interchangeable)
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_uppercase().replace('-', "_");
        COLOR_NAMES
            .iter()
            .position(|candidate| *candidate == normalized)
            .map(|idx| Self(idx as u8))
    }

    /// Numeric code
    #[inline]
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Canonical name
    #[inline]
    pub const fn name(self) -> &'static str {
        COLOR_NAMES[self.0 as usize]
    }

    /// Terminal color for this code
    #[inline]
    pub const fn ansi(self) -> AnsiColors {
        ANSI[self.0 as usize]
    }

    /// Foreground style for this code
    #[inline]
    pub fn style(self) -> Style {
        Style::new().color(self.ansi())
    }

    /// SGR sequence that starts this color
    pub fn sgr(self) -> String {
        Foreground(self.ansi()).to_string()
    }

    /// `text` in this color, followed by [`RESET`]
    pub fn paint(self, text: &str) -> String {
        text.style(self.style()).to_string()
    }
}

/// Renders only the foreground start sequence of a color
struct Foreground(AnsiColors);

impl fmt::Display for Foreground {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_ansi_fg(f)
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}
