use once_cell::sync::Lazy;
use ratatui::style::Color;
use std::sync::atomic::{AtomicUsize, Ordering};

// Color palette structure
#[derive(Clone)]
pub struct Base16Palette {
    pub base_00: Color, // Background
    pub base_01: Color, // Lighter background
    pub base_02: Color, // Selection background
    pub base_03: Color, // Comments, muted text
    pub base_04: Color, // Dark foreground
    pub base_05: Color, // Default foreground
    pub base_06: Color, // Light foreground
    pub base_07: Color, // Brightest text
    pub base_08: Color, // Red
    pub base_09: Color, // Orange
    pub base_0a: Color, // Yellow
    pub base_0b: Color, // Green
    pub base_0c: Color, // Cyan
    pub base_0d: Color, // Blue
    pub base_0e: Color, // Purple
    pub base_0f: Color, // Brown
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ThemeId {
    Dark = 0,
    Light = 1,
}

impl ThemeId {
    pub fn name(&self) -> &'static str {
        match self {
            ThemeId::Dark => "Dark",
            ThemeId::Light => "Light",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "light" => ThemeId::Light,
            _ => ThemeId::Dark,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            ThemeId::Dark => ThemeId::Light,
            ThemeId::Light => ThemeId::Dark,
        }
    }

    fn from_index(idx: usize) -> Self {
        match idx {
            1 => ThemeId::Light,
            _ => ThemeId::Dark,
        }
    }
}

static CURRENT_THEME_INDEX: AtomicUsize = AtomicUsize::new(0);

pub fn current_theme_id() -> ThemeId {
    ThemeId::from_index(CURRENT_THEME_INDEX.load(Ordering::Relaxed))
}

pub fn set_theme(theme: ThemeId) {
    CURRENT_THEME_INDEX.store(theme as usize, Ordering::Relaxed);
}

/// Flip between dark and light, returning the newly active theme.
pub fn toggle_theme() -> ThemeId {
    let next = current_theme_id().toggled();
    set_theme(next);
    next
}

pub fn current_theme() -> &'static Base16Palette {
    match current_theme_id() {
        ThemeId::Dark => &DARK_PALETTE,
        ThemeId::Light => &LIGHT_PALETTE,
    }
}

fn rgb(hex: u32) -> Color {
    Color::Rgb(
        ((hex >> 16) & 0xFF) as u8,
        ((hex >> 8) & 0xFF) as u8,
        (hex & 0xFF) as u8,
    )
}

// Dark theme, adapted from Tokyo Night Storm
static DARK_PALETTE: Lazy<Base16Palette> = Lazy::new(|| Base16Palette {
    base_00: rgb(0x24283B),
    base_01: rgb(0x1F2335),
    base_02: rgb(0x3B4261),
    base_03: rgb(0x565F89),
    base_04: rgb(0x737AA2),
    base_05: rgb(0xA9B1D6),
    base_06: rgb(0xC0CAF5),
    base_07: rgb(0xD5D6DB),
    base_08: rgb(0xF7768E),
    base_09: rgb(0xFF9E64),
    base_0a: rgb(0xE0AF68),
    base_0b: rgb(0x9ECE6A),
    base_0c: rgb(0x7DCFFF),
    base_0d: rgb(0x7AA2F7),
    base_0e: rgb(0xBB9AF7),
    base_0f: rgb(0xDB4B4B),
});

// Light theme, adapted from Tokyo Night Day
static LIGHT_PALETTE: Lazy<Base16Palette> = Lazy::new(|| Base16Palette {
    base_00: rgb(0xE1E2E7),
    base_01: rgb(0xD5D6DB),
    base_02: rgb(0xC4C8DA),
    base_03: rgb(0x9699A3),
    base_04: rgb(0x6172B0),
    base_05: rgb(0x3760BF),
    base_06: rgb(0x2E3C64),
    base_07: rgb(0x0F0F14),
    base_08: rgb(0xF52A65),
    base_09: rgb(0xB15C00),
    base_0a: rgb(0x8C6C3E),
    base_0b: rgb(0x587539),
    base_0c: rgb(0x007197),
    base_0d: rgb(0x2E7DE9),
    base_0e: rgb(0x9854F1),
    base_0f: rgb(0xC64343),
});

// Color utilities for focus states
impl Base16Palette {
    // Get colors for focused/unfocused panels
    pub fn get_panel_colors(&self, is_focused: bool) -> (Color, Color, Color) {
        if is_focused {
            (self.base_07, self.base_04, self.base_00)
        } else {
            (self.base_03, self.base_03, self.base_00)
        }
    }

    // Get selection colors for focused/unfocused states
    pub fn get_selection_colors(&self, is_focused: bool) -> (Color, Color) {
        if is_focused {
            (self.base_02, self.base_06)
        } else {
            (self.base_02, self.base_03)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_names_round_trip() {
        assert_eq!(ThemeId::from_name("Light"), ThemeId::Light);
        assert_eq!(ThemeId::from_name("dark"), ThemeId::Dark);
        assert_eq!(ThemeId::from_name("unknown"), ThemeId::Dark);
        assert_eq!(ThemeId::Light.toggled(), ThemeId::Dark);
        assert_eq!(ThemeId::Dark.toggled(), ThemeId::Light);
    }

    #[test]
    #[serial_test::serial]
    fn global_theme_state_toggles() {
        set_theme(ThemeId::Dark);
        assert_eq!(current_theme_id(), ThemeId::Dark);
        assert_eq!(toggle_theme(), ThemeId::Light);
        assert_eq!(current_theme_id(), ThemeId::Light);
        set_theme(ThemeId::Dark);
    }
}
