use crate::types::ScanKey;
use crossterm::style::Color;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Short human form of a duration: `42s`, `7m`, `3h`, `12d`.
pub fn format_age(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    if total_secs < 60 {
        format!("{}s", total_secs)
    } else if total_secs < 3600 {
        format!("{}m", total_secs / 60)
    } else if total_secs < 86400 {
        format!("{}h", total_secs / 3600)
    } else {
        format!("{}d", total_secs / 86400)
    }
}

const HEADER_PALETTE: [Color; 10] = [
    Color::Cyan,
    Color::Green,
    Color::Yellow,
    Color::Magenta,
    Color::Blue,
    Color::AnsiValue(96),
    Color::AnsiValue(92),
    Color::AnsiValue(93),
    Color::AnsiValue(95),
    Color::AnsiValue(94),
];

/// Header colour for a namespace; the same key keeps its colour between passes.
pub fn header_color(key: &ScanKey) -> Color {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    HEADER_PALETTE[(hasher.finish() % HEADER_PALETTE.len() as u64) as usize]
}
