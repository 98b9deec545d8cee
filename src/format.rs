use serde::{Deserialize, Serialize};

/// Shown in place of a value that is missing or not a number
pub const PLACEHOLDER: &str = "—";

fn trim_decimals(s: String) -> String {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn scaled(n: f64, divisor: f64, suffix: &str) -> String {
    let text = format!("{:.2}", n / divisor);
    let text = text.strip_suffix(".00").map(str::to_string).unwrap_or(text);
    format!("{}{}", text, suffix)
}

/// Compact rendering of a summary figure: `1.5k`, `2.35M`, `3B`, `12.5`
pub fn human_format(value: Option<f64>) -> String {
    let n = match value {
        Some(n) if !n.is_nan() => n,
        _ => return PLACEHOLDER.to_string(),
    };
    let abs = n.abs();
    if abs >= 1e9 {
        scaled(n, 1e9, "B")
    } else if abs >= 1e6 {
        scaled(n, 1e6, "M")
    } else if abs >= 1e3 {
        scaled(n, 1e3, "k")
    } else if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        trim_decimals(format!("{:.2}", (n * 100.0).round() / 100.0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

/// A change between two readings, split into direction and size
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub direction: Direction,
    pub magnitude: f64,
}

pub fn format_delta(delta: Option<f64>) -> Option<Delta> {
    let d = delta.filter(|d| !d.is_nan())?;
    let direction = if d > 0.0 {
        Direction::Up
    } else if d < 0.0 {
        Direction::Down
    } else {
        Direction::Flat
    };
    Some(Delta {
        direction,
        magnitude: d.abs(),
    })
}

pub fn format_percent(percent: Option<f64>) -> Option<String> {
    percent
        .filter(|p| !p.is_nan())
        .map(|p| format!("{:.2}%", p))
}
