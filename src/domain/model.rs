use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn insert_opt(&mut self, key: &str, value: Option<String>) {
        let value = value
            .map(serde_json::Value::String)
            .unwrap_or(serde_json::Value::Null);
        self.data.insert(key.to_string(), value);
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Cell text as written to a report: strings verbatim, null as empty.
    pub fn cell(&self, key: &str) -> String {
        match self.data.get(key) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub processed_records: Vec<Record>,
    pub columns: Vec<String>,
}

/// Screen position in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Intersection with an image of the given size, `None` when empty.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Region> {
        let x_end = (self.x.saturating_add(self.width)).min(width);
        let y_end = (self.y.saturating_add(self.height)).min(height);
        if self.x >= x_end || self.y >= y_end {
            return None;
        }
        Some(Region::new(self.x, self.y, x_end - self.x, y_end - self.y))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// RGB colour, parsed from and printed as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn parse(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn matches(&self, other: &Rgb, tolerance: u8) -> bool {
        self.0.abs_diff(other.0) <= tolerance
            && self.1.abs_diff(other.1) <= tolerance
            && self.2.abs_diff(other.2) <= tolerance
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_cell_rendering() {
        let mut record = Record::new().with("processo", "213/2016").with("pages", 3);
        record.insert_opt("matricula", None);

        assert_eq!(record.cell("processo"), "213/2016");
        assert_eq!(record.cell("pages"), "3");
        assert_eq!(record.cell("matricula"), "");
        assert_eq!(record.cell("missing"), "");
    }

    #[test]
    fn test_region_clamp() {
        let region = Region::new(90, 10, 50, 50);
        assert_eq!(region.clamp_to(100, 100), Some(Region::new(90, 10, 10, 50)));
        assert_eq!(Region::new(120, 0, 5, 5).clamp_to(100, 100), None);
    }

    #[test]
    fn test_rgb_parse_and_match() {
        let white = Rgb::parse("#FFFFFF").unwrap();
        assert_eq!(white, Rgb(255, 255, 255));
        assert_eq!(white.to_string(), "#ffffff");
        assert!(Rgb(250, 252, 255).matches(&white, 5));
        assert!(!Rgb(240, 255, 255).matches(&white, 5));
        assert!(Rgb::parse("#fff").is_none());
        assert!(Rgb::parse("zzzzzz").is_none());
    }
}
