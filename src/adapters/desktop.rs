use crate::adapters::browser::SystemBrowserLauncher;
use crate::domain::model::{MouseButton, Point};
use crate::domain::ports::{ClipboardSource, Desktop, InputDriver, ScreenSource};
use crate::utils::error::{AutomationError, Result};
use arboard::Clipboard;
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use image::RgbaImage;
use screenshots::Screen;

impl From<MouseButton> for Button {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        }
    }
}

pub struct EnigoInput {
    enigo: Enigo,
}

impl EnigoInput {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| AutomationError::InputError(format!("cannot connect to the display: {}", e)))?;
        Ok(Self { enigo })
    }

    fn key(&mut self, key: &str, direction: Direction) -> Result<()> {
        let key = parse_key(key)?;
        self.enigo
            .key(key, direction)
            .map_err(|e| AutomationError::InputError(e.to_string()))
    }
}

impl InputDriver for EnigoInput {
    fn move_to(&mut self, point: Point) -> Result<()> {
        self.enigo
            .move_mouse(point.x, point.y, Coordinate::Abs)
            .map_err(|e| AutomationError::InputError(e.to_string()))
    }

    fn click(&mut self, button: MouseButton, clicks: u32) -> Result<()> {
        for _ in 0..clicks {
            self.enigo
                .button(button.into(), Direction::Click)
                .map_err(|e| AutomationError::InputError(e.to_string()))?;
        }
        Ok(())
    }

    fn type_text(&mut self, text: &str) -> Result<()> {
        self.enigo
            .text(text)
            .map_err(|e| AutomationError::InputError(e.to_string()))
    }

    fn press_key(&mut self, key: &str) -> Result<()> {
        self.key(key, Direction::Click)
    }

    fn hotkey(&mut self, keys: &[String]) -> Result<()> {
        chord(keys, |key, direction| self.key(key, direction))
    }

    fn cursor_position(&self) -> Result<Point> {
        let (x, y) = self
            .enigo
            .location()
            .map_err(|e| AutomationError::InputError(e.to_string()))?;
        Ok(Point::new(x, y))
    }
}

/// Holds all but the last key, clicks the last one, then releases the held
/// keys in reverse order. Every held key is released even when a step fails;
/// the first error is returned.
fn chord<F>(keys: &[String], mut send: F) -> Result<()>
where
    F: FnMut(&str, Direction) -> Result<()>,
{
    let Some((last, modifiers)) = keys.split_last() else {
        return Ok(());
    };
    let mut held = Vec::with_capacity(modifiers.len());
    let mut outcome = Ok(());
    for key in modifiers {
        match send(key.as_str(), Direction::Press) {
            Ok(()) => held.push(key),
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }
    if outcome.is_ok() {
        outcome = send(last.as_str(), Direction::Click);
    }
    for key in held.into_iter().rev() {
        let released = send(key.as_str(), Direction::Release);
        outcome = outcome.and(released);
    }
    outcome
}

/// Captures the primary monitor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryScreen;

impl ScreenSource for PrimaryScreen {
    fn capture(&self) -> Result<RgbaImage> {
        let screens = Screen::all().map_err(|e| AutomationError::ScreenError(e.to_string()))?;
        let screen = screens
            .iter()
            .find(|s| s.display_info.is_primary)
            .or_else(|| screens.first())
            .ok_or_else(|| AutomationError::ScreenError("no monitor found".to_string()))?;

        let captured = screen
            .capture()
            .map_err(|e| AutomationError::ScreenError(e.to_string()))?;
        let (width, height) = (captured.width(), captured.height());

        // screenshots re-exports an older `image`; move the raw buffer across
        RgbaImage::from_raw(width, height, captured.into_raw())
            .ok_or_else(|| AutomationError::ScreenError("capture buffer size mismatch".to_string()))
    }
}

pub struct ArboardClipboard {
    clipboard: Clipboard,
}

impl ArboardClipboard {
    pub fn new() -> Result<Self> {
        let clipboard = Clipboard::new().map_err(|e| AutomationError::ClipboardError(e.to_string()))?;
        Ok(Self { clipboard })
    }
}

impl ClipboardSource for ArboardClipboard {
    fn get_text(&mut self) -> Result<String> {
        match self.clipboard.get_text() {
            Ok(text) => Ok(text),
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(AutomationError::ClipboardError(e.to_string())),
        }
    }

    fn clear(&mut self) -> Result<()> {
        self.clipboard
            .clear()
            .map_err(|e| AutomationError::ClipboardError(e.to_string()))
    }
}

/// The real desktop: enigo input, primary screen, system clipboard, system browser.
pub fn system_desktop() -> Result<Desktop> {
    Ok(Desktop {
        input: Box::new(EnigoInput::new()?),
        screen: Box::new(PrimaryScreen),
        clipboard: Box::new(ArboardClipboard::new()?),
        browser: Box::new(SystemBrowserLauncher),
    })
}

pub fn parse_key(key: &str) -> Result<Key> {
    let lower = key.trim().to_lowercase();
    let k = match lower.as_str() {
        "enter" | "return" => Key::Return,
        "tab" => Key::Tab,
        "space" => Key::Space,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "escape" | "esc" => Key::Escape,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" => Key::PageUp,
        "pagedown" => Key::PageDown,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,

        "ctrl" | "control" => Key::Control,
        "alt" => Key::Alt,
        "shift" => Key::Shift,
        "meta" | "cmd" | "command" | "win" | "super" => Key::Meta,

        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,

        _ => {
            let mut chars = lower.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Unicode(c),
                _ => return Err(AutomationError::InvalidKey(key.to_string())),
            }
        }
    };
    Ok(k)
}
