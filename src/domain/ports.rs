use crate::domain::model::{MouseButton, Point, Record, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use image::RgbaImage;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// File names directly under the storage root with the given extension
    /// (case-insensitive), sorted by name.
    fn list_files(
        &self,
        extension: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    /// Display path of an entry, for logs and return values.
    fn full_path(&self, path: &str) -> String;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}

pub trait TextExtractor: Send + Sync {
    /// All pages' text joined with newlines.
    fn extract_text(&self, name: &str, bytes: &[u8]) -> Result<String>;
}

/// Synthetic mouse and keyboard input.
pub trait InputDriver {
    fn move_to(&mut self, point: Point) -> Result<()>;
    fn click(&mut self, button: MouseButton, clicks: u32) -> Result<()>;
    fn type_text(&mut self, text: &str) -> Result<()>;
    /// Press and release one named key (`enter`, `tab`, `f5`, `a`, ...).
    fn press_key(&mut self, key: &str) -> Result<()>;
    /// Hold all but the last key, click the last one, release in reverse order.
    fn hotkey(&mut self, keys: &[String]) -> Result<()>;
    fn cursor_position(&self) -> Result<Point>;
}

pub trait ScreenSource {
    fn capture(&self) -> Result<RgbaImage>;
}

pub trait ClipboardSource {
    /// Current text; an empty clipboard reads as `""`.
    fn get_text(&mut self) -> Result<String>;
    fn clear(&mut self) -> Result<()>;
}

pub trait BrowserLauncher {
    /// Opens `url` with `browser` (a command), or the platform default when `None`.
    fn open(&self, browser: Option<&str>, url: &str) -> Result<()>;
}

/// Everything the workflow needs from the desktop, bundled.
pub struct Desktop {
    pub input: Box<dyn InputDriver>,
    pub screen: Box<dyn ScreenSource>,
    pub clipboard: Box<dyn ClipboardSource>,
    pub browser: Box<dyn BrowserLauncher>,
}
