//! Concrete implementations of the domain ports: desktop input, screen
//! capture, clipboard, browser launch and PDF text extraction.

pub mod browser;
#[cfg(feature = "desktop")]
pub mod desktop;
pub mod pdf;

pub use browser::SystemBrowserLauncher;
#[cfg(feature = "desktop")]
pub use desktop::{system_desktop, ArboardClipboard, EnigoInput, PrimaryScreen};
pub use pdf::PdfTextExtractor;
