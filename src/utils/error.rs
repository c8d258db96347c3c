use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("PDF text extraction failed for {file}: {message}")]
    PdfError { file: String, message: String },

    #[error("Element '{element}' not found on screen after {timeout_ms}ms")]
    ElementNotFound { element: String, timeout_ms: u64 },

    #[error("Unknown element '{name}'")]
    UnknownElement { name: String },

    #[error("Unknown variable '{{{name}}}'")]
    UnknownVariable { name: String },

    #[error("Input failed: {0}")]
    InputError(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Screen capture failed: {0}")]
    ScreenError(String),

    #[error("Clipboard access failed: {0}")]
    ClipboardError(String),

    #[error("Browser launch failed: {0}")]
    BrowserLaunchError(String),

    #[error("Site {url} did not respond within {timeout_secs}s")]
    SessionUnreachable { url: String, timeout_secs: u64 },

    #[error("Fail-safe triggered: cursor moved to the screen origin")]
    FailSafeTriggered,

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Screen,
    Input,
    Network,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AutomationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AutomationError::ConfigValidationError { .. }
            | AutomationError::InvalidConfigValueError { .. }
            | AutomationError::MissingConfigError { .. }
            | AutomationError::UnknownElement { .. }
            | AutomationError::UnknownVariable { .. } => ErrorCategory::Configuration,
            AutomationError::ElementNotFound { .. }
            | AutomationError::ScreenError(_)
            | AutomationError::ImageError(_) => ErrorCategory::Screen,
            AutomationError::InputError(_)
            | AutomationError::InvalidKey(_)
            | AutomationError::ClipboardError(_)
            | AutomationError::FailSafeTriggered => ErrorCategory::Input,
            AutomationError::HttpError(_)
            | AutomationError::SessionUnreachable { .. }
            | AutomationError::BrowserLaunchError(_) => ErrorCategory::Network,
            AutomationError::CsvError(_)
            | AutomationError::PdfError { .. }
            | AutomationError::ProcessingError { .. } => ErrorCategory::Data,
            AutomationError::IoError(_) | AutomationError::ZipError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // the UI may simply not have finished rendering
            AutomationError::ElementNotFound { .. }
            | AutomationError::SessionUnreachable { .. }
            | AutomationError::HttpError(_) => ErrorSeverity::Medium,
            AutomationError::IoError(_)
            | AutomationError::ZipError(_)
            | AutomationError::BrowserLaunchError(_)
            | AutomationError::ScreenError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            AutomationError::ConfigValidationError { .. }
            | AutomationError::InvalidConfigValueError { .. }
            | AutomationError::MissingConfigError { .. } => {
                "Check the workflow file and command line arguments"
            }
            AutomationError::UnknownElement { .. } => {
                "Declare the element under [elements] in the workflow file"
            }
            AutomationError::UnknownVariable { .. } => {
                "Use a column of the input CSV, a session value, or a variable set by an earlier step"
            }
            AutomationError::ElementNotFound { .. } => {
                "Increase the timeout, lower the template confidence, or recapture the template image"
            }
            AutomationError::FailSafeTriggered => {
                "The run was aborted on purpose; move the cursor away from the corner and restart"
            }
            AutomationError::SessionUnreachable { .. } | AutomationError::HttpError(_) => {
                "Check the network connection and the SIGAJUS address"
            }
            AutomationError::BrowserLaunchError(_) => {
                "Check that the configured browser is installed and on PATH"
            }
            AutomationError::ScreenError(_)
            | AutomationError::InputError(_)
            | AutomationError::ClipboardError(_) => {
                "Make sure a graphical session is available and the tool was built with the 'desktop' feature"
            }
            AutomationError::InvalidKey(_) => "Use a key name such as enter, tab, esc, ctrl, f5",
            AutomationError::PdfError { .. } => {
                "The PDF may be scanned or encrypted; run OCR on it first"
            }
            AutomationError::IoError(_) => "Check file paths and permissions",
            _ => "Run again with --verbose for more details",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Screen => format!("Screen recognition problem: {}", self),
            ErrorCategory::Input => format!("Automation problem: {}", self),
            ErrorCategory::Network => format!("Connection problem: {}", self),
            ErrorCategory::Data => format!("Data problem: {}", self),
            ErrorCategory::System => format!("System problem: {}", self),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    /// Aborts the whole run even when the row policy says continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AutomationError::FailSafeTriggered
                | AutomationError::UnknownElement { .. }
                | AutomationError::BrowserLaunchError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AutomationError>;
