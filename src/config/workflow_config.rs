use crate::core::locator::{ElementSpec, DEFAULT_CONFIDENCE};
use crate::core::report::ensure_supported_output;
use crate::domain::model::{MouseButton, Point, Region, Rgb};
use crate::utils::error::{AutomationError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub workflow: WorkflowInfo,
    pub session: SessionConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub elements: HashMap<String, ElementConfig>,
    #[serde(default)]
    pub steps: Vec<Step>,
    pub input: Option<InputConfig>,
    pub report: Option<ReportConfig>,
    pub error_handling: Option<ErrorHandlingConfig>,
    pub monitoring: Option<MonitoringConfig>,
    /// Directory relative paths (templates, input, report) are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInfo {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub url: String,
    /// Browser command; the platform opener is used when absent.
    pub browser: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub startup_wait_ms: Option<u64>,
    pub check_reachable: Option<bool>,
    pub reachability_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub login: Vec<Step>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub step_delay_ms: Option<u64>,
    pub locate_timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub confidence: Option<f32>,
    pub failsafe: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementConfig {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub template: Option<String>,
    pub confidence: Option<f32>,
    /// `[x, y, width, height]`
    pub region: Option<[u32; 4]>,
    /// `[dx, dy]` added to the match centre
    pub offset: Option<[i32; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowFailurePolicy {
    #[default]
    Stop,
    Continue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    pub on_row_failure: Option<RowFailurePolicy>,
    pub retry_attempts: Option<u32>,
    pub screenshot_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Click {
        target: String,
        #[serde(default)]
        button: MouseButton,
        #[serde(default = "one")]
        clicks: u32,
    },
    MoveTo {
        target: String,
    },
    TypeText {
        text: String,
        target: Option<String>,
        #[serde(default)]
        clear: bool,
    },
    Press {
        key: String,
        #[serde(default = "one")]
        presses: u32,
    },
    Hotkey {
        keys: Vec<String>,
    },
    Wait {
        ms: u64,
    },
    WaitFor {
        target: String,
        timeout_ms: Option<u64>,
    },
    WaitPixel {
        x: i32,
        y: i32,
        color: String,
        #[serde(default)]
        tolerance: u8,
        timeout_ms: Option<u64>,
    },
    ReadField {
        target: String,
        into: String,
    },
    ReadPixel {
        x: i32,
        y: i32,
        into: String,
    },
    Screenshot {
        path: String,
    },
    Set {
        var: String,
        value: String,
    },
    IfVisible {
        target: String,
        #[serde(default)]
        then: Vec<Step>,
        #[serde(default)]
        otherwise: Vec<Step>,
    },
    Emit,
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::Click { .. } => "click",
            Step::MoveTo { .. } => "move_to",
            Step::TypeText { .. } => "type_text",
            Step::Press { .. } => "press",
            Step::Hotkey { .. } => "hotkey",
            Step::Wait { .. } => "wait",
            Step::WaitFor { .. } => "wait_for",
            Step::WaitPixel { .. } => "wait_pixel",
            Step::ReadField { .. } => "read_field",
            Step::ReadPixel { .. } => "read_pixel",
            Step::Screenshot { .. } => "screenshot",
            Step::Set { .. } => "set",
            Step::IfVisible { .. } => "if_visible",
            Step::Emit => "emit",
        }
    }

    /// Element names this step (and its branches) refers to.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Step::Click { target, .. }
            | Step::MoveTo { target }
            | Step::WaitFor { target, .. }
            | Step::ReadField { target, .. } => vec![target.as_str()],
            Step::TypeText { target, .. } => target.iter().map(String::as_str).collect(),
            Step::IfVisible {
                target,
                then,
                otherwise,
            } => std::iter::once(target.as_str())
                .chain(then.iter().chain(otherwise).flat_map(|s| s.targets()))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn contains_emit(&self) -> bool {
        match self {
            Step::Emit => true,
            Step::IfVisible { then, otherwise, .. } => {
                then.iter().chain(otherwise).any(Step::contains_emit)
            }
            _ => false,
        }
    }

    fn flatten<'a>(&'a self, out: &mut Vec<&'a Step>) {
        out.push(self);
        if let Step::IfVisible { then, otherwise, .. } = self {
            for step in then.iter().chain(otherwise) {
                step.flatten(out);
            }
        }
    }
}

static ENV_VAR_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\$\{([^}]+)\}").expect("env var pattern"));

fn escape_basic_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04X}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

impl WorkflowConfig {
    /// Loads a workflow file; relative paths inside it resolve against its directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.base_dir = path
            .as_ref()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| AutomationError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// `${NAME}` is replaced with the environment variable, escaped for a TOML
    /// basic string; unset names are kept verbatim.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                match std::env::var(var_name) {
                    Ok(value) => escape_basic_string(&value),
                    Err(_) => format!("${{{}}}", var_name),
                }
            })
            .to_string()
    }

    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("workflow.name", &self.workflow.name)?;
        validation::validate_url("session.url", &self.session.url)?;

        for (field, value) in [
            ("session.username", &self.session.username),
            ("session.password", &self.session.password),
        ] {
            if let Some(v) = value {
                if ENV_VAR_RE.is_match(v) {
                    tracing::warn!("⚠️ {} references an unset environment variable: {}", field, v);
                }
            }
        }

        if let Some(confidence) = self.defaults.confidence {
            validation::validate_range("defaults.confidence", confidence, 0.01, 1.0)?;
        }

        for (name, element) in &self.elements {
            self.validate_element(name, element)?;
        }

        let mut all_steps = Vec::new();
        for step in self.session.login.iter().chain(&self.steps) {
            step.flatten(&mut all_steps);
        }
        for (index, step) in all_steps.iter().enumerate() {
            self.validate_step(index, step)?;
        }

        let emits = self.steps.iter().any(Step::contains_emit);
        match &self.report {
            Some(report) => {
                validation::validate_path("report.output", &report.output)?;
                ensure_supported_output(&report.output)?;
                if report.columns.is_empty() {
                    return Err(AutomationError::ConfigValidationError {
                        field: "report.columns".to_string(),
                        message: "At least one column is required".to_string(),
                    });
                }
            }
            None if emits => {
                return Err(AutomationError::MissingConfigError {
                    field: "report".to_string(),
                })
            }
            None => {}
        }

        if self.session.login.iter().any(Step::contains_emit) {
            return Err(AutomationError::ConfigValidationError {
                field: "session.login".to_string(),
                message: "Login steps cannot emit report rows".to_string(),
            });
        }

        if let Some(input) = &self.input {
            validation::validate_path("input.path", &input.path)?;
        }

        Ok(())
    }

    fn validate_element(&self, name: &str, element: &ElementConfig) -> Result<()> {
        let field = format!("elements.{}", name);
        let has_coords = element.x.is_some() || element.y.is_some();
        match (has_coords, &element.template) {
            (true, Some(_)) => Err(AutomationError::ConfigValidationError {
                field,
                message: "Use either x/y coordinates or a template, not both".to_string(),
            }),
            (false, None) => Err(AutomationError::ConfigValidationError {
                field,
                message: "Needs x/y coordinates or a template image".to_string(),
            }),
            (true, None) => {
                validation::validate_required_field(&format!("{}.x", field), &element.x)?;
                validation::validate_required_field(&format!("{}.y", field), &element.y)?;
                Ok(())
            }
            (false, Some(template)) => {
                validation::validate_path(&format!("{}.template", field), template)?;
                if let Some(confidence) = element.confidence {
                    validation::validate_range(&format!("{}.confidence", field), confidence, 0.01, 1.0)?;
                }
                Ok(())
            }
        }
    }

    fn validate_step(&self, index: usize, step: &Step) -> Result<()> {
        for target in step.targets() {
            if !self.elements.contains_key(target) {
                return Err(AutomationError::UnknownElement {
                    name: target.to_string(),
                });
            }
        }

        let field = format!("steps[{}].{}", index, step.action());
        match step {
            Step::WaitPixel { color, .. } if Rgb::parse(color).is_none() => {
                Err(AutomationError::InvalidConfigValueError {
                    field,
                    value: color.clone(),
                    reason: "Colour must be written as #rrggbb".to_string(),
                })
            }
            Step::Hotkey { keys } if keys.is_empty() => Err(AutomationError::ConfigValidationError {
                field,
                message: "Hotkey needs at least one key".to_string(),
            }),
            Step::Click { clicks: 0, .. } | Step::Press { presses: 0, .. } => {
                Err(AutomationError::InvalidConfigValueError {
                    field,
                    value: "0".to_string(),
                    reason: "Repeat count must be at least 1".to_string(),
                })
            }
            Step::ReadField { into, .. } | Step::ReadPixel { into, .. } | Step::Set { var: into, .. } => {
                validation::validate_non_empty_string(&field, into)
            }
            _ => Ok(()),
        }
    }

    pub fn element_specs(&self) -> HashMap<String, ElementSpec> {
        let default_confidence = self.defaults.confidence.unwrap_or(DEFAULT_CONFIDENCE);
        self.elements
            .iter()
            .filter_map(|(name, element)| {
                let spec = match (&element.template, element.x, element.y) {
                    (Some(template), _, _) => ElementSpec::Template {
                        path: self.resolve_path(template),
                        confidence: element.confidence.unwrap_or(default_confidence),
                        region: element.region.map(|[x, y, w, h]| Region::new(x, y, w, h)),
                        offset: element.offset.map(|[dx, dy]| (dx, dy)).unwrap_or((0, 0)),
                    },
                    (None, Some(x), Some(y)) => ElementSpec::Fixed(Point::new(x, y)),
                    _ => return None,
                };
                Some((name.clone(), spec))
            })
            .collect()
    }

    pub fn step_delay_ms(&self) -> u64 {
        self.defaults.step_delay_ms.unwrap_or(500)
    }

    pub fn locate_timeout_ms(&self) -> u64 {
        self.defaults.locate_timeout_ms.unwrap_or(10_000)
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.defaults.poll_interval_ms.unwrap_or(250)
    }

    pub fn failsafe_enabled(&self) -> bool {
        self.defaults.failsafe.unwrap_or(true)
    }

    pub fn row_failure_policy(&self) -> RowFailurePolicy {
        self.error_handling
            .as_ref()
            .and_then(|e| e.on_row_failure)
            .unwrap_or_default()
    }

    pub fn retry_attempts(&self) -> u32 {
        self.error_handling
            .as_ref()
            .and_then(|e| e.retry_attempts)
            .unwrap_or(0)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for WorkflowConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
