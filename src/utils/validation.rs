use crate::utils::error::{AutomationError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(AutomationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(AutomationError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(AutomationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(AutomationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(AutomationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_directory(field_name: &str, path: &str) -> Result<()> {
    validate_path(field_name, path)?;
    if !std::path::Path::new(path).is_dir() {
        return Err(AutomationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Directory does not exist".to_string(),
        });
    }
    Ok(())
}

pub fn validate_file_extension(field_name: &str, file: &str, allowed_extensions: &[&str]) -> Result<()> {
    let allowed: HashSet<&str> = allowed_extensions.iter().copied().collect();

    let extension = std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension {
        Some(ext) if allowed.contains(ext.as_str()) => Ok(()),
        Some(ext) => Err(AutomationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                ext,
                allowed_extensions.join(", ")
            ),
        }),
        None => Err(AutomationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        }),
    }
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| AutomationError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AutomationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(AutomationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("session.url", "https://sigajus.example.jus.br").is_ok());
        assert!(validate_url("session.url", "http://localhost:8080/login").is_ok());
        assert!(validate_url("session.url", "").is_err());
        assert!(validate_url("session.url", "sigajus").is_err());
        assert!(validate_url("session.url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_file_extension_is_case_insensitive() {
        assert!(validate_file_extension("output", "relatorio.CSV", &["csv", "xlsx"]).is_ok());
        assert!(validate_file_extension("output", "relatorio.xlsx", &["csv", "xlsx"]).is_ok());
        assert!(validate_file_extension("output", "relatorio.xls", &["csv", "xlsx"]).is_err());
        assert!(validate_file_extension("output", "relatorio", &["csv", "xlsx"]).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("confidence", 0.9, 0.0, 1.0).is_ok());
        assert!(validate_range("confidence", 1.5, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_validate_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(validate_directory("input", dir.path().to_str().unwrap()).is_ok());
        assert!(validate_directory("input", "/definitely/not/here").is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let present = Some(3);
        let missing: Option<i32> = None;
        assert_eq!(*validate_required_field("x", &present).unwrap(), 3);
        assert!(validate_required_field("x", &missing).is_err());
    }
}
