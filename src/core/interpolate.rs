use crate::utils::error::{AutomationError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

pub type Variables = HashMap<String, String>;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern")
});

/// Replaces `{name}` with the variable's value. `{{` and `}}` produce literal braces.
pub fn interpolate(text: &str, vars: &Variables) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in PLACEHOLDER_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        match caps.get(1) {
            Some(name) => {
                let value = vars.get(name.as_str()).ok_or_else(|| AutomationError::UnknownVariable {
                    name: name.as_str().to_string(),
                })?;
                out.push_str(value);
            }
            None => out.push_str(&whole.as_str()[..1]),
        }
        last = whole.end();
    }

    out.push_str(&text[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> Variables {
        let mut vars = Variables::new();
        vars.insert("processo".to_string(), "213/2016".to_string());
        vars.insert("username".to_string(), "servidor".to_string());
        vars
    }

    #[test]
    fn test_interpolate_values() {
        assert_eq!(
            interpolate("Processo {processo} por {username}", &vars()).unwrap(),
            "Processo 213/2016 por servidor"
        );
        assert_eq!(interpolate("sem variáveis", &vars()).unwrap(), "sem variáveis");
    }

    #[test]
    fn test_interpolate_escapes() {
        assert_eq!(interpolate("{{processo}}", &vars()).unwrap(), "{processo}");
        assert_eq!(interpolate("a {b c}", &vars()).unwrap(), "a {b c}");
    }

    #[test]
    fn test_unknown_variable() {
        let err = interpolate("{matricula}", &vars()).unwrap_err();
        assert!(matches!(err, AutomationError::UnknownVariable { ref name } if name == "matricula"));
    }
}
