//! Pulls the essential case fields out of a document's plain text.
//!
//! The documents are petitions and dispatches exported from the court system,
//! so the extractors favour the labels those templates use ("Requerente:",
//! "Matrícula", "Processo Nº") and fall back to looser heuristics.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_LABEL_WINDOW: usize = 300;

static MATRICULA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Matr[ií]cula[:\s]*([\d./-]+)").expect("matricula pattern")
});

static PROCESSO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Processo(?:\s*N[ºo]|\s*N\.º|:)?\s*([0-9/.\-]{4,25})").expect("processo pattern")
});

static NUMERIC_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3,8}(?:/\d{2,4})?\b").expect("token pattern"));

static LONG_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+de\s+([a-zçõéêáíúâó]+)\s+de\s+(\d{4})\b").expect("long date pattern")
});

static SHORT_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2}/\d{2}/\d{4}\b").expect("short date pattern"));

const LINE_BREAKS: &[char] = &['\n', '\r', '\x0b', '\x0c', '\u{85}', '\u{2028}', '\u{2029}'];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    pub processo: Option<String>,
    pub data_autuacao: Option<String>,
    pub requerente: Option<String>,
    pub matricula: Option<String>,
}

pub fn extract_fields(text: &str) -> FieldSet {
    FieldSet {
        processo: extract_numero_processo(text),
        data_autuacao: extract_last_date(text),
        requerente: find_label_value(text, "Requerente", DEFAULT_LABEL_WINDOW),
        matricula: extract_matricula(text),
    }
}

/// Value written after `label:`, on the same line or on the next non-empty one
/// within `max_chars` characters. The label match is case-insensitive.
pub fn find_label_value(text: &str, label: &str, max_chars: usize) -> Option<String> {
    let pattern = format!("(?i){}:", regex::escape(label));
    let re = Regex::new(&pattern).ok()?;
    let found = re.find(text)?;

    let snippet: String = text[found.end()..].chars().take(max_chars).collect();
    snippet
        .split(LINE_BREAKS)
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Registration numbers such as `197.942-6` or `197999-9`.
pub fn extract_matricula(text: &str) -> Option<String> {
    MATRICULA_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// "Processo Nº 213/2016" / "Processo: 2132016"; otherwise the first numeric
/// token with a slash, otherwise the longest numeric token.
pub fn extract_numero_processo(text: &str) -> Option<String> {
    if let Some(m) = PROCESSO_RE.captures(text).and_then(|caps| caps.get(1)) {
        return Some(m.as_str().trim().to_string());
    }

    let tokens: Vec<&str> = NUMERIC_TOKEN_RE.find_iter(text).map(|m| m.as_str()).collect();
    if let Some(with_slash) = tokens.iter().find(|t| t.contains('/')) {
        return Some(with_slash.to_string());
    }

    // first of the longest, in document order
    tokens
        .into_iter()
        .fold(None::<&str>, |best, t| match best {
            Some(b) if b.len() >= t.len() => Some(b),
            _ => Some(t),
        })
        .map(str::to_string)
}

/// The date that starts last in the document, either written out
/// ("08 de janeiro de 2016") or numeric ("08/01/2016"). Filing stamps sit at the
/// end of these documents, so the last date is taken as the filing date.
pub fn extract_last_date(text: &str) -> Option<String> {
    LONG_DATE_RE
        .find_iter(text)
        .chain(SHORT_DATE_RE.find_iter(text))
        .max_by_key(|m| m.start())
        .map(|m| m.as_str().trim().to_string())
}

fn month_number(name: &str) -> Option<u32> {
    let folded: String = name
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect();

    let month = match folded.as_str() {
        "janeiro" => 1,
        "fevereiro" => 2,
        "marco" => 3,
        "abril" => 4,
        "maio" => 5,
        "junho" => 6,
        "julho" => 7,
        "agosto" => 8,
        "setembro" => 9,
        "outubro" => 10,
        "novembro" => 11,
        "dezembro" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parses either date shape produced by [`extract_last_date`].
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%d/%m/%Y") {
        return Some(date);
    }

    let caps = LONG_DATE_RE.captures(raw)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `dd/mm/yyyy`, the format SIGAJUS date fields accept; unparseable input is
/// returned unchanged.
pub fn to_br_date(raw: &str) -> String {
    normalize_date(raw)
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETITION: &str = "TRIBUNAL DE JUSTIÇA DO ESTADO\n\
        Processo Nº 213/2016\n\
        Requerente: MARIA DAS GRAÇAS SILVA\n\
        Matrícula: 197.942-6\n\
        Natal, 08 de janeiro de 2016.\n\
        Recebido em 12/01/2016\n";

    #[test]
    fn test_extract_fields_from_petition() {
        let fields = extract_fields(PETITION);
        assert_eq!(fields.processo.as_deref(), Some("213/2016"));
        assert_eq!(fields.requerente.as_deref(), Some("MARIA DAS GRAÇAS SILVA"));
        assert_eq!(fields.matricula.as_deref(), Some("197.942-6"));
        assert_eq!(fields.data_autuacao.as_deref(), Some("12/01/2016"));
    }

    #[test]
    fn test_label_value_on_next_line() {
        let text = "REQUERENTE:\n\n   José Pereira  \nOutro: x";
        assert_eq!(
            find_label_value(text, "Requerente", DEFAULT_LABEL_WINDOW).as_deref(),
            Some("José Pereira")
        );
    }

    #[test]
    fn test_label_value_missing_or_blank() {
        assert_eq!(find_label_value("Sem rótulo aqui", "Requerente", 300), None);
        assert_eq!(find_label_value("Requerente:   \n  \n", "Requerente", 300), None);
    }

    #[test]
    fn test_label_value_respects_window() {
        let text = format!("Requerente:{}Fulano", " ".repeat(50));
        assert_eq!(find_label_value(&text, "Requerente", 20), None);
        assert_eq!(find_label_value(&text, "Requerente", 100).as_deref(), Some("Fulano"));
    }

    #[test]
    fn test_matricula_variants() {
        assert_eq!(extract_matricula("matricula 197999-9").as_deref(), Some("197999-9"));
        assert_eq!(extract_matricula("MATRÍCULA:123.456").as_deref(), Some("123.456"));
        assert_eq!(extract_matricula("sem matrícula informada"), None);
    }

    #[test]
    fn test_processo_label_forms() {
        assert_eq!(extract_numero_processo("Processo: 2132016").as_deref(), Some("2132016"));
        assert_eq!(extract_numero_processo("PROCESSO No 0801-2020").as_deref(), Some("0801-2020"));
    }

    #[test]
    fn test_processo_token_fallback_prefers_slash() {
        let text = "Ofício 123456 referente ao protocolo 450/2019 e 7777777";
        assert_eq!(extract_numero_processo(text).as_deref(), Some("450/2019"));
    }

    #[test]
    fn test_processo_token_fallback_longest_first() {
        let text = "Códigos 1234 98765 12345 e 54321";
        assert_eq!(extract_numero_processo(text).as_deref(), Some("98765"));
        assert_eq!(extract_numero_processo("nada numérico"), None);
    }

    #[test]
    fn test_last_date_prefers_latest_position() {
        let text = "Em 01/02/2015 foi protocolado. Natal, 3 de Março de 2016.";
        assert_eq!(extract_last_date(text).as_deref(), Some("3 de Março de 2016"));
        assert_eq!(extract_last_date("sem datas"), None);
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(
            normalize_date("08 de janeiro de 2016"),
            NaiveDate::from_ymd_opt(2016, 1, 8)
        );
        assert_eq!(normalize_date("3 de março de 2016"), NaiveDate::from_ymd_opt(2016, 3, 3));
        assert_eq!(normalize_date("12/01/2016"), NaiveDate::from_ymd_opt(2016, 1, 12));
        assert_eq!(normalize_date("31 de fevereiro de 2016"), None);
        assert_eq!(to_br_date("08 de janeiro de 2016"), "08/01/2016");
        assert_eq!(to_br_date("ontem"), "ontem");
    }
}
