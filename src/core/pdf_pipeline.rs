use crate::core::fields::{extract_fields, to_br_date};
use crate::core::report::{Report, ReportFormat};
use crate::domain::model::{Record, TransformResult};
use crate::domain::ports::{Pipeline, Storage, TextExtractor};
use crate::utils::error::Result;

pub const FIELD_COLUMNS: [&str; 4] = ["processo", "data_autuacao", "requerente", "matricula"];

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfReportOptions {
    /// Leading `arquivo` column with the source file name.
    pub with_source_file: bool,
    /// Rewrite `data_autuacao` as `dd/mm/yyyy`.
    pub normalize_dates: bool,
}

/// Reads every PDF of the input storage and writes one report row per document.
pub struct PdfReportPipeline<S: Storage, X: TextExtractor> {
    input: S,
    output: S,
    output_file: String,
    extractor: X,
    options: PdfReportOptions,
}

impl<S: Storage, X: TextExtractor> PdfReportPipeline<S, X> {
    pub fn new(input: S, output: S, output_file: String, extractor: X) -> Self {
        Self {
            input,
            output,
            output_file,
            extractor,
            options: PdfReportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PdfReportOptions) -> Self {
        self.options = options;
        self
    }

    fn columns(&self, any_failed: bool) -> Vec<String> {
        let mut columns = Vec::with_capacity(FIELD_COLUMNS.len() + 2);
        if self.options.with_source_file {
            columns.push("arquivo".to_string());
        }
        columns.extend(FIELD_COLUMNS.iter().map(|c| c.to_string()));
        if any_failed {
            columns.push("error".to_string());
        }
        columns
    }
}

#[async_trait::async_trait]
impl<S: Storage, X: TextExtractor> Pipeline for PdfReportPipeline<S, X> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let files = self.input.list_files("pdf").await?;
        tracing::debug!("Found {} PDF file(s)", files.len());

        let mut records = Vec::with_capacity(files.len());
        for name in files {
            let text = match self.input.read_file(&name).await {
                Ok(bytes) => self.extractor.extract_text(&name, &bytes),
                Err(e) => Err(e),
            };

            let record = Record::new().with("arquivo", name.as_str());
            let record = match text {
                Ok(text) => record.with("text", text),
                Err(e) => {
                    tracing::error!("❌ Could not read {}: {}", name, e);
                    record.with("error", e.to_string())
                }
            };
            records.push(record);
        }

        Ok(records)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let any_failed = data.iter().any(|r| r.data.contains_key("error"));
        let mut processed_records = Vec::with_capacity(data.len());

        for record in data {
            let name = record.cell("arquivo");
            let mut row = Record::new();
            if self.options.with_source_file {
                row.data.insert("arquivo".to_string(), name.clone().into());
            }

            if let Some(error) = record.get_str("error") {
                for column in FIELD_COLUMNS {
                    row.insert_opt(column, None);
                }
                row.data.insert("error".to_string(), error.into());
                processed_records.push(row);
                continue;
            }

            let text = record.cell("text");
            if text.trim().is_empty() {
                tracing::warn!("⚠️ {} has no extractable text; it may be a scan that needs OCR", name);
            }

            let mut fields = extract_fields(&text);
            if self.options.normalize_dates {
                fields.data_autuacao = fields.data_autuacao.as_deref().map(to_br_date);
            }
            tracing::debug!(file = name.as_str(), ?fields, "Extracted fields");

            row.insert_opt("processo", fields.processo);
            row.insert_opt("data_autuacao", fields.data_autuacao);
            row.insert_opt("requerente", fields.requerente);
            row.insert_opt("matricula", fields.matricula);
            if any_failed {
                row.insert_opt("error", None);
            }
            processed_records.push(row);
        }

        Ok(TransformResult {
            processed_records,
            columns: self.columns(any_failed),
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let row_count = result.processed_records.len();
        let mut report = Report::new(result.columns);
        result
            .processed_records
            .into_iter()
            .for_each(|r| report.push(r));

        let format = ReportFormat::from_path(&self.output_file);
        let bytes = report.to_bytes(format)?;
        tracing::debug!("Writing {:?} report ({} bytes)", format, bytes.len());
        self.output.write_file(&self.output_file, &bytes).await?;

        let path = self.output.full_path(&self.output_file);
        tracing::info!("📄 Report with {} row(s) saved to {}", row_count, path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::AutomationError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn put(&self, path: &str, data: &str) {
            self.files
                .lock()
                .await
                .insert(path.to_string(), data.as_bytes().to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                AutomationError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn list_files(&self, extension: &str) -> Result<Vec<String>> {
            let files = self.files.lock().await;
            let suffix = format!(".{}", extension.to_lowercase());
            let mut names: Vec<String> = files
                .keys()
                .filter(|k| k.to_lowercase().ends_with(&suffix))
                .cloned()
                .collect();
            names.sort();
            Ok(names)
        }

        fn full_path(&self, path: &str) -> String {
            format!("mock://{}", path)
        }
    }

    /// Treats the "PDF" bytes as the document text; `corrompido` fails.
    struct PlainTextExtractor;

    impl TextExtractor for PlainTextExtractor {
        fn extract_text(&self, name: &str, bytes: &[u8]) -> Result<String> {
            if name.contains("corrompido") {
                return Err(AutomationError::PdfError {
                    file: name.to_string(),
                    message: "invalid xref table".to_string(),
                });
            }
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    const PETITION: &str = "Processo Nº 213/2016\nRequerente: MARIA DAS GRAÇAS SILVA\n\
        Matrícula: 197.942-6\nNatal, 08 de janeiro de 2016.";

    async fn pipeline(options: PdfReportOptions) -> (PdfReportPipeline<MockStorage, PlainTextExtractor>, MockStorage) {
        let input = MockStorage::default();
        input.put("b_peticao.PDF", PETITION).await;
        input.put("a_digitalizado.pdf", "   \n").await;
        input.put("notas.txt", "ignored").await;
        let output = MockStorage::default();
        let pipeline = PdfReportPipeline::new(
            input,
            output.clone(),
            "relatorio.csv".to_string(),
            PlainTextExtractor,
        )
        .with_options(options);
        (pipeline, output)
    }

    #[tokio::test]
    async fn test_extract_lists_pdfs_in_order() {
        let (pipeline, _) = pipeline(PdfReportOptions::default()).await;
        let records = pipeline.extract().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get_str("arquivo"), Some("a_digitalizado.pdf"));
        assert_eq!(records[1].get_str("arquivo"), Some("b_peticao.PDF"));
        assert!(records[1].get_str("text").unwrap().contains("Requerente"));
    }

    #[tokio::test]
    async fn test_transform_fields_and_columns() {
        let (pipeline, _) = pipeline(PdfReportOptions {
            with_source_file: true,
            normalize_dates: true,
        })
        .await;
        let records = pipeline.extract().await.unwrap();
        let result = pipeline.transform(records).await.unwrap();

        assert_eq!(
            result.columns,
            vec!["arquivo", "processo", "data_autuacao", "requerente", "matricula"]
        );
        let blank = &result.processed_records[0];
        assert_eq!(blank.cell("processo"), "");
        let petition = &result.processed_records[1];
        assert_eq!(petition.get_str("processo"), Some("213/2016"));
        assert_eq!(petition.get_str("data_autuacao"), Some("08/01/2016"));
        assert_eq!(petition.get_str("requerente"), Some("MARIA DAS GRAÇAS SILVA"));
        assert_eq!(petition.get_str("matricula"), Some("197.942-6"));
    }

    #[tokio::test]
    async fn test_failed_document_adds_error_column() {
        let (pipeline, _) = pipeline(PdfReportOptions::default()).await;
        pipeline.input.put("c_corrompido.pdf", "%PDF-garbage").await;

        let records = pipeline.extract().await.unwrap();
        let result = pipeline.transform(records).await.unwrap();

        assert_eq!(result.columns.last().map(String::as_str), Some("error"));
        assert_eq!(result.processed_records.len(), 3);
        assert!(result.processed_records[2].cell("error").contains("invalid xref"));
        assert_eq!(result.processed_records[1].cell("error"), "");
    }

    #[tokio::test]
    async fn test_load_writes_csv_with_bom() {
        let (pipeline, output) = pipeline(PdfReportOptions::default()).await;
        let records = pipeline.extract().await.unwrap();
        let result = pipeline.transform(records).await.unwrap();

        let path = pipeline.load(result).await.unwrap();
        assert_eq!(path, "mock://relatorio.csv");

        let bytes = output.get_file("relatorio.csv").await.unwrap();
        assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("processo,data_autuacao,requerente,matricula"));
        assert_eq!(lines.nth(1), Some("213/2016,08 de janeiro de 2016,MARIA DAS GRAÇAS SILVA,197.942-6"));
    }
}
