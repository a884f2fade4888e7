use async_trait::async_trait;
use magray_core::{Tool, ToolContext, ToolResult};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const INGESTION_KEYWORDS: &[&str] = &[
    "ingest", "add", "load", "upload", "import", "fetch", "download", "get", "retrieve", "index",
    "process", "include", "incorporate", "bring in",
];
const DOCUMENT_KEYWORDS: &[&str] = &["document", "pdf", "file", "paper", "article", "report", "manual", "guide", "book"];
const KB_KEYWORDS: &[&str] = &["knowledge base", "database", "collection", "system", "library", "repository"];
const QUESTION_STARTS: &[&str] = &["can you", "could you", "please"];

#[derive(Debug, Deserialize)]
struct IngestResponse {
    success: bool,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    file_info: Option<FileInfo>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    #[serde(default)]
    chunks: Option<u64>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    extraction_method: Option<String>,
}

/// Ingests a document at a URL into the knowledge base via a webhook.
pub struct UrlIngestionTool {
    base_url: String,
    client: reqwest::Client,
}

impl UrlIngestionTool {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn find_url(query: &str) -> Option<String> {
        let re = Regex::new(r#"https?://[^\s<>"']+"#).expect("static regex");
        re.find(query).map(|m| {
            m.as_str()
                .trim_end_matches(|c: char| ".,;:!?)".contains(c))
                .to_string()
        })
    }

    fn extract_filename(query: &str, url: &str) -> Option<String> {
        let patterns = [
            r#"(?i)(?:as|name(?:\s+it)?|call(?:\s+it)?)\s+["']?([a-zA-Z0-9_-]+\.pdf)["']?"#,
            r#"(?i)filename[:\s]+["']?([a-zA-Z0-9_-]+\.pdf)["']?"#,
        ];
        for pattern in patterns {
            let re = Regex::new(pattern).expect("static regex");
            if let Some(caps) = re.captures(query) {
                return Some(caps[1].to_string());
            }
        }
        url.rsplit('/')
            .next()
            .filter(|segment| segment.to_lowercase().ends_with(".pdf"))
            .map(|s| s.to_string())
    }
}

#[async_trait]
impl Tool for UrlIngestionTool {
    fn name(&self) -> &str {
        "url_ingestion"
    }

    fn description(&self) -> &str {
        "Ingest PDF documents from URLs into the knowledge base when user provides a URL and asks to add/ingest/load it"
    }

    fn can_handle(&self, query: &str, _context: &ToolContext) -> f64 {
        let Some(_url) = Self::find_url(query) else {
            return 0.0;
        };
        let q = query.to_lowercase();

        if INGESTION_KEYWORDS.iter().any(|k| q.contains(k)) && KB_KEYWORDS.iter().any(|k| q.contains(k)) {
            return 0.95;
        }
        if INGESTION_KEYWORDS.iter().any(|k| q.contains(k)) {
            return 0.85;
        }
        if DOCUMENT_KEYWORDS.iter().any(|k| q.contains(k)) {
            return 0.85;
        }
        if KB_KEYWORDS.iter().any(|k| q.contains(k)) {
            return 0.8;
        }
        if query.contains('?') || QUESTION_STARTS.iter().any(|s| q.starts_with(s)) {
            return 0.6;
        }
        0.3
    }

    async fn execute(&self, query: &str, _context: &ToolContext) -> ToolResult {
        let Some(url) = Self::find_url(query) else {
            return ToolResult::failure(self.name(), "no URL found in query");
        };
        let filename = Self::extract_filename(query, &url);

        let body = json!({ "url": url, "filename": filename });
        let response = match self
            .client
            .post(format!("{}/webhook/ingest-url", self.base_url))
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return ToolResult::failure(self.name(), format!("ingestion request failed: {e}")),
        };

        if !response.status().is_success() {
            return ToolResult::failure(
                self.name(),
                format!("ingestion request returned status {}", response.status()),
            );
        }

        let parsed: IngestResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(self.name(), format!("could not parse ingestion response: {e}")),
        };

        if !parsed.success {
            let error = parsed.error.unwrap_or_else(|| "ingestion failed".to_string());
            return ToolResult::failure(self.name(), error);
        }

        let resolved_filename = parsed.filename.or(filename).unwrap_or_else(|| "document.pdf".to_string());
        let info = parsed.file_info.unwrap_or(FileInfo { chunks: None, size: None, extraction_method: None });
        let size_kb = info.size.map(|b| b as f64 / 1024.0).unwrap_or(0.0);
        let chunks = info.chunks.unwrap_or(0);
        let extraction_method = info.extraction_method.unwrap_or_else(|| "unknown".to_string());

        let answer = format!(
            "Document successfully ingested.\n\nFile: {resolved_filename}\nSource: {url}\nSize: {size_kb:.1} KB\nChunks: {chunks} chunks created\nExtraction: {extraction_method}\n\nThe document has been processed and added to the knowledge base. You can now ask questions about its contents!"
        );

        ToolResult::success(json!({ "answer": answer, "filename": resolved_filename }))
            .with_metadata("tool", self.name())
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(60)
    }
}
