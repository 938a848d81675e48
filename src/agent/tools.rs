use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::providers::{read_json, send};
use crate::retrieval::{Embedder, VectorIndex};

const PASSAGE_SEPARATOR: &str = "\n---\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
}

impl ToolOutput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ToolExecutionError {
    message: String,
}

impl ToolExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type ToolExecutionResult = std::result::Result<ToolOutput, ToolExecutionError>;
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = ToolExecutionResult> + 'a>>;

/// A single external capability used as a chain step.
pub trait ToolAdapter {
    fn execute<'a>(&'a self, input: &'a str) -> ToolFuture<'a>;
}

/// Top-K passages for a query, read from a persisted index.
pub struct RetrievalTool<E> {
    embedder: E,
    index_path: PathBuf,
    top_k: usize,
}

impl<E> RetrievalTool<E> {
    pub fn new(embedder: E, index_path: PathBuf, top_k: usize) -> Self {
        Self {
            embedder,
            index_path,
            top_k,
        }
    }
}

impl<E> ToolAdapter for RetrievalTool<E>
where
    E: Embedder,
{
    fn execute<'a>(&'a self, input: &'a str) -> ToolFuture<'a> {
        Box::pin(async move {
            debug!(
                index_path = %self.index_path.display(),
                top_k = self.top_k,
                query_len = input.len(),
                "looking up documents"
            );
            let index = VectorIndex::load(&self.index_path)
                .map_err(|err| ToolExecutionError::new(err.to_string()))?;
            let query = self
                .embedder
                .embed(input)
                .await
                .map_err(|err| ToolExecutionError::new(format!("embedding failed: {err:#}")))?;
            let passages = index
                .nearest(&query, self.top_k)
                .map_err(|err| ToolExecutionError::new(err.to_string()))?;
            debug!(passage_count = passages.len(), "retrieved documents");
            Ok(ToolOutput::new(passages.join(PASSAGE_SEPARATOR)))
        })
    }
}

#[derive(Debug, Serialize)]
struct CodeAnalysisRequest<'a> {
    input: &'a str,
}

/// Delegates to an external code-reasoning endpoint.
pub struct CodeAnalysisTool<'a> {
    client: &'a Client,
    url: &'a str,
    auth_header: &'a str,
    timeout_secs: u64,
}

impl<'a> CodeAnalysisTool<'a> {
    pub fn new(client: &'a Client, url: &'a str, auth_header: &'a str, timeout_secs: u64) -> Self {
        Self {
            client,
            url,
            auth_header,
            timeout_secs,
        }
    }
}

fn render_analysis(body: &Value) -> Result<String, ToolExecutionError> {
    if let Some(analysis) = body.get("analysis").and_then(Value::as_str) {
        return Ok(analysis.to_string());
    }
    serde_json::to_string_pretty(body)
        .map_err(|err| ToolExecutionError::new(format!("failed to render analysis: {err}")))
}

impl ToolAdapter for CodeAnalysisTool<'_> {
    fn execute<'b>(&'b self, input: &'b str) -> ToolFuture<'b> {
        Box::pin(async move {
            let url = self.url.trim();
            if url.is_empty() {
                warn!("code analysis requested without CODE_ANALYSIS_URL");
                return Err(ToolExecutionError::new("CODE_ANALYSIS_URL is not set"));
            }
            debug!(api_url = %url, input_len = input.len(), "sending code analysis request");

            let mut builder = self
                .client
                .post(url)
                .json(&CodeAnalysisRequest { input });
            let auth_header = self.auth_header.trim();
            if !auth_header.is_empty() {
                builder = builder.header(AUTHORIZATION, auth_header);
            }

            let response = send(builder, url, self.timeout_secs)
                .await
                .map_err(|err| ToolExecutionError::new(format!("{err:#}")))?;
            let parsed = read_json(response)
                .await
                .map_err(|err| ToolExecutionError::new(format!("{err:#}")))?;
            render_analysis(&parsed).map(ToolOutput::new)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::anyhow;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{CodeAnalysisTool, RetrievalTool, ToolAdapter, render_analysis};
    use crate::retrieval::{Embedder, EmbeddingFuture};

    struct FixedEmbedder(Result<Vec<f32>, String>);

    impl Embedder for FixedEmbedder {
        fn embed<'a>(&'a self, _text: &'a str) -> EmbeddingFuture<'a> {
            let result = self.0.clone().map_err(|message| anyhow!(message));
            Box::pin(async move { result })
        }
    }

    fn index_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "{}",
            json!({
                "documents": ["torque spec", "wiring diagram", "lube schedule"],
                "vectors": [[0.0, 1.0], [1.0, 0.0], [0.1, 0.9]]
            })
        )
        .expect("write index");
        file
    }

    #[tokio::test]
    async fn retrieval_joins_top_k_passages() {
        let file = index_file();
        let tool = RetrievalTool::new(
            FixedEmbedder(Ok(vec![0.0, 1.0])),
            file.path().to_path_buf(),
            2,
        );

        let output = tool.execute("how tight?").await.expect("retrieval works");
        assert_eq!(output.content, "torque spec\n---\nlube schedule");
    }

    #[tokio::test]
    async fn retrieval_reports_missing_index() {
        let dir = tempfile::tempdir().expect("temp dir");
        let tool = RetrievalTool::new(
            FixedEmbedder(Ok(vec![0.0, 1.0])),
            dir.path().join("missing.json"),
            5,
        );

        let err = tool.execute("q").await.expect_err("missing index");
        assert!(err.to_string().contains("failed to read index"));
    }

    #[tokio::test]
    async fn retrieval_reports_embedding_failure() {
        let file = index_file();
        let tool = RetrievalTool::new(
            FixedEmbedder(Err("quota exceeded".to_string())),
            file.path().to_path_buf(),
            5,
        );

        let err = tool.execute("q").await.expect_err("embedding fails");
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn render_analysis_prefers_analysis_field() {
        assert_eq!(
            render_analysis(&json!({"analysis": "off-by-one"})).expect("renders"),
            "off-by-one"
        );
        assert!(
            render_analysis(&json!({"findings": []}))
                .expect("renders")
                .contains("findings")
        );
    }

    #[tokio::test]
    async fn code_analysis_requires_url() {
        let client = reqwest::Client::new();
        let tool = CodeAnalysisTool::new(&client, "  ", "", 5);
        let err = tool.execute("fn main() {}").await.expect_err("no url");
        assert!(err.to_string().contains("CODE_ANALYSIS_URL"));
    }

    #[tokio::test]
    async fn code_analysis_posts_input_and_reads_analysis() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .and(header("authorization", "Bearer code"))
            .and(body_json(json!({"input": "x = 1/0"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"analysis": "division by zero"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/analyze", server.uri());
        let tool = CodeAnalysisTool::new(&client, &url, "Bearer code", 5);
        let output = tool.execute("x = 1/0").await.expect("analysis works");
        assert_eq!(output.content, "division by zero");
    }
}
