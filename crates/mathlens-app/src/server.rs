// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// MCP tool server. Every tool runs on the blocking pool under the configured
// timeout. Results come back as pretty-printed JSON text content; failures
// come back as error results carrying the error's code and class.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use mathlens_core::config::AppConfig;
use mathlens_core::error::{MathlensError, Result as MathlensResult};
use mathlens_core::types::PageSegment;
use rmcp::{
    ServerHandler, ServiceExt, handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters, model::*, tool, tool_handler, tool_router,
};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::tools::{
    self, BoundaryArgs, ClassifyArgs, DetectArgs, ExtractArgs, MathOcrArgs, ReconstructArgs,
    WrittenSegment,
};

/// Mathlens MCP server.
#[derive(Clone)]
pub struct MathlensServer {
    config: Arc<AppConfig>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MathlensServer {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Rewrite raw OCR text into LaTeX with the reconstruction rules. Returns the rewritten text and the rules that fired."
    )]
    async fn reconstruct_latex(
        &self,
        Parameters(args): Parameters<ReconstructArgs>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        self.run("reconstruct_latex", move |_| {
            tools::reconstruct_latex(args).map(json_content)
        })
        .await
    }

    #[tool(
        description = "Classify page-space OCR fragments into baseline, subscript, superscript, symbol and transpose roles, group them into lines and reconstruct LaTeX per line."
    )]
    async fn classify_fragments(
        &self,
        Parameters(args): Parameters<ClassifyArgs>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        self.run("classify_fragments", move |config| {
            tools::classify_fragments(args, config).map(json_content)
        })
        .await
    }

    #[tool(
        description = "Find regions of a page whose extracted text is a column of single characters (a formula the text layer broke apart). Returns padded page-space rectangles."
    )]
    async fn detect_garbled_regions(
        &self,
        Parameters(args): Parameters<DetectArgs>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        self.run("detect_garbled_regions", move |config| {
            tools::detect_garbled_regions(args, config).map(json_content)
        })
        .await
    }

    #[tool(
        description = "Extract page text and replace garbled formula regions with cropped PNG images. Returns each page's text followed by its formula images; crops are also written to the output directory."
    )]
    async fn extract_text_with_formulas(
        &self,
        Parameters(args): Parameters<ExtractArgs>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        self.run("extract_text_with_formulas", move |config| {
            tools::extract_text_with_formulas(args, config).map(segment_content)
        })
        .await
    }

    #[tool(
        description = "Tight bounding box of the non-background pixels of an image, in pixels."
    )]
    async fn content_boundary(
        &self,
        Parameters(args): Parameters<BoundaryArgs>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        self.run("content_boundary", move |config| {
            tools::content_boundary(args, config).map(json_content)
        })
        .await
    }

    #[tool(description = "List the active reconstruction rules and where they were loaded from.")]
    async fn list_patterns(&self) -> std::result::Result<CallToolResult, ErrorData> {
        self.run("list_patterns", |_| tools::list_patterns().map(json_content))
            .await
    }

    #[tool(
        description = "OCR a rendered page image and reconstruct its mathematics as LaTeX. Requires a build with OCR support."
    )]
    async fn math_ocr(
        &self,
        Parameters(args): Parameters<MathOcrArgs>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        self.run("math_ocr", move |config| {
            tools::math_ocr(args, config).map(json_content)
        })
        .await
    }
}

impl MathlensServer {
    /// Run `work` on the blocking pool under the tool timeout.
    ///
    /// A timed-out call is answered at once; its blocking task runs on to
    /// completion since it cannot be interrupted.
    async fn run<F>(
        &self,
        tool: &'static str,
        work: F,
    ) -> std::result::Result<CallToolResult, ErrorData>
    where
        F: FnOnce(&AppConfig) -> MathlensResult<Vec<Content>> + Send + 'static,
    {
        let config = Arc::clone(&self.config);
        let timeout_secs = config.tool_timeout_secs;
        let task = tokio::task::spawn_blocking(move || work(&config));

        let outcome = match tokio::time::timeout(Duration::from_secs(timeout_secs), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(MathlensError::Io(std::io::Error::other(format!(
                "tool task failed: {}",
                join_err
            )))),
            Err(_) => Err(MathlensError::Timeout(timeout_secs)),
        };

        match outcome {
            Ok(content) => {
                info!(tool, items = content.len(), "Tool call succeeded");
                Ok(CallToolResult::success(content))
            }
            Err(err) => {
                warn!(
                    tool,
                    code = err.code(),
                    retriable = err.is_retriable(),
                    %err,
                    "Tool call failed"
                );
                Ok(CallToolResult::error(vec![Content::text(pretty(
                    &error_body(&err),
                ))]))
            }
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn json_content(value: Value) -> Vec<Content> {
    vec![Content::text(pretty(&value))]
}

/// `{"error": {code, message, class, retriable}}` for a failed call.
fn error_body(err: &MathlensError) -> Value {
    json!({
        "error": {
            "code": err.code(),
            "message": err.to_string(),
            "class": err.class(),
            "retriable": err.is_retriable(),
        }
    })
}

/// Page text as text content; each formula crop as a JSON description
/// followed by the PNG itself.
fn segment_content(segments: Vec<WrittenSegment>) -> Vec<Content> {
    let mut content = Vec::with_capacity(segments.len());
    for WrittenSegment { segment, file } in segments {
        match segment {
            PageSegment::Text { text, .. } => content.push(Content::text(text)),
            PageSegment::Image(image) => {
                content.push(Content::text(pretty(&json!({
                    "page": image.page,
                    "region_index": image.region_index,
                    "reason": image.reason,
                    "width": image.width,
                    "height": image.height,
                    "bounds": image.bounds,
                    "region_bounds": image.region_bounds,
                    "file": file,
                }))));
                content.push(Content::image(BASE64.encode(&image.png), "image/png"));
            }
        }
    }
    content
}

#[tool_handler]
impl ServerHandler for MathlensServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Mathlens finds formulas a PDF text layer garbled, crops them as images, \
                 and reconstructs LaTeX from OCR fragments."
                    .into(),
            ),
        }
    }
}

/// Serve MCP over stdin/stdout until the client disconnects.
pub async fn run_stdio(config: AppConfig) -> MathlensResult<()> {
    let service = MathlensServer::new(config)
        .serve(rmcp::transport::io::stdio())
        .await
        .map_err(|err| {
            MathlensError::Io(std::io::Error::other(format!("MCP handshake failed: {}", err)))
        })?;
    info!("Mathlens MCP server ready");
    let reason = service.waiting().await.map_err(|err| {
        MathlensError::Io(std::io::Error::other(format!("MCP service failed: {}", err)))
    })?;
    info!(?reason, "Client disconnected");
    Ok(())
}
