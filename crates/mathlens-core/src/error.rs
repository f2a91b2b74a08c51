// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Mathlens.

use thiserror::Error;

/// Top-level error type for all Mathlens operations.
///
/// Absence of structure (no text, no fragments, no rules fired) is never an
/// error. Only collaborator failures and bad requests end up here.
#[derive(Debug, Error)]
pub enum MathlensError {
    // -- Collaborator errors --
    #[error("rasterization failed: {0}")]
    Rasterize(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("text layout unavailable: {0}")]
    TextLayout(String),

    #[error("page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    // -- Processing errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Tool protocol --
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unsupported tool: {0}")]
    UnsupportedTool(String),

    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MathlensError>;

/// How a failed tool call should be treated by whoever issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Retrying the same request may succeed (collaborator hiccup, timeout).
    Transient,
    /// The request itself is wrong and must be changed.
    InvalidInput,
    /// Nothing the caller can do will make this request succeed.
    Permanent,
}

impl MathlensError {
    /// Classify this error for the caller's retry decision. Retries are never
    /// performed inside the pipeline.
    pub fn class(&self) -> ErrorClass {
        match self {
            MathlensError::Rasterize(_) => ErrorClass::Transient,
            MathlensError::OcrError(_) => ErrorClass::Transient,
            MathlensError::Timeout(_) => ErrorClass::Transient,

            MathlensError::PageOutOfRange { .. } => ErrorClass::InvalidInput,
            MathlensError::InvalidRequest(_) => ErrorClass::InvalidInput,
            MathlensError::UnsupportedTool(_) => ErrorClass::InvalidInput,
            MathlensError::Serialization(_) => ErrorClass::InvalidInput,

            MathlensError::TextLayout(_) => ErrorClass::Permanent,
            MathlensError::ImageError(_) => ErrorClass::Permanent,

            MathlensError::Io(io_err) => match io_err.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    ErrorClass::InvalidInput
                }
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted => {
                    ErrorClass::Transient
                }
                _ => ErrorClass::Permanent,
            },
        }
    }

    /// Stable machine-readable code for the protocol layer.
    pub fn code(&self) -> &'static str {
        match self {
            MathlensError::Rasterize(_) => "rasterize_failed",
            MathlensError::OcrError(_) => "ocr_failed",
            MathlensError::TextLayout(_) => "text_layout_unavailable",
            MathlensError::PageOutOfRange { .. } => "page_out_of_range",
            MathlensError::ImageError(_) => "image_error",
            MathlensError::InvalidRequest(_) => "invalid_request",
            MathlensError::UnsupportedTool(_) => "unsupported_tool",
            MathlensError::Timeout(_) => "timeout",
            MathlensError::Io(_) => "io_error",
            MathlensError::Serialization(_) => "serialization_error",
        }
    }

    pub fn is_retriable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}
