// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Envelope for returning engine results to API callers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl From<&BridgeError> for ApiError {
    fn from(error: &BridgeError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.public_message(),
        }
    }
}

/// `{ success, data?, error?, timestamp }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Logs the full error and keeps only its public form.
    pub fn from_error(err: &BridgeError) -> Self {
        if err.is_validation() {
            warn!(code = err.code(), error = %err, event = "request_rejected");
        } else {
            error!(code = err.code(), error = %err, event = "request_failed");
        }

        Self {
            success: false,
            data: None,
            error: Some(ApiError::from(err)),
            timestamp: Utc::now(),
        }
    }

    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::from_error(&e),
        }
    }
}
