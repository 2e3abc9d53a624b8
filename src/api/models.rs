//! API Request/Response Models

use crate::games::{LeaderboardRow, Symbol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope wrapping every response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn failure(error: String, message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            message: Some(message),
        }
    }
}

/// `POST /api/game/spin` body. Every field is optional and client symbols
/// are never used for scoring, but they must still name real symbols.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpinRequest {
    #[serde(default)]
    pub symbols: Option<[Symbol; 3]>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// Raw leaderboard query; numbers are validated by the handler so bad input
/// produces a field-level message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardRow>,
    pub user_rank: Option<u64>,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub timestamp: DateTime<Utc>,
}
