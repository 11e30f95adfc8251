//! `riskradar-client` is an async HTTP client for the Risk Radar
//! vulnerability management API.
//!
//! All calls funnel through [`RiskRadarClient::execute`], which attaches the
//! bearer credential, retries transient failures with exponential backoff and
//! turns failed responses into a classified [`RiskRadarError`]. On top of it:
//! - [`RiskRadarClient::upload_nessus_file`] / [`RiskRadarClient::upload_many`]
//! - [`RiskRadarClient::is_authenticated`] / [`RiskRadarClient::user_profile`]
//! - [`RiskRadarClient::upload_history`] and the admin log queries

mod api;
mod client;
mod error;
mod options;
mod retry;
mod types;
mod upload;
mod wire;

pub use client::{RiskRadarClient, DEFAULT_BASE_URL};
pub use error::RiskRadarError;
pub use options::ClientOptions;
pub use retry::RetryPolicy;
pub use types::{LogQuery, RequestBody, RequestOptions, TimeRange, UploadHistoryQuery};
pub use upload::{UploadFile, UploadOutcome, UploadProgress, UploadStage, NESSUS_MIME};

pub use reqwest::{Method, Response};

pub type Result<T> = std::result::Result<T, RiskRadarError>;
