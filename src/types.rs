use std::fmt;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value as JsonValue;

use crate::UploadFile;

/// Body attached to every attempt of a logical request.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Raw bytes with an optional `Content-Type`.
    Bytes {
        contents: Bytes,
        content_type: Option<String>,
    },
    /// JSON document, sent with `Content-Type: application/json`.
    Json(JsonValue),
    /// Single-part multipart form carrying one file under `field`.
    Multipart { field: String, file: UploadFile },
}

/// Transport options for [`RiskRadarClient::execute`](crate::RiskRadarClient::execute).
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// Attach the bearer credential when one is configured.
    pub authenticate: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: RequestBody::Empty,
            authenticate: true,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends the request without an `Authorization` header.
    pub fn anonymous() -> Self {
        Self {
            authenticate: false,
            ..Self::default()
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json(mut self, value: JsonValue) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    pub fn bytes(mut self, contents: impl Into<Bytes>, content_type: Option<String>) -> Self {
        self.body = RequestBody::Bytes {
            contents: contents.into(),
            content_type,
        };
        self
    }

    pub fn multipart(mut self, field: impl Into<String>, file: UploadFile) -> Self {
        self.body = RequestBody::Multipart {
            field: field.into(),
            file,
        };
        self
    }
}

/// Window accepted by the log analytics endpoints.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TimeRange {
    OneHour,
    #[default]
    OneDay,
    SevenDays,
}

impl TimeRange {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneHour => "1h",
            Self::OneDay => "24h",
            Self::SevenDays => "7d",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters for `GET /api/v1/upload/history`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UploadHistoryQuery {
    /// Defaults to 50; values above 200 are clamped.
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// One of `pending`, `processing`, `completed`, `failed`.
    pub status: Option<String>,
    pub integration: Option<String>,
}

impl UploadHistoryQuery {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 200;

    pub(crate) fn to_pairs(&self) -> Vec<(String, String)> {
        let limit = self
            .limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT);
        let mut pairs = vec![
            ("limit".to_owned(), limit.to_string()),
            ("offset".to_owned(), self.offset.unwrap_or(0).to_string()),
        ];
        push_opt(&mut pairs, "status", &self.status);
        push_opt(&mut pairs, "integration", &self.integration);
        pairs
    }
}

/// Filters for `GET /api/v1/logs/`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LogQuery {
    /// Defaults to 50.
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// `DEBUG`, `INFO`, `WARNING`, `ERROR`, `CRITICAL` or `ALL`.
    pub level: Option<String>,
    /// `django`, `docker`, `system`, `nginx` or `ALL`.
    pub source: Option<String>,
    pub search: Option<String>,
    /// ISO-8601 timestamp.
    pub start_time: Option<String>,
    /// ISO-8601 timestamp.
    pub end_time: Option<String>,
}

impl LogQuery {
    pub const DEFAULT_LIMIT: u32 = 50;

    pub(crate) fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            (
                "limit".to_owned(),
                self.limit.unwrap_or(Self::DEFAULT_LIMIT).to_string(),
            ),
            ("offset".to_owned(), self.offset.unwrap_or(0).to_string()),
        ];
        push_opt(&mut pairs, "level", &self.level);
        push_opt(&mut pairs, "source", &self.source);
        push_opt(&mut pairs, "search", &self.search);
        push_opt(&mut pairs, "start_time", &self.start_time);
        push_opt(&mut pairs, "end_time", &self.end_time);
        pairs
    }
}

fn push_opt(pairs: &mut Vec<(String, String)>, key: &str, value: &Option<String>) {
    if let Some(value) = value.as_deref().filter(|value| !value.is_empty()) {
        pairs.push((key.to_owned(), value.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::{LogQuery, TimeRange, UploadHistoryQuery};

    #[test]
    fn history_limit_is_clamped() {
        let pairs = UploadHistoryQuery {
            limit: Some(1_000),
            status: Some("failed".to_owned()),
            ..UploadHistoryQuery::default()
        }
        .to_pairs();
        assert_eq!(
            pairs,
            vec![
                ("limit".to_owned(), "200".to_owned()),
                ("offset".to_owned(), "0".to_owned()),
                ("status".to_owned(), "failed".to_owned()),
            ]
        );
    }

    #[test]
    fn log_query_skips_empty_filters() {
        let pairs = LogQuery {
            level: Some(String::new()),
            search: Some("timeout".to_owned()),
            ..LogQuery::default()
        }
        .to_pairs();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0], ("limit".to_owned(), "50".to_owned()));
        assert_eq!(pairs[2], ("search".to_owned(), "timeout".to_owned()));
    }

    #[test]
    fn time_range_defaults_to_one_day() {
        assert_eq!(TimeRange::default().to_string(), "24h");
        assert_eq!(TimeRange::SevenDays.as_str(), "7d");
    }
}
