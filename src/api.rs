//! Typed wrappers around the Risk Radar REST endpoints.
//!
//! Every call goes through [`RiskRadarClient::execute`], so all of them share
//! the same retry policy and error classification.

use std::path::{Path, PathBuf};

use reqwest::Method;
use serde_json::Value as JsonValue;

use crate::{
    wire::AuthStatusBody,
    LogQuery, RequestOptions, Result, RiskRadarClient, RiskRadarError, TimeRange, UploadFile,
    UploadHistoryQuery, UploadOutcome, UploadProgress, UploadStage,
};

const AUTH_STATUS_PATH: &str = "/api/v1/auth/status";
const AUTH_PROFILE_PATH: &str = "/api/v1/auth/profile";
const UPLOAD_NESSUS_PATH: &str = "/api/v1/upload/nessus";
const UPLOAD_HISTORY_PATH: &str = "/api/v1/upload/history";
const UPLOAD_INFO_PATH: &str = "/api/v1/upload/info";
const LOGS_PATH: &str = "/api/v1/logs/";
const LOGS_HEALTH_PATH: &str = "/api/v1/logs/health/";
const ERROR_RATE_PATH: &str = "/api/v1/logs/analytics/error-rate/";
const BY_SOURCE_PATH: &str = "/api/v1/logs/analytics/by-source/";
const TOP_ERRORS_PATH: &str = "/api/v1/logs/analytics/top-errors/";
const STATUS_PATH: &str = "/api/v1/status";

/// Batch entry: either already in memory or read right before its upload.
enum PendingUpload {
    Loaded(UploadFile),
    Path(PathBuf),
}

impl PendingUpload {
    fn name(&self) -> String {
        match self {
            Self::Loaded(file) => file.filename().to_owned(),
            Self::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }

    async fn load(self) -> Result<UploadFile> {
        match self {
            Self::Loaded(file) => Ok(file),
            Self::Path(path) => UploadFile::from_path(&path).await,
        }
    }
}

impl RiskRadarClient {
    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------

    /// Returns the raw authentication status document.
    pub async fn auth_status(&self) -> Result<JsonValue> {
        self.execute_json(Method::GET, AUTH_STATUS_PATH, RequestOptions::new())
            .await
    }

    /// Checks whether the current credential is accepted.
    ///
    /// Any failure, including network errors, counts as "not authenticated".
    /// The answer is cached until the token changes.
    pub async fn is_authenticated(&mut self) -> bool {
        let authenticated = match self
            .execute(Method::GET, AUTH_STATUS_PATH, RequestOptions::new())
            .await
        {
            Ok(response) => response
                .json::<AuthStatusBody>()
                .await
                .ok()
                .and_then(|body| body.authenticated)
                .unwrap_or(false),
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %_err, "authentication check failed");
                false
            }
        };
        self.auth_cache.authenticated = Some(authenticated);
        authenticated
    }

    /// Fetches the profile of the authenticated user and caches it.
    pub async fn user_profile(&mut self) -> Result<JsonValue> {
        let profile = self
            .execute_json(Method::GET, AUTH_PROFILE_PATH, RequestOptions::new())
            .await?;
        self.auth_cache.profile = Some(profile.clone());
        Ok(profile)
    }

    // ------------------------------------------------------------------
    // Uploads
    // ------------------------------------------------------------------

    /// Uploads one Nessus report.
    ///
    /// With `force_reimport` the server skips duplicate detection; otherwise a
    /// previously imported file fails with [`RiskRadarError::DuplicateFile`].
    pub async fn upload_nessus_file(
        &self,
        file: UploadFile,
        force_reimport: bool,
    ) -> Result<JsonValue> {
        #[cfg(feature = "tracing")]
        {
            if !file.has_nessus_extension() {
                tracing::warn!(file = file.filename(), "file doesn't have .nessus extension");
            }
            let hash = file.sha256_hex();
            tracing::info!(
                file = file.filename(),
                hash = &hash[..8],
                bytes = file.len(),
                "uploading scan report"
            );
        }

        let mut options = RequestOptions::new();
        if force_reimport {
            options = options.query("force_reimport", "true");
        }
        let options = options.multipart("file", file);

        match self
            .execute_json(Method::POST, UPLOAD_NESSUS_PATH, options)
            .await
        {
            Ok(result) => {
                #[cfg(feature = "tracing")]
                tracing::info!(
                    statistics = %result.get("statistics").unwrap_or(&JsonValue::Null),
                    "upload successful"
                );
                Ok(result)
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                {
                    if let (Some(info), false) = (err.duplicate_info(), force_reimport) {
                        tracing::warn!(duplicate_info = %info, "duplicate file detected");
                        tracing::info!("use force_reimport to bypass duplicate detection");
                    }
                }
                Err(err)
            }
        }
    }

    /// Uploads files one after another, collecting a per-file outcome.
    ///
    /// A failing file does not stop the batch.
    pub async fn upload_many<I>(&self, files: I, force_reimport: bool) -> Vec<UploadOutcome>
    where
        I: IntoIterator<Item = UploadFile>,
    {
        self.upload_many_with_progress(files, force_reimport, |_| {})
            .await
    }

    /// Same as [`upload_many`](Self::upload_many), reporting each file's
    /// progress to `on_progress`.
    pub async fn upload_many_with_progress<I, F>(
        &self,
        files: I,
        force_reimport: bool,
        on_progress: F,
    ) -> Vec<UploadOutcome>
    where
        I: IntoIterator<Item = UploadFile>,
        F: FnMut(UploadProgress<'_>),
    {
        let pending = files.into_iter().map(PendingUpload::Loaded).collect();
        self.upload_batch(pending, force_reimport, on_progress)
            .await
    }

    /// Uploads every file in `dir` whose extension matches `extension`
    /// (case-insensitive, without the dot), in filename order.
    ///
    /// Files are read one at a time; a file that cannot be read is reported
    /// as a failed outcome and the remaining files are still uploaded.
    pub async fn upload_directory(
        &self,
        dir: impl AsRef<Path>,
        extension: &str,
        force_reimport: bool,
    ) -> Result<Vec<UploadOutcome>> {
        let dir = dir.as_ref();
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|err| {
            RiskRadarError::InvalidInput(format!("cannot read directory {}: {err}", dir.display()))
        })?;

        let wanted = extension.trim_start_matches('.');
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|err| {
            RiskRadarError::InvalidInput(format!("cannot list {}: {err}", dir.display()))
        })? {
            let is_file = entry
                .file_type()
                .await
                .map(|kind| kind.is_file())
                .unwrap_or(false);
            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted));
            if is_file && matches {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::warn!(dir = %dir.display(), extension = wanted, "no matching files found");
            return Ok(Vec::new());
        }

        let pending = paths.into_iter().map(PendingUpload::Path).collect();
        Ok(self.upload_batch(pending, force_reimport, |_| {}).await)
    }

    async fn upload_batch<F>(
        &self,
        pending: Vec<PendingUpload>,
        force_reimport: bool,
        mut on_progress: F,
    ) -> Vec<UploadOutcome>
    where
        F: FnMut(UploadProgress<'_>),
    {
        let total_files = pending.len();
        let mut outcomes = Vec::with_capacity(total_files);

        for (file_index, item) in pending.into_iter().enumerate() {
            let name = item.name();
            #[cfg(feature = "tracing")]
            tracing::info!(file = %name, position = file_index + 1, total_files, "uploading file");
            on_progress(UploadProgress {
                file_index,
                total_files,
                file_name: &name,
                stage: UploadStage::Uploading,
            });

            let result = match item.load().await {
                Ok(file) => self.upload_nessus_file(file, force_reimport).await,
                Err(err) => Err(err),
            };

            let stage = match &result {
                Ok(value) => UploadStage::Completed(value),
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(file = %name, error = %err, "upload failed");
                    UploadStage::Failed(err)
                }
            };
            on_progress(UploadProgress {
                file_index,
                total_files,
                file_name: &name,
                stage,
            });

            outcomes.push(UploadOutcome { file: name, result });
        }

        outcomes
    }

    /// Lists previous uploads. Does not send the credential.
    pub async fn upload_history(&self, query: &UploadHistoryQuery) -> Result<JsonValue> {
        let mut options = RequestOptions::anonymous();
        options.query = query.to_pairs();
        self.execute_json(Method::GET, UPLOAD_HISTORY_PATH, options)
            .await
    }

    /// Returns accepted file types and size limits.
    pub async fn upload_info(&self) -> Result<JsonValue> {
        self.execute_json(Method::GET, UPLOAD_INFO_PATH, RequestOptions::anonymous())
            .await
    }

    // ------------------------------------------------------------------
    // System monitoring (admin only)
    // ------------------------------------------------------------------

    pub async fn system_logs(&self, query: &LogQuery) -> Result<JsonValue> {
        let mut options = RequestOptions::new();
        options.query = query.to_pairs();
        self.execute_json(Method::GET, LOGS_PATH, options).await
    }

    pub async fn system_health(&self) -> Result<JsonValue> {
        self.execute_json(Method::GET, LOGS_HEALTH_PATH, RequestOptions::new())
            .await
    }

    pub async fn error_rate_analytics(&self, range: TimeRange) -> Result<JsonValue> {
        let options = RequestOptions::new().query("timeRange", range);
        self.execute_json(Method::GET, ERROR_RATE_PATH, options)
            .await
    }

    pub async fn logs_by_source(&self, range: TimeRange) -> Result<JsonValue> {
        let options = RequestOptions::new().query("timeRange", range);
        self.execute_json(Method::GET, BY_SOURCE_PATH, options)
            .await
    }

    /// Most frequent error messages in `range`.
    pub async fn top_errors(&self, limit: u32, range: TimeRange) -> Result<JsonValue> {
        let options = RequestOptions::new()
            .query("limit", limit)
            .query("timeRange", range);
        self.execute_json(Method::GET, TOP_ERRORS_PATH, options)
            .await
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    /// API liveness document. Does not send the credential.
    pub async fn api_status(&self) -> Result<JsonValue> {
        self.execute_json(Method::GET, STATUS_PATH, RequestOptions::anonymous())
            .await
    }
}
