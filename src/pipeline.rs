//! Request orchestration: validate, classify, look up, generate, store.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::classify::{classify, Classification};
use crate::config::GeneratorConfig;
use crate::error::{GenerateError, GenerateResult};
use crate::logo::{HttpLogoFetcher, LogoCompositor, LogoSource};
use crate::params::{GenerationRequest, RequestParams};
use crate::render::{encode_png, encode_qr};
use crate::storage::{ArtifactStore, FsArtifactStore, StorageStats, StoredLocation};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub bytes: Vec<u8>,
    pub source: Source,
    /// Stable identifier, for structured payloads only
    pub identifier: Option<String>,
    /// Set when this call wrote a new artifact
    pub stored: Option<StoredLocation>,
}

impl Generated {
    pub fn from_cache(&self) -> bool {
        self.source == Source::Cache
    }

    /// Headers an HTTP front end should attach to the image response.
    pub fn response_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Content-Type", "image/png".to_string()),
            ("Content-Disposition", "inline; filename=\"qrcode.png\"".to_string()),
            ("Cache-Control", "public, max-age=31536000".to_string()),
            ("X-QR-From-Cache", self.from_cache().to_string()),
        ];
        if let Some(stored) = &self.stored {
            let code = self.identifier.clone().unwrap_or_else(|| "general".to_string());
            headers.push(("X-QR-Activation-Code", code));
            headers.push(("X-QR-Filename", stored.filename.clone()));
        }
        headers
    }
}

pub struct Generator {
    store: Arc<dyn ArtifactStore>,
    compositor: LogoCompositor,
}

impl Generator {
    pub fn new(store: Arc<dyn ArtifactStore>, logo_source: Arc<dyn LogoSource>, corner_radius: u32) -> Self {
        Self { store, compositor: LogoCompositor::new(logo_source, corner_radius) }
    }

    /// Filesystem store and HTTP logo fetcher, both configured from `config`.
    pub fn from_config(config: &GeneratorConfig) -> GenerateResult<Self> {
        let store = FsArtifactStore::with_prefix(&config.storage.root, &config.storage.generic_prefix);
        let fetcher = HttpLogoFetcher::new(&config.logo)?;
        Ok(Self::new(Arc::new(store), Arc::new(fetcher), config.logo.corner_radius))
    }

    pub async fn generate(&self, params: &RequestParams) -> GenerateResult<Generated> {
        let req = params.validate()?;
        self.generate_request(&req).await
    }

    pub async fn generate_request(&self, req: &GenerationRequest) -> GenerateResult<Generated> {
        let class = classify(&req.data);
        debug!(structured = class.is_structured(), "Classified payload");

        if let Classification::Structured { identifier } = &class {
            if let Some(hit) = self.store.lookup(identifier).await {
                info!(identifier = %identifier, path = %hit.location.path.display(), "Cache hit");
                return Ok(Generated {
                    bytes: hit.bytes,
                    source: Source::Cache,
                    identifier: Some(identifier.clone()),
                    stored: None,
                });
            }
            debug!(identifier = %identifier, "Cache miss");
        }

        let bytes = self.render(req).await?;
        let stored = self.store.store(&bytes, &class.cache_key()).await?;

        Ok(Generated {
            bytes,
            source: Source::Generated,
            identifier: class.identifier().map(str::to_string),
            stored: Some(stored),
        })
    }

    async fn render(&self, req: &GenerationRequest) -> GenerateResult<Vec<u8>> {
        let (data, size, color, bg_color, ec_level) =
            (req.data.clone(), req.size, req.color, req.bg_color, req.ec_level);
        let mut base = tokio::task::spawn_blocking(move || encode_qr(&data, size, color, bg_color, ec_level))
            .await
            .map_err(|e| GenerateError::composite("run encoder", e))??;
        debug!(size, ec_level = %req.ec_level, "Encoded QR");

        self.compositor.apply(&mut base, req).await?;
        encode_png(&base)
    }

    pub async fn stats(&self) -> GenerateResult<StorageStats> {
        Ok(self.store.stats().await?)
    }

    pub async fn evict_older_than(&self, max_age: Duration) -> GenerateResult<usize> {
        Ok(self.store.evict_older_than(max_age).await?)
    }

    pub async fn evict_older_than_days(&self, days: u64) -> GenerateResult<usize> {
        let max_age = DAY.checked_mul(days.min(u32::MAX as u64) as u32).unwrap_or(Duration::MAX);
        self.evict_older_than(max_age).await
    }
}
