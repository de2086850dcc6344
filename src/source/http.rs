//! XYZ tile service over HTTP.

use super::{TileId, TileService};
use crate::constants::download::{MAX_ATTEMPTS, REQUEST_TIMEOUT_SECS, RETRY_BASE_DELAY_MS};
use crate::constants::web_mercator::TILE_SIZE;
use crate::error::{BoxError, Error, Result};
use futures_util::StreamExt;
use futures_util::future::try_join_all;
use image::RgbImage;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;
use tracing::{debug, trace, warn};

/// Tile service addressed by a URL template containing `{z}`, `{x}` and
/// `{y}` placeholders.
///
/// Downloads run on an internal tokio runtime. A semaphore caps the number
/// of requests in flight across all callers.
pub struct HttpTileService {
    template: String,
    client: Client,
    runtime: Runtime,
    permits: Arc<Semaphore>,
}

impl HttpTileService {
    /// Create a service for `template` allowing `max_downloads` concurrent
    /// requests.
    pub fn new(template: &str, max_downloads: usize) -> Result<Self> {
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !template.contains(placeholder) {
                return Err(Error::config(format!(
                    "tile service URL '{template}' is missing the {placeholder} placeholder"
                )));
            }
        }
        if max_downloads == 0 {
            return Err(Error::config("maximum downloads must be at least 1"));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("openskynet/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Internal {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("tile-download")
            .build()
            .map_err(|e| Error::Internal {
                message: format!("Failed to create async runtime: {e}"),
            })?;

        debug!(
            "Tile service {} with up to {} concurrent downloads",
            template, max_downloads
        );

        Ok(Self {
            template: template.to_string(),
            client,
            runtime,
            permits: Arc::new(Semaphore::new(max_downloads)),
        })
    }

    /// URL of one tile.
    pub fn tile_url(&self, tile: TileId) -> String {
        self.template
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }

    async fn download(&self, tile: TileId) -> std::result::Result<RgbImage, BoxError> {
        let url = self.tile_url(tile);
        let mut attempt = 1;
        loop {
            match self.download_once(&url).await {
                Ok(image) => return Ok(image),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!("Tile {} attempt {} failed: {}", tile, attempt, e);
                    let delay = RETRY_BASE_DELAY_MS * (1 << (attempt - 1));
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(format!("tile {tile} ({url}): {e}").into()),
            }
        }
    }

    async fn download_once(&self, url: &str) -> std::result::Result<RgbImage, BoxError> {
        let _permit = self.permits.acquire().await?;
        trace!("GET {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()).into());
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }

        Ok(image::load_from_memory(&body)?.to_rgb8())
    }
}

impl TileService for HttpTileService {
    fn tile_size(&self) -> u32 {
        TILE_SIZE
    }

    fn fetch_tiles(&self, tiles: &[TileId]) -> std::result::Result<Vec<RgbImage>, BoxError> {
        self.runtime
            .block_on(try_join_all(tiles.iter().map(|&t| self.download(t))))
    }
}
