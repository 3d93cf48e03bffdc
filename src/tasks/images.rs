use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::config::ImageSourceConfig;
use crate::events::ImageRecord;

/// Sample images shown whenever the real source is unavailable.
pub fn fallback_images() -> Vec<ImageRecord> {
    [
        ("https://picsum.photos/id/1015/1920/1080", "River valley"),
        ("https://picsum.photos/id/1016/1920/1080", "Canyon"),
        ("https://picsum.photos/id/1018/1920/1080", "Mountain lake"),
        ("https://picsum.photos/id/1039/1920/1080", "Waterfall"),
        ("https://picsum.photos/id/1043/1920/1080", "Forest path"),
    ]
    .into_iter()
    .map(|(url, name)| ImageRecord::new(url, name))
    .collect()
}

/// Entry returned by the upload service's listing endpoint. Its
/// `lastModified` field is not needed here.
#[derive(Debug, Deserialize)]
struct RemoteImage {
    url: String,
    name: String,
}

fn absolute_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

pub fn parse_listing(base: &str, body: &str) -> Result<Vec<ImageRecord>> {
    let listing: Vec<RemoteImage> =
        serde_json::from_str(body).context("unexpected image listing shape")?;
    Ok(listing
        .into_iter()
        .map(|img| ImageRecord::new(absolute_url(base, &img.url), img.name))
        .collect())
}

async fn fetch_remote(
    client: &Client,
    base: &str,
    api_key: Option<&str>,
) -> Result<Vec<ImageRecord>> {
    let endpoint = format!("{}/api/images", base.trim_end_matches('/'));
    let mut request = client.get(&endpoint);
    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }
    let body = request
        .send()
        .await
        .with_context(|| format!("image listing request to {endpoint} failed"))?
        .error_for_status()
        .context("image service returned an error status")?
        .text()
        .await
        .context("failed to read image listing")?;
    parse_listing(base, &body)
}

#[inline]
fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase()),
        Some(ref e) if ["jpg", "jpeg", "png", "webp", "gif"].contains(&e.as_str())
    )
}

/// Recursive scan; records are sorted by path so the order is stable.
pub fn scan_directory(root: &Path) -> Result<Vec<ImageRecord>> {
    ensure!(root.is_dir(), "image directory {} does not exist", root.display());
    let mut paths: Vec<_> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_image(e.path()))
        .map(|e| e.into_path())
        .collect();
    paths.sort();
    Ok(paths
        .into_iter()
        .map(|p| {
            let name = p
                .file_stem()
                .and_then(OsStr::to_str)
                .unwrap_or_default()
                .to_string();
            ImageRecord::new(p.display().to_string(), name)
        })
        .collect())
}

async fn try_fetch(source: &ImageSourceConfig, client: &Client) -> Result<Vec<ImageRecord>> {
    match source {
        ImageSourceConfig::Remote { url, api_key } => {
            fetch_remote(client, url, api_key.as_deref()).await
        }
        ImageSourceConfig::Directory { path } => {
            let path = path.clone();
            tokio::task::spawn_blocking(move || scan_directory(&path)).await?
        }
        ImageSourceConfig::Fallback => Ok(fallback_images()),
    }
}

/// Never fails: errors and empty results degrade to [`fallback_images`].
pub async fn fetch_images(source: &ImageSourceConfig, client: &Client) -> Vec<ImageRecord> {
    match try_fetch(source, client).await {
        Ok(images) if !images.is_empty() => images,
        Ok(_) => {
            warn!("image source returned no images; using fallback list");
            fallback_images()
        }
        Err(err) => {
            warn!(error = ?err, "image fetch failed; using fallback list");
            fallback_images()
        }
    }
}

/// Periodically refetch the list and publish it when it changes.
#[instrument(skip_all, fields(refresh_s = refresh.as_secs()))]
pub async fn run(
    source: ImageSourceConfig,
    client: Client,
    refresh: Duration,
    images_tx: watch::Sender<Vec<ImageRecord>>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let images = tokio::select! {
            _ = cancel.cancelled() => break,
            images = fetch_images(&source, &client) => images,
        };
        let count = images.len();
        let changed = images_tx.send_if_modified(|current| {
            if *current == images {
                return false;
            }
            *current = images;
            true
        });
        if changed {
            info!(count, "image list refreshed");
        } else {
            debug!(count, "image list unchanged");
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(refresh) => {}
        }
    }
    debug!("cancel received; exiting images task");
    Ok(())
}
