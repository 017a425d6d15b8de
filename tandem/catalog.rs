use crate::config::Config;
use crate::error::App;
use crate::player::playlist::{Playlist, Track};
use log::{info, warn};
use percent_encoding::percent_decode_str;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tokio::time::sleep;

/// Loads the playlist for `folder` (a card name under the library root).
///
/// Waits out the list fade first. Any failure is logged and yields an empty playlist.
pub async fn load_folder(client: &Client, config: &Config, folder: &str) -> Playlist {
    sleep(config.fade_delay()).await;

    let folder_path = config.folder_path(folder);
    let result = match folder_url(&config.server, &folder_path) {
        Ok(url) => fetch_listing(client, &url, &config.extension).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(playlist) => {
            info!("Loaded {} tracks from {}", playlist.len(), folder_path);
            playlist
        }
        Err(e) => {
            warn!("Failed to load folder {folder_path}: {e}");
            Playlist::default()
        }
    }
}

pub fn folder_url(server: &str, folder_path: &str) -> Result<Url, App> {
    let raw = format!(
        "{}/{}/",
        server.trim_end_matches('/'),
        folder_path.trim_matches('/')
    );
    Url::parse(&raw).map_err(|e| App::InvalidInput(format!("Bad folder URL {raw}: {e}")))
}

pub async fn fetch_listing(client: &Client, url: &Url, extension: &str) -> Result<Playlist, App> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(App::Network(format!("{url} answered {status}")));
    }
    let body = response.text().await?;
    Ok(parse_listing(&body, url, extension))
}

/// Collects the anchors of a directory listing that point at audio files, in document order.
pub fn parse_listing(html: &str, folder_url: &Url, extension: &str) -> Playlist {
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Playlist::default();
    };
    let document = Html::parse_document(html);
    let prefix = folder_url.path();

    let tracks = document
        .select(&anchors)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| folder_url.join(href).ok())
        .filter(|url| url.as_str().ends_with(extension))
        .map(|url| Track {
            name: track_name(&url, prefix),
            url: url.to_string(),
        })
        .collect();

    Playlist::new(tracks)
}

fn track_name(url: &Url, prefix: &str) -> String {
    let path = url.path();
    let raw = path
        .strip_prefix(prefix)
        .or_else(|| path.rsplit('/').next())
        .unwrap_or(path);
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}
