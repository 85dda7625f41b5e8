use crate::core::geo::TileCoord;
use serde::{Deserialize, Serialize};

/// Trait representing anything that can produce tile URLs for a given coordinate.
///
/// The coordinate is always already wrapped into the grid of its zoom level.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// Simple implementation that hits the default OpenStreetMap tile server.
#[derive(Debug, Clone, Default)]
pub struct OpenStreetMapSource;

impl OpenStreetMapSource {
    pub fn new() -> Self {
        Self
    }
}

impl TileSource for OpenStreetMapSource {
    fn url(&self, coord: TileCoord) -> String {
        format!(
            "https://tile.openstreetmap.org/{}/{}/{}.png",
            coord.z, coord.x, coord.y
        )
    }
}

/// URL template with `{s}`, `{z}`, `{x}` and `{y}` placeholders.
///
/// `{s}` rotates through `subdomains` by `(x + y) % len`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlTemplateSource {
    pub template: String,
    pub subdomains: Vec<String>,
}

impl UrlTemplateSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            subdomains: Vec::new(),
        }
    }

    pub fn with_subdomains<I, S>(mut self, subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdomains = subdomains.into_iter().map(Into::into).collect();
        self
    }
}

impl TileSource for UrlTemplateSource {
    fn url(&self, coord: TileCoord) -> String {
        let subdomain = if self.subdomains.is_empty() {
            ""
        } else {
            let idx = ((coord.x as u64 + coord.y as u64) % self.subdomains.len() as u64) as usize;
            self.subdomains[idx].as_str()
        };
        self.template
            .replace("{s}", subdomain)
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
    }
}
