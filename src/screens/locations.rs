//! Locations Screen
//!
//! User GPS fixes, newest first, as a marker table plus the map center and
//! the slippy-map tile that contains it.

use std::f64::consts::PI;
use std::sync::Arc;

use super::table::{format_time, Table};
use super::LoadState;
use crate::backend::{BackendResult, LocationRow, QueryService, SelectQuery, LOCATIONS_TABLE};
use crate::config::LocationsConfig;

/// Web Mercator cuts off here
const MAX_LATITUDE: f64 = 85.051_128_78;

/// A slippy-map tile address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    /// Fill a `{z}/{x}/{y}` URL template
    pub fn url(&self, template: &str) -> String {
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
            .replace("{s}", "a")
    }
}

/// Tile containing a point at a zoom level
pub fn tile_for(latitude: f64, longitude: f64, zoom: u8) -> TileCoord {
    let zoom = zoom.min(30);
    let n = f64::from(1u32 << zoom);
    let lat = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let lon = longitude.clamp(-180.0, 180.0);

    let x = ((lon + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * n).floor();

    let max = n - 1.0;
    TileCoord {
        x: x.clamp(0.0, max) as u32,
        y: y.clamp(0.0, max) as u32,
        z: zoom,
    }
}

/// What the map shows
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: u8,
    pub tile: TileCoord,
    pub tile_url: String,
    pub markers: Vec<LocationRow>,
}

impl MapView {
    /// Center on the newest fix, or the configured default when there is none
    pub fn new(markers: Vec<LocationRow>, config: &LocationsConfig) -> Self {
        let center = markers
            .first()
            .map(|l| (l.latitude, l.longitude))
            .unwrap_or((config.default_latitude, config.default_longitude));
        let tile = tile_for(center.0, center.1, config.zoom);

        Self {
            center,
            zoom: config.zoom,
            tile,
            tile_url: tile.url(&config.tile_url),
            markers,
        }
    }
}

/// Fetch fixes newest first, optionally capped
pub async fn fetch_locations(
    backend: &dyn QueryService,
    limit: Option<u64>,
) -> BackendResult<Vec<LocationRow>> {
    let mut query = SelectQuery::table(LOCATIONS_TABLE).order("timestamp", false);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    backend.select(&query).await?.decode()
}

pub struct LocationsScreen {
    backend: Arc<dyn QueryService>,
    config: LocationsConfig,
    state: LoadState<MapView>,
}

impl LocationsScreen {
    pub fn new(backend: Arc<dyn QueryService>, config: LocationsConfig) -> Self {
        Self {
            backend,
            config,
            state: LoadState::Loading,
        }
    }

    pub fn state(&self) -> &LoadState<MapView> {
        &self.state
    }

    pub async fn load(&mut self, limit: Option<u64>) {
        let result = fetch_locations(self.backend.as_ref(), limit)
            .await
            .map(|rows| MapView::new(rows, &self.config));
        self.state.apply(result, "locations");
    }

    pub fn render(&self) -> String {
        let mut out = String::from("User Locations Map\n\n");

        let view = match &self.state {
            LoadState::Ready(view) => view,
            _ => {
                out.push_str("Loading...\n");
                return out;
            }
        };

        out.push_str(&format!(
            "Center: {:.5}, {:.5} (zoom {})\n",
            view.center.0, view.center.1, view.zoom
        ));
        out.push_str(&format!(
            "Tile:   {}/{}/{}  {}\n\n",
            view.tile.z, view.tile.x, view.tile.y, view.tile_url
        ));

        if view.markers.is_empty() {
            out.push_str("No locations to display\n");
            return out;
        }

        let mut table = Table::new(["LATITUDE", "LONGITUDE", "TIMESTAMP"]);
        for marker in &view.markers {
            table.push(vec![
                format!("{:.6}", marker.latitude),
                format!("{:.6}", marker.longitude),
                format_time(marker.timestamp),
            ]);
        }
        out.push_str(&table.render());
        out.push_str(&format!("\n{} markers\n", view.markers.len()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use serde_json::json;

    #[test]
    fn test_tile_math() {
        assert_eq!(tile_for(-7.2575, 112.7521, 13), TileCoord { x: 6661, y: 4261, z: 13 });
        assert_eq!(tile_for(51.5, -0.12, 10), TileCoord { x: 511, y: 340, z: 10 });
        assert_eq!(tile_for(0.0, 0.0, 0), TileCoord { x: 0, y: 0, z: 0 });
    }

    #[test]
    fn test_tile_math_clamps_edges() {
        let tile = tile_for(90.0, 180.0, 2);
        assert_eq!(tile, TileCoord { x: 3, y: 0, z: 2 });
        let tile = tile_for(-90.0, -180.0, 2);
        assert_eq!(tile, TileCoord { x: 0, y: 3, z: 2 });
    }

    #[test]
    fn test_tile_url() {
        let tile = TileCoord { x: 1, y: 2, z: 3 };
        assert_eq!(
            tile.url("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png"),
            "https://a.tile.openstreetmap.org/3/1/2.png"
        );
    }

    #[test]
    fn test_default_center_without_locations() {
        let view = MapView::new(Vec::new(), &LocationsConfig::default());
        assert_eq!(view.center, (-7.2575, 112.7521));
        assert_eq!(view.zoom, 13);
        assert_eq!(view.tile_url, "https://tile.openstreetmap.org/13/6661/4261.png");
    }

    #[tokio::test]
    async fn test_centers_on_newest_fix() {
        let backend = Arc::new(MemoryBackend::new().with_rows(
            LOCATIONS_TABLE,
            vec![
                json!({"id": 1, "user_id": "u1", "latitude": 1.0, "longitude": 2.0,
                       "timestamp": "2024-05-01T08:00:00Z"}),
                json!({"id": 2, "user_id": "u2", "latitude": 3.0, "longitude": 4.0,
                       "timestamp": "2024-05-02T08:00:00Z"}),
            ],
        ));

        let mut screen = LocationsScreen::new(backend.clone(), LocationsConfig::default());
        screen.load(None).await;

        let view = screen.state().data().unwrap();
        assert_eq!(view.center, (3.0, 4.0));
        assert_eq!(view.markers.len(), 2);

        let rendered = screen.render();
        assert!(rendered.contains("2 markers"));
        assert!(rendered.contains("3.000000"));

        screen.load(Some(1)).await;
        assert_eq!(screen.state().data().unwrap().markers.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_and_failed() {
        let backend = Arc::new(MemoryBackend::new());
        let mut screen = LocationsScreen::new(backend.clone(), LocationsConfig::default());
        screen.load(None).await;
        assert!(screen.render().contains("No locations to display"));

        let failing = Arc::new(MemoryBackend::new());
        failing.fail(LOCATIONS_TABLE);
        let mut screen = LocationsScreen::new(failing, LocationsConfig::default());
        screen.load(None).await;
        assert!(matches!(screen.state(), LoadState::Failed(_)));
        assert!(screen.render().contains("Loading..."));
    }
}
