//! Synthetic entity dataset: uniform scatter over a lon/lat box, reprojected
//! to Web Mercator meters.

use glam::DVec2;
use rand::Rng;
use smv_core::store::SpriteEntity;

use crate::config::GeoBounds;

const EARTH_RADIUS_M: f64 = 6_378_137.0;
/// Meters per pixel at zoom 0 for 256 px tiles.
const ZOOM0_RESOLUTION: f64 = 156_543.033_928_040_97;
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Spherical Web Mercator forward projection. Latitude is clamped to the
/// projection's square extent.
pub fn geographic_to_web_mercator(lon_deg: f64, lat_deg: f64) -> DVec2 {
    let lat = lat_deg.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = EARTH_RADIUS_M * lon_deg.to_radians();
    let y = EARTH_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat * 0.5).tan().ln();
    DVec2::new(x, y)
}

/// World units per CSS pixel at a (fractional) zoom level.
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    ZOOM0_RESOLUTION / 2f64.powf(zoom)
}

/// Scatters `count` entities uniformly in `bounds`, assigning style codes
/// round-robin over `codes`.
pub fn scatter_entities<R: Rng>(
    count: usize,
    bounds: &GeoBounds,
    codes: &[String],
    rng: &mut R,
) -> Result<Vec<SpriteEntity>, String> {
    if codes.is_empty() {
        return Err("No eligible style codes to assign to the dataset".to_string());
    }
    let entities = (0..count)
        .map(|i| {
            let lon = rng.gen_range(bounds.min_lon..bounds.max_lon);
            let lat = rng.gen_range(bounds.min_lat..bounds.max_lat);
            SpriteEntity {
                id: i as u32,
                position: geographic_to_web_mercator(lon, lat),
                style_code: codes[i % codes.len()].clone(),
            }
        })
        .collect();
    Ok(entities)
}
