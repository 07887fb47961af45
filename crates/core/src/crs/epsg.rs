//! proj definitions for the EPSG codes resolved without a WKT description.

use super::utm::{parse_utm_epsg, utm_proj};

pub const WGS84: u32 = 4326;
pub const DGN95: u32 = 4755;
pub const WEB_MERCATOR: u32 = 3857;

const WGS84_DATUM: &str = "+datum=WGS84";
/// DGN95 is realized on ITRF and coincides with WGS84 at metre level.
const DGN95_DATUM: &str = "+ellps=WGS84 +towgs84=0,0,0,0,0,0,0";

/// `(zone, north)` for DGN95 / UTM codes: 23866-23872 are 46N-52N,
/// 23877-23884 are 47S-54S.
fn dgn95_utm(code: u32) -> Option<(u32, bool)> {
    match code {
        23866..=23872 => Some((code - 23820, true)),
        23877..=23884 => Some((code - 23830, false)),
        _ => None,
    }
}

/// proj string for `code`, `None` when the code is not known.
pub fn proj_string(code: u32) -> Option<String> {
    if let Some((zone, north)) = parse_utm_epsg(code) {
        return Some(utm_proj(zone, north, WGS84_DATUM));
    }
    if let Some((zone, north)) = dgn95_utm(code) {
        return Some(utm_proj(zone, north, DGN95_DATUM));
    }
    match code {
        WGS84 => Some(format!("+proj=longlat {WGS84_DATUM} +no_defs")),
        DGN95 => Some(format!("+proj=longlat {DGN95_DATUM} +no_defs")),
        WEB_MERCATOR => Some(
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs".to_string(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes() {
        assert_eq!(proj_string(4326).as_deref(), Some("+proj=longlat +datum=WGS84 +no_defs"));
        assert!(proj_string(32749).unwrap().contains("+zone=49 +south"));
        assert!(proj_string(3857).unwrap().starts_with("+proj=merc"));
        assert!(proj_string(99999).is_none());
    }

    #[test]
    fn dgn95_utm_zones() {
        assert_eq!(dgn95_utm(23866), Some((46, true)));
        assert_eq!(dgn95_utm(23879), Some((49, false)));
        assert_eq!(dgn95_utm(23884), Some((54, false)));
        assert_eq!(dgn95_utm(23873), None);
        assert!(proj_string(23879).unwrap().contains("+towgs84=0,0,0,0,0,0,0"));
    }
}
