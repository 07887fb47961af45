//! UTM zone selection for metric analysis grids.

/// Parse an EPSG code into `Some((zone, is_north))` for WGS84 UTM codes.
pub fn parse_utm_epsg(epsg: u32) -> Option<(u32, bool)> {
    if (32601..=32660).contains(&epsg) {
        Some((epsg - 32600, true))
    } else if (32701..=32760).contains(&epsg) {
        Some((epsg - 32700, false))
    } else {
        None
    }
}

/// EPSG code of the WGS84 UTM zone containing `(lon, lat)`.
pub fn utm_epsg_for(lon: f64, lat: f64) -> u32 {
    let zone = (((lon + 180.0) / 6.0).floor() as i64).clamp(0, 59) as u32 + 1;
    if lat >= 0.0 {
        32600 + zone
    } else {
        32700 + zone
    }
}

/// proj definition of a UTM zone on the given datum parameters.
pub(super) fn utm_proj(zone: u32, north: bool, datum: &str) -> String {
    let south = if north { "" } else { " +south" };
    format!("+proj=utm +zone={zone}{south} {datum} +units=m +no_defs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_utm_codes() {
        assert_eq!(parse_utm_epsg(32630), Some((30, true)));
        assert_eq!(parse_utm_epsg(32749), Some((49, false)));
        assert_eq!(parse_utm_epsg(4326), None);
        assert_eq!(parse_utm_epsg(32600), None);
        assert_eq!(parse_utm_epsg(32761), None);
    }

    #[test]
    fn zone_for_point() {
        assert_eq!(utm_epsg_for(113.365, -7.205), 32749);
        assert_eq!(utm_epsg_for(-3.7, 40.4), 32630);
        assert_eq!(utm_epsg_for(180.0, 0.0), 32660);
        assert_eq!(utm_epsg_for(-180.0, -1.0), 32701);
    }

    #[test]
    fn south_zones_carry_the_flag() {
        assert_eq!(utm_proj(49, false, "+datum=WGS84"), "+proj=utm +zone=49 +south +datum=WGS84 +units=m +no_defs");
        assert!(!utm_proj(50, true, "+datum=WGS84").contains("+south"));
    }
}
