//! Boundary loading against shapefiles written to a temporary directory.

use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use geo::{polygon, BoundingRect};
use tidemark_analysis::config::AttributeMap;
use tidemark_analysis::{AnalysisError, RegionLoader};
use tidemark_core::crs::{Transformer, CRS};
use tidemark_core::io::write_shapefile;
use tidemark_core::vector::{Feature, FeatureCollection};
use tidemark_core::BBox;

fn sampang() -> BBox {
    BBox::new(113.35, -7.22, 113.38, -7.19)
}

fn square(w: f64, s: f64, size: f64) -> Feature {
    Feature::new(polygon![
        (x: w, y: s),
        (x: w + size, y: s),
        (x: w + size, y: s + size),
        (x: w, y: s + size),
        (x: w, y: s),
    ])
}

fn project(lon: f64, lat: f64, to: &CRS) -> (f64, f64) {
    Transformer::new(&CRS::wgs84(), to).unwrap().transform(lon, lat)
}

fn write(dir: &Path, features: Vec<Feature>, crs: Option<&CRS>) -> PathBuf {
    let path = dir.join("boundary.shp");
    let fc: FeatureCollection = features.into_iter().collect();
    write_shapefile(&path, &fc, crs).unwrap();
    path
}

#[test]
fn clips_to_the_box_and_maps_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        vec![
            square(113.37, -7.195, 0.02)
                .with_property("NAMOBJ", "Kawasan Konservasi Pesisir Sampang")
                .with_property("KODKWS", "KKP-3527")
                .with_property("JNSRPR", "Taman Pesisir")
                .with_property("WKLPR", "Dinas Kelautan")
                .with_property("LUASHA", "1234.56"),
            square(114.0, -7.0, 0.01).with_property("NAMOBJ", "Elsewhere"),
        ],
        Some(&CRS::wgs84()),
    );

    let region = RegionLoader::default().load(&path, &sampang()).unwrap();
    assert_eq!(region.len(), 1);
    let r = &region.records()[0];
    assert_eq!(r.name.as_deref(), Some("Kawasan Konservasi Pesisir Sampang"));
    assert_eq!(r.code.as_deref(), Some("KKP-3527"));
    assert_eq!(r.kind.as_deref(), Some("Taman Pesisir"));
    assert_eq!(r.management.as_deref(), Some("Dinas Kelautan"));
    assert_eq!(r.remark, None);
    assert_eq!(r.area_ha, Some(1234.56));

    // clipped to the north-east corner of the box
    let rect = r.geometry.bounding_rect().unwrap();
    assert_abs_diff_eq!(rect.min().x, 113.37, epsilon = 1e-9);
    assert_abs_diff_eq!(rect.max().x, 113.38, epsilon = 1e-9);
    assert_abs_diff_eq!(rect.min().y, -7.195, epsilon = 1e-9);
    assert_abs_diff_eq!(rect.max().y, -7.19, epsilon = 1e-9);
}

#[test]
fn straddling_area_is_measured_inside_the_box() {
    let dir = tempfile::tempdir().unwrap();
    // half of the square lies north of the box
    let path = write(dir.path(), vec![square(113.36, -7.195, 0.01)], Some(&CRS::wgs84()));
    let region = RegionLoader::default().load(&path, &sampang()).unwrap();

    // 0.01 x 0.005 degrees at 7.19 S is about 61 ha
    let area = region.geodesic_area_ha();
    assert!((58.0..64.0).contains(&area), "{area}");
}

#[test]
fn utm_boundaries_are_reprojected() {
    let dir = tempfile::tempdir().unwrap();
    // about 1 km square in UTM 49S around (113.365, -7.205)
    let (x, y) = project(113.365, -7.205, &CRS::utm(49, false));
    let path = write(
        dir.path(),
        vec![square(x - 500.0, y - 500.0, 1000.0).with_property("NAMOBJ", "Centre")],
        Some(&CRS::utm(49, false)),
    );

    let region = RegionLoader::default().load(&path, &sampang()).unwrap();
    let (lon, lat) = region.centroid();
    assert_abs_diff_eq!(lon, 113.365, epsilon = 1e-4);
    assert_abs_diff_eq!(lat, -7.205, epsilon = 1e-4);
    assert_abs_diff_eq!(region.geodesic_area_ha(), 100.0, epsilon = 1.0);
}

#[test]
fn web_mercator_boundaries_are_reprojected() {
    let dir = tempfile::tempdir().unwrap();
    let (x, y) = project(113.365, -7.205, &CRS::from_epsg(3857));
    let path = write(dir.path(), vec![square(x - 500.0, y - 500.0, 1000.0)], None);
    std::fs::write(
        path.with_extension("prj"),
        r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],PARAMETER["Standard_Parallel_1",0.0],PARAMETER["Auxiliary_Sphere_Type",0.0],UNIT["Meter",1.0]]"#,
    )
    .unwrap();

    let region = RegionLoader::default().load(&path, &sampang()).unwrap();
    let (lon, lat) = region.centroid();
    assert_abs_diff_eq!(lon, 113.365, epsilon = 1e-4);
    assert_abs_diff_eq!(lat, -7.205, epsilon = 1e-4);
    // mercator metres shrink by cos(lat) on the ground
    let expected = 100.0 * (7.205_f64.to_radians().cos()).powi(2);
    assert_abs_diff_eq!(region.geodesic_area_ha(), expected, epsilon = 1.5);
}

#[test]
fn dgn95_boundaries_are_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let (x, y) = project(113.365, -7.205, &CRS::utm(49, false));
    let path = write(dir.path(), vec![square(x - 500.0, y - 500.0, 1000.0)], None);
    std::fs::write(
        path.with_extension("prj"),
        r#"PROJCS["DGN_1995_UTM_Zone_49S",GEOGCS["GCS_DGN_1995",DATUM["D_Geodetic_Datum_of_1995",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",10000000.0],PARAMETER["Central_Meridian",111.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#,
    )
    .unwrap();

    let region = RegionLoader::default().load(&path, &sampang()).unwrap();
    let (lon, lat) = region.centroid();
    assert_abs_diff_eq!(lon, 113.365, epsilon = 1e-4);
    assert_abs_diff_eq!(lat, -7.205, epsilon = 1e-4);
    assert_abs_diff_eq!(region.geodesic_area_ha(), 100.0, epsilon = 1.0);
}

#[test]
fn loading_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), vec![square(113.36, -7.21, 0.01)], Some(&CRS::wgs84()));
    let loader = RegionLoader::default();
    assert_eq!(loader.load(&path, &sampang()).unwrap(), loader.load(&path, &sampang()).unwrap());
}

#[test]
fn empty_clip_is_data_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), vec![square(114.0, -7.0, 0.01)], Some(&CRS::wgs84()));
    let err = RegionLoader::default().load(&path, &sampang()).unwrap_err();
    match err {
        AnalysisError::DataUnavailable { path: p, reason } => {
            assert_eq!(p, path);
            assert!(reason.contains("intersect"), "{reason}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn missing_prj_is_data_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), vec![square(113.36, -7.21, 0.01)], None);
    let err = RegionLoader::default().load(&path, &sampang()).unwrap_err();
    assert!(matches!(err, AnalysisError::DataUnavailable { .. }));
}

#[test]
fn unsupported_crs_is_data_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), vec![square(113.36, -7.21, 0.01)], Some(&CRS::wgs84()));
    std::fs::write(
        path.with_extension("prj"),
        r#"PROJCS["Lambert_Conformal_Conic",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]],PROJECTION["Lambert_Conformal_Conic"]]"#,
    )
    .unwrap();
    let err = RegionLoader::default().load(&path, &sampang()).unwrap_err();
    assert!(matches!(err, AnalysisError::DataUnavailable { .. }));
}

#[test]
fn custom_attribute_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        vec![square(113.36, -7.21, 0.01).with_property("NAME", "Pantai Camplong").with_property("AREA", 42.0)],
        Some(&CRS::wgs84()),
    );
    let fields = AttributeMap { name: "NAME".into(), area: "AREA".into(), ..AttributeMap::default() };
    let region = RegionLoader::new(fields).load(&path, &sampang()).unwrap();
    assert_eq!(region.records()[0].name.as_deref(), Some("Pantai Camplong"));
    assert_eq!(region.records()[0].area_ha, Some(42.0));
    assert_eq!(region.records()[0].display("NAME"), "Pantai Camplong");
}
