//! Area per water class, with optional zone masks

use crate::imagery::WaterClass;
use crate::maybe_rayon::*;
use tidemark_core::raster::Raster;
use tidemark_core::{Error, Result};

/// Cell counts per class over the cells selected by a study-area mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassCounts {
    pub water: usize,
    pub land: usize,
    /// Land cells that are also inside the zone mask
    pub land_in_zone: usize,
    pub unclassified: usize,
}

impl ClassCounts {
    fn add(self, o: ClassCounts) -> ClassCounts {
        ClassCounts {
            water: self.water + o.water,
            land: self.land + o.land,
            land_in_zone: self.land_in_zone + o.land_in_zone,
            unclassified: self.unclassified + o.unclassified,
        }
    }

    pub fn total(&self) -> usize {
        self.water + self.land + self.unclassified
    }
}

/// Areas in square map units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassAreas {
    pub counts: ClassCounts,
    pub cell_area: f64,
}

impl ClassAreas {
    pub fn water_m2(&self) -> f64 {
        self.counts.water as f64 * self.cell_area
    }

    pub fn land_m2(&self) -> f64 {
        self.counts.land as f64 * self.cell_area
    }

    pub fn land_in_zone_m2(&self) -> f64 {
        self.counts.land_in_zone as f64 * self.cell_area
    }

    pub fn unclassified_m2(&self) -> f64 {
        self.counts.unclassified as f64 * self.cell_area
    }
}

/// Count classes of `classes` over the cells where `study_area` is non-zero.
/// `zone` (non-zero = inside) further splits the land cells.
///
/// All three rasters must share one grid.
pub fn class_areas(classes: &Raster<u8>, study_area: &Raster<u8>, zone: &Raster<u8>) -> Result<ClassAreas> {
    for other in [study_area, zone] {
        if other.shape() != classes.shape() {
            return Err(Error::SizeMismatch {
                er: classes.rows(),
                ec: classes.cols(),
                ar: other.rows(),
                ac: other.cols(),
            });
        }
    }

    let (rows, cols) = classes.shape();
    let per_row: Vec<ClassCounts> = (0..rows)
        .into_par_iter()
        .map(|row| {
            let mut c = ClassCounts::default();
            for col in 0..cols {
                // SAFETY: all rasters are rows x cols
                let (class, inside, in_zone) = unsafe {
                    (
                        classes.get_unchecked(row, col),
                        study_area.get_unchecked(row, col),
                        zone.get_unchecked(row, col),
                    )
                };
                if inside == 0 {
                    continue;
                }
                match WaterClass::from_code(class) {
                    WaterClass::Water => c.water += 1,
                    WaterClass::Land => {
                        c.land += 1;
                        if in_zone != 0 {
                            c.land_in_zone += 1;
                        }
                    }
                    WaterClass::Unclassified => c.unclassified += 1,
                }
            }
            c
        })
        .collect();

    let counts = per_row.into_iter().fold(ClassCounts::default(), ClassCounts::add);
    Ok(ClassAreas { counts, cell_area: classes.transform().cell_area() })
}
