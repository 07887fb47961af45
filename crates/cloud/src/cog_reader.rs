//! Cloud Optimized GeoTIFF reader: header and directories from one prefetch,
//! tiles on demand through HTTP range requests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ndarray::Array2;
use tidemark_core::crs::CRS;
use tidemark_core::raster::{GeoTransform, Raster, RasterElement};
use tidemark_core::BBox;
use tracing::debug;

use crate::cache::{TileCache, TileKey};
use crate::decompress::{self, predictor};
use crate::error::{CloudError, Result};
use crate::geotiff_keys::{self, GeoReference};
use crate::http::HttpClient;
use crate::ifd::{self, tags, Endian, ImageInfo, TagSet};
use crate::tile_index::{self, TileWindow};

/// Bytes fetched up front; enough for the header and directories of a
/// typical COG.
const PREFETCH_LEN: u64 = 64 * 1024;

/// Tags whose out-of-line values are fetched while opening.
const RESOLVED_TAGS: &[u16] = &[
    tags::NEW_SUBFILE_TYPE,
    tags::IMAGE_WIDTH,
    tags::IMAGE_LENGTH,
    tags::BITS_PER_SAMPLE,
    tags::COMPRESSION,
    tags::SAMPLES_PER_PIXEL,
    tags::PLANAR_CONFIG,
    tags::PREDICTOR,
    tags::TILE_WIDTH,
    tags::TILE_LENGTH,
    tags::TILE_OFFSETS,
    tags::TILE_BYTE_COUNTS,
    tags::SAMPLE_FORMAT,
    tags::MODEL_PIXEL_SCALE,
    tags::MODEL_TIEPOINT,
    tags::MODEL_TRANSFORMATION,
    tags::GEO_KEY_DIRECTORY,
    tags::GDAL_NODATA,
];

#[derive(Debug, Clone)]
pub struct CogReaderOptions {
    /// Tile requests in flight at once (default 8)
    pub max_concurrent_fetches: usize,
    /// Decoded tiles kept in the LRU cache (default 64)
    pub cache_capacity: usize,
}

impl Default for CogReaderOptions {
    fn default() -> Self {
        Self { max_concurrent_fetches: 8, cache_capacity: 64 }
    }
}

#[derive(Debug, Clone)]
pub struct CogMetadata {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub bits_per_sample: u16,
    pub sample_format: u16,
    pub compression: u16,
    pub predictor: u16,
    pub geo_transform: GeoTransform,
    pub crs: Option<CRS>,
    pub nodata: Option<f64>,
    pub num_overviews: usize,
}

pub struct CogReader {
    url: String,
    client: HttpClient,
    endian: Endian,
    /// Full resolution first, then overviews; mask images are skipped.
    levels: Vec<ImageInfo>,
    georef: GeoReference,
    cache: TileCache,
    options: CogReaderOptions,
}

/// Bytes `[offset, offset + len)`, sliced from the prefetch when it covers them.
async fn bytes_at(client: &HttpClient, url: &str, prefetch: &[u8], offset: u64, len: usize) -> Result<Vec<u8>> {
    let start = offset as usize;
    match prefetch.get(start..start + len) {
        Some(slice) => Ok(slice.to_vec()),
        None => client.fetch_range(url, offset, len as u64).await,
    }
}

impl CogReader {
    pub async fn open(client: &HttpClient, url: &str, options: CogReaderOptions) -> Result<Self> {
        let prefetch = client.fetch_range(url, 0, PREFETCH_LEN).await?;
        let (endian, mut offset) = ifd::parse_header(&prefetch)?;

        let mut levels = Vec::new();
        let mut georef = None;
        let mut visited = HashSet::new();

        while offset != 0 {
            if !visited.insert(offset) {
                return Err(CloudError::InvalidTiff { reason: format!("directory loop at offset {offset}") });
            }
            let head = bytes_at(client, url, &prefetch, offset, 2).await?;
            let len = ifd::directory_len(endian, &head);
            let dir = ifd::parse_directory(endian, &bytes_at(client, url, &prefetch, offset, len).await?)?;

            let mut tag_set = TagSet::new(endian);
            for entry in dir.entries.iter().filter(|e| RESOLVED_TAGS.contains(&e.tag)) {
                let external = if entry.is_inline() {
                    None
                } else {
                    Some(bytes_at(client, url, &prefetch, entry.offset(endian), entry.byte_len() as usize).await?)
                };
                tag_set.insert(entry, external);
            }

            let info = ImageInfo::from_tags(&tag_set)?;
            if georef.is_none() {
                georef = Some(geotiff_keys::georeference(&tag_set)?);
            }
            if !info.is_mask {
                levels.push(info);
            }
            offset = dir.next_offset;
        }

        let (Some(georef), false) = (georef, levels.is_empty()) else {
            return Err(CloudError::InvalidTiff { reason: "no image directories".into() });
        };
        debug!(
            "Opened COG {} ({}x{}, {} overviews, compression {}, predictor {})",
            url,
            levels[0].width,
            levels[0].height,
            levels.len() - 1,
            levels[0].compression,
            levels[0].predictor
        );

        Ok(Self {
            url: url.to_string(),
            client: client.clone(),
            endian,
            levels,
            georef,
            cache: TileCache::new(options.cache_capacity),
            options,
        })
    }

    pub fn metadata(&self) -> CogMetadata {
        let full = &self.levels[0];
        CogMetadata {
            url: self.url.clone(),
            width: full.width,
            height: full.height,
            tile_width: full.tile_width,
            tile_height: full.tile_height,
            bits_per_sample: full.bits_per_sample,
            sample_format: full.sample_format,
            compression: full.compression,
            predictor: full.predictor,
            geo_transform: self.georef.transform,
            crs: self.georef.crs.clone(),
            nodata: self.georef.nodata,
            num_overviews: self.levels.len() - 1,
        }
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.georef.crs.as_ref()
    }

    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.stats()
    }

    fn level_transform(&self, level: usize) -> GeoTransform {
        let (full, ovr) = (&self.levels[0], &self.levels[level]);
        self.georef
            .transform
            .scaled(full.width as f64 / ovr.width as f64, full.height as f64 / ovr.height as f64)
    }

    /// Coarsest level whose pixels are no larger than `cell_size`.
    pub fn level_for_resolution(&self, cell_size: f64) -> usize {
        let widths: Vec<u32> = self.levels.iter().map(|l| l.width).collect();
        tile_index::level_for_resolution(&widths, self.georef.transform.cell_size(), cell_size)
    }

    /// Read the pixels of `level` covering `bbox` (in the image CRS).
    pub async fn read_bbox<T: RasterElement>(&mut self, bbox: &BBox, level: usize) -> Result<Raster<T>> {
        let info = self
            .levels
            .get(level)
            .cloned()
            .ok_or_else(|| CloudError::InvalidTiff { reason: format!("no image level {level}") })?;
        if info.planar_config != 1 {
            return Err(CloudError::UnsupportedPlanarConfig(info.planar_config));
        }
        if info.samples_per_pixel != 1 {
            return Err(CloudError::InvalidTiff {
                reason: format!("{} samples per pixel; single-band images only", info.samples_per_pixel),
            });
        }
        let gt = self.level_transform(level);
        let window = tile_index::window_for_bbox(bbox, &gt, info.width, info.height, info.tile_width, info.tile_height)
            .ok_or(CloudError::BBoxOutside)?;

        let tiles = self.load_tiles(level, &info, &window).await?;
        Ok(self.assemble(&info, &gt, &window, &tiles))
    }

    async fn load_tiles(
        &mut self,
        level: usize,
        info: &ImageInfo,
        window: &TileWindow,
    ) -> Result<HashMap<usize, Arc<Vec<f32>>>> {
        let mut tiles = HashMap::new();
        let mut missing = Vec::new();
        for t in &window.tiles {
            let key = TileKey { level, tile: t.index };
            match self.cache.get(&key) {
                Some(samples) => {
                    tiles.insert(t.index, samples);
                }
                None => {
                    let len = info.tile_byte_counts.get(t.index).copied().unwrap_or(0);
                    if len > 0 {
                        missing.push((t.index, info.tile_offsets[t.index], len));
                    }
                }
            }
        }

        let ranges: Vec<(u64, u64)> = missing.iter().map(|&(_, o, l)| (o, l)).collect();
        let fetched = self.client.fetch_ranges(&self.url, &ranges, self.options.max_concurrent_fetches).await?;

        let bps = info.bytes_per_sample();
        let raw_len = info.tile_width as usize * info.tile_height as usize * bps;
        for ((index, _, _), compressed) in missing.into_iter().zip(fetched) {
            let mut raw = decompress::decompress_tile(&compressed, info.compression, raw_len)?;
            match info.predictor {
                predictor::NONE => {}
                predictor::HORIZONTAL => {
                    decompress::undo_horizontal_predictor(&mut raw, info.tile_width as usize, bps, self.endian)?
                }
                other => return Err(CloudError::UnsupportedPredictor(other)),
            }
            let samples = decompress::decode_samples(&raw, info.bits_per_sample, info.sample_format, self.endian)?;
            let samples = self.cache.insert(TileKey { level, tile: index }, samples);
            tiles.insert(index, samples);
        }
        Ok(tiles)
    }

    fn assemble<T: RasterElement>(
        &self,
        info: &ImageInfo,
        gt: &GeoTransform,
        window: &TileWindow,
        tiles: &HashMap<usize, Arc<Vec<f32>>>,
    ) -> Raster<T> {
        let nodata: Option<T> = self.georef.nodata.and_then(num_traits::cast);
        let fill = nodata.unwrap_or_else(T::default_nodata);
        let mut out = Array2::from_elem(window.shape(), fill);
        let (tw, th) = (info.tile_width as usize, info.tile_height as usize);

        for t in &window.tiles {
            let Some(samples) = tiles.get(&t.index) else {
                continue;
            };
            let (x0, y0) = (t.col * tw, t.row * th);
            let rows = y0.max(window.row_min)..(y0 + th).min(window.row_max);
            let cols = x0.max(window.col_min)..(x0 + tw).min(window.col_max);
            for img_row in rows {
                for img_col in cols.clone() {
                    let Some(&v) = samples.get((img_row - y0) * tw + (img_col - x0)) else {
                        continue;
                    };
                    out[(img_row - window.row_min, img_col - window.col_min)] = num_traits::cast(v).unwrap_or(fill);
                }
            }
        }

        let mut raster = Raster::from_array(out);
        raster.set_transform(gt.window(window.col_min, window.row_min));
        raster.set_crs(self.georef.crs.clone());
        raster.set_nodata(nodata);
        raster
    }
}
