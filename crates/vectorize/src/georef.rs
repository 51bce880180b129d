use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tiff::decoder::Decoder;
use tiff::tags::Tag;

use crate::error::{Result, VectorizeError};

/// GeoKey ids carrying the EPSG code of a raster's CRS.
const GEOGRAPHIC_TYPE_GEO_KEY: u32 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u32 = 3072;

/// GeoKey value meaning "user defined", which names no EPSG code.
const USER_DEFINED: u32 = 32767;

/// Affine pixel→geographic transform, coefficients in GDAL order:
/// `x = c0 + col·c1 + row·c2`, `y = c3 + col·c4 + row·c5`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform([f64; 6]);

impl GeoTransform {
    pub fn new(coefficients: [f64; 6]) -> Self {
        Self(coefficients)
    }

    /// Unit transform mapping pixel indices straight to coordinates.
    pub fn identity() -> Self {
        Self([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    /// Build from GeoTIFF ModelPixelScale and ModelTiepoint values. The
    /// tiepoint anchors raster position `(i, j)` at model `(gx, gy)`; the y
    /// coefficient is negated because north-up rasters store row 0 at the
    /// top.
    pub fn from_scale_and_tiepoint(scale_x: f64, scale_y: f64, tiepoint: &[f64; 6]) -> Self {
        let [i, j, _, gx, gy, _] = *tiepoint;
        Self([
            gx - i * scale_x,
            scale_x,
            0.0,
            gy + j * scale_y,
            0.0,
            -scale_y,
        ])
    }

    /// Map a pixel to geographic coordinates using the pixel-center
    /// convention: the sample point is the middle of the cell, not its
    /// top-left corner.
    pub fn xy(&self, col: f64, row: f64) -> (f64, f64) {
        let c = &self.0;
        let (col, row) = (col + 0.5, row + 0.5);
        (
            c[0] + col * c[1] + row * c[2],
            c[3] + col * c[4] + row * c[5],
        )
    }

    pub fn coefficients(&self) -> [f64; 6] {
        self.0
    }
}

/// Georeference of a raster: its affine transform plus, when the GeoKey
/// directory names one, the EPSG code of its CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoReference {
    pub transform: GeoTransform,
    pub epsg: Option<u32>,
}

impl GeoReference {
    /// Read the transform and CRS from a GeoTIFF's metadata tags.
    ///
    /// Fails when the file cannot be decoded or carries no georeference;
    /// without a transform, reconstructed coordinates would live in no
    /// meaningful space.
    pub fn from_tiff(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?;

        let transform = read_transform(&mut decoder)
            .ok_or_else(|| VectorizeError::MissingGeoreference(path.to_path_buf()))?;
        let epsg = read_epsg(&mut decoder);

        Ok(Self { transform, epsg })
    }
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)
        .ok()
        .flatten()
        .and_then(|value| value.into_f64_vec().ok())
        .filter(|scale| scale.len() >= 2)?;
    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)
        .ok()
        .flatten()
        .and_then(|value| value.into_f64_vec().ok())
        .filter(|tie| tie.len() >= 6)?;

    let tiepoint: [f64; 6] = [
        tiepoint[0], tiepoint[1], tiepoint[2], tiepoint[3], tiepoint[4], tiepoint[5],
    ];
    Some(GeoTransform::from_scale_and_tiepoint(
        scale[0], scale[1], &tiepoint,
    ))
}

/// EPSG code from the GeoKey directory. Key entries are quadruples
/// `(key id, location, count, value)` after the four-value header; codes of
/// interest are stored inline (location 0, count 1). A projected CRS wins
/// over a geographic one when both are present.
fn read_epsg<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<u32> {
    let directory = decoder
        .find_tag(Tag::GeoKeyDirectoryTag)
        .ok()
        .flatten()
        .and_then(|value| value.into_u32_vec().ok())?;

    let mut projected = None;
    let mut geographic = None;
    for entry in directory.get(4..).unwrap_or(&[]).chunks_exact(4) {
        if entry[1] != 0 || entry[2] != 1 {
            continue;
        }
        match entry[0] {
            PROJECTED_CS_TYPE_GEO_KEY => projected = Some(entry[3]),
            GEOGRAPHIC_TYPE_GEO_KEY => geographic = Some(entry[3]),
            _ => {}
        }
    }

    projected
        .or(geographic)
        .filter(|&code| code != 0 && code != USER_DEFINED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::encoder::{TiffEncoder, colortype};

    fn write_geotiff(
        path: &Path,
        scale: Option<[f64; 3]>,
        tiepoint: Option<[f64; 6]>,
        epsg: Option<u16>,
    ) {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder.new_image::<colortype::Gray8>(4, 4).unwrap();
        if let Some(scale) = scale {
            image
                .encoder()
                .write_tag(Tag::ModelPixelScaleTag, &scale[..])
                .unwrap();
        }
        if let Some(tie) = tiepoint {
            image
                .encoder()
                .write_tag(Tag::ModelTiepointTag, &tie[..])
                .unwrap();
        }
        if let Some(code) = epsg {
            let directory: [u16; 8] = [1, 1, 0, 1, 3072, 0, 1, code];
            image
                .encoder()
                .write_tag(Tag::GeoKeyDirectoryTag, &directory[..])
                .unwrap();
        }
        image.write_data(&[0u8; 16]).unwrap();
    }

    #[test]
    fn transform_and_epsg_round_trip_through_tags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ortho.tif");
        write_geotiff(
            &path,
            Some([2.0, 2.0, 0.0]),
            Some([0.0, 0.0, 0.0, 100.0, 200.0, 0.0]),
            Some(31983),
        );

        let georef = GeoReference::from_tiff(&path).unwrap();
        assert_eq!(
            georef.transform.coefficients(),
            [100.0, 2.0, 0.0, 200.0, 0.0, -2.0]
        );
        assert_eq!(georef.epsg, Some(31983));
    }

    #[test]
    fn pixel_center_convention_offsets_by_half_a_cell() {
        let transform = GeoTransform::from_scale_and_tiepoint(
            2.0,
            2.0,
            &[0.0, 0.0, 0.0, 100.0, 200.0, 0.0],
        );
        assert_eq!(transform.xy(0.0, 0.0), (101.0, 199.0));
        assert_eq!(transform.xy(9.0, 4.0), (119.0, 191.0));
    }

    #[test]
    fn identity_transform_keeps_pixel_centers() {
        let (x, y) = GeoTransform::identity().xy(5.0, 7.0);
        assert_eq!((x, y), (5.5, 7.5));
    }

    #[test]
    fn missing_georeference_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.tif");
        write_geotiff(&path, None, None, None);

        let result = GeoReference::from_tiff(&path);
        assert!(matches!(
            result,
            Err(VectorizeError::MissingGeoreference(_))
        ));
    }

    #[test]
    fn unreadable_raster_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.tif");
        std::fs::write(&path, b"not a tiff").unwrap();

        assert!(GeoReference::from_tiff(&path).is_err());
    }

    #[test]
    fn nonexistent_raster_is_fatal() {
        assert!(GeoReference::from_tiff(Path::new("/no/such/ortho.tif")).is_err());
    }
}
