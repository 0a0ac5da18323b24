//! Image metadata extractor.
//!
//! Records the basic raster properties (format, color mode, dimensions),
//! dominant-color and brightness summaries for RGB images, and a normalized
//! view of the EXIF block when one is present.

use crate::document::Fragment;
use crate::registry::MetadataExtractor;
use crate::{Result, SpawnError};
use exif::{In, Tag, Value as ExifValue};
use image::{ColorType, DynamicImage, ImageReader};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, error};

const MAX_COLORS: usize = 5;
const COLOR_SAMPLE_SIZE: u32 = 100;

/// Extract metadata from image files.
pub struct ImageExtractor {
    extract_exif: bool,
    extract_colors: bool,
}

impl ImageExtractor {
    pub fn new() -> Self {
        Self {
            extract_exif: true,
            extract_colors: true,
        }
    }

    /// Control EXIF and color analysis independently.
    pub fn with_options(extract_exif: bool, extract_colors: bool) -> Self {
        Self {
            extract_exif,
            extract_colors,
        }
    }
}

impl Default for ImageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor for ImageExtractor {
    fn name(&self) -> &str {
        "image-extractor"
    }

    fn supported_extensions(&self) -> &[&str] {
        &[
            ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".tif", ".webp", ".svg", ".ico",
            ".heic", ".heif",
        ]
    }

    fn supported_mime_prefixes(&self) -> &[&str] {
        &["image/"]
    }

    fn extract(&self, path: &Path) -> Result<Fragment> {
        let mut fragment = Fragment::new();

        if let Err(e) = self.extract_impl(path, &mut fragment) {
            error!(path = %path.display(), error = %e, "error extracting image metadata");
            fragment.insert("error".to_string(), json!(e.to_string()));
        }

        Ok(fragment)
    }
}

impl ImageExtractor {
    fn extract_impl(&self, path: &Path, fragment: &mut Fragment) -> Result<()> {
        let reader = ImageReader::open(path)?
            .with_guessed_format()
            .map_err(|e| SpawnError::parsing(format!("Failed to read image format: {}", e)))?;

        let format = reader.format();
        let img = reader
            .decode()
            .map_err(|e| SpawnError::parsing(format!("Failed to decode image: {}", e)))?;

        let width = img.width();
        let height = img.height();

        fragment.insert(
            "format".to_string(),
            format
                .map(|f| json!(format!("{:?}", f).to_uppercase()))
                .unwrap_or(Value::Null),
        );
        fragment.insert("mode".to_string(), json!(color_mode(img.color())));
        fragment.insert("width".to_string(), json!(width));
        fragment.insert("height".to_string(), json!(height));
        fragment.insert(
            "aspect_ratio".to_string(),
            if height > 0 {
                json!(round_to(width as f64 / height as f64, 3))
            } else {
                Value::Null
            },
        );

        let exif = if self.extract_exif { read_exif(path) } else { None };

        fragment.insert(
            "resolution".to_string(),
            exif.as_ref().and_then(resolution_from_exif).unwrap_or(Value::Null),
        );
        fragment.insert("pixel_count".to_string(), json!(width as u64 * height as u64));

        if self.extract_colors && matches!(img.color(), ColorType::Rgb8 | ColorType::Rgba8) {
            fragment.insert("color_info".to_string(), extract_color_info(&img));
        }

        if let Some(exif) = exif {
            fragment.insert("exif".to_string(), process_exif(&exif));
        }

        Ok(())
    }
}

fn color_mode(color: ColorType) -> String {
    match color {
        ColorType::L8 => "L".to_string(),
        ColorType::La8 => "LA".to_string(),
        ColorType::Rgb8 => "RGB".to_string(),
        ColorType::Rgba8 => "RGBA".to_string(),
        ColorType::L16 => "I;16".to_string(),
        ColorType::La16 => "LA;16".to_string(),
        ColorType::Rgb16 => "RGB;16".to_string(),
        ColorType::Rgba16 => "RGBA;16".to_string(),
        other => format!("{:?}", other),
    }
}

/// Downscale to a bounded thumbnail and summarize the color distribution.
fn extract_color_info(img: &DynamicImage) -> Value {
    let thumb = img.thumbnail(COLOR_SAMPLE_SIZE, COLOR_SAMPLE_SIZE).to_rgb8();
    let total_pixels = (thumb.width() as usize) * (thumb.height() as usize);
    if total_pixels == 0 {
        return json!({});
    }

    // Insertion order makes `most common` ties deterministic.
    let mut counts: IndexMap<[u8; 3], usize> = IndexMap::new();
    for pixel in thumb.pixels() {
        *counts.entry(pixel.0).or_insert(0) += 1;
    }

    let mut ranked: Vec<([u8; 3], usize)> = counts.iter().map(|(c, n)| (*c, *n)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let dominant_colors: Vec<Value> = ranked
        .iter()
        .take(MAX_COLORS)
        .map(|(color, count)| {
            json!({
                "rgb": [color[0], color[1], color[2]],
                "hex": format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2]),
                "percentage": round_to(*count as f64 / total_pixels as f64 * 100.0, 2),
            })
        })
        .collect();

    let mut r_sum = 0u64;
    let mut g_sum = 0u64;
    let mut b_sum = 0u64;
    for (color, count) in &counts {
        r_sum += color[0] as u64 * *count as u64;
        g_sum += color[1] as u64 * *count as u64;
        b_sum += color[2] as u64 * *count as u64;
    }

    let avg_r = (r_sum as f64 / total_pixels as f64).round() as u8;
    let avg_g = (g_sum as f64 / total_pixels as f64).round() as u8;
    let avg_b = (b_sum as f64 / total_pixels as f64).round() as u8;

    let brightness = (0.299 * avg_r as f64 + 0.587 * avg_g as f64 + 0.114 * avg_b as f64) / 255.0;

    json!({
        "dominant_colors": dominant_colors,
        "average_color": {
            "rgb": [avg_r, avg_g, avg_b],
            "hex": format!("#{:02x}{:02x}{:02x}", avg_r, avg_g, avg_b),
        },
        "brightness": round_to(brightness, 2),
    })
}

fn read_exif(path: &Path) -> Option<exif::Exif> {
    let file = std::fs::File::open(path).ok()?;
    match exif::Reader::new().read_from_container(&mut BufReader::new(file)) {
        Ok(exif) => Some(exif),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no EXIF data");
            None
        }
    }
}

fn resolution_from_exif(exif: &exif::Exif) -> Option<Value> {
    let x = rational_value(exif, Tag::XResolution)?;
    let y = rational_value(exif, Tag::YResolution)?;
    Some(json!([x, y]))
}

/// Normalize the EXIF block into `{common, raw}`.
fn process_exif(exif: &exif::Exif) -> Value {
    let mut raw = Map::new();
    for field in exif.fields() {
        raw.insert(format!("{}", field.tag), json!(field.display_value().to_string()));
    }

    let mut common = Map::new();

    if let Some(make) = ascii_value(exif, Tag::Make) {
        common.insert("camera_make".to_string(), json!(make));
    }
    if let Some(model) = ascii_value(exif, Tag::Model) {
        common.insert("camera_model".to_string(), json!(model));
    }
    if let Some(taken) = ascii_value(exif, Tag::DateTimeOriginal) {
        common.insert("date_taken".to_string(), json!(taken));
    }
    if let Some(exposure) = rational_value(exif, Tag::ExposureTime) {
        common.insert("exposure_time".to_string(), json!(exposure));
    }
    if let Some(f_number) = rational_value(exif, Tag::FNumber) {
        common.insert("f_number".to_string(), json!(format!("f/{}", f_number)));
    }
    if let Some(iso) = uint_value(exif, Tag::PhotographicSensitivity) {
        common.insert("iso".to_string(), json!(iso));
    }
    if let Some(focal) = rational_value(exif, Tag::FocalLength) {
        common.insert("focal_length".to_string(), json!(format!("{}mm", focal)));
    }

    let gps = extract_gps(exif);
    if !gps.is_empty() {
        common.insert("gps".to_string(), Value::Object(gps));
    }

    json!({"common": common, "raw": raw})
}

/// Convert degree/minute/second tuples plus hemisphere references into
/// signed decimal degrees.
fn extract_gps(exif: &exif::Exif) -> Map<String, Value> {
    let mut gps = Map::new();

    if let (Some(dms), Some(reference)) = (
        rational_triplet(exif, Tag::GPSLatitude),
        ascii_value(exif, Tag::GPSLatitudeRef),
    ) {
        let mut latitude = dms[0] + dms[1] / 60.0 + dms[2] / 3600.0;
        if reference == "S" {
            latitude = -latitude;
        }
        gps.insert("latitude".to_string(), json!(round_to(latitude, 6)));
    }

    if let (Some(dms), Some(reference)) = (
        rational_triplet(exif, Tag::GPSLongitude),
        ascii_value(exif, Tag::GPSLongitudeRef),
    ) {
        let mut longitude = dms[0] + dms[1] / 60.0 + dms[2] / 3600.0;
        if reference == "W" {
            longitude = -longitude;
        }
        gps.insert("longitude".to_string(), json!(round_to(longitude, 6)));
    }

    if let Some(altitude) = rational_value(exif, Tag::GPSAltitude) {
        let mut altitude = altitude;
        // GPSAltitudeRef 1 means below sea level.
        if let Some(field) = exif.get_field(Tag::GPSAltitudeRef, In::PRIMARY) {
            if field.value.get_uint(0) == Some(1) {
                altitude = -altitude;
            }
        }
        gps.insert("altitude".to_string(), json!(round_to(altitude, 2)));
    }

    gps
}

fn ascii_value(exif: &exif::Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        ExifValue::Ascii(chunks) => chunks.first().map(|chunk| {
            String::from_utf8_lossy(chunk)
                .trim_end_matches('\0')
                .trim()
                .to_string()
        }),
        _ => None,
    }
}

fn rational_value(exif: &exif::Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        ExifValue::Rational(values) => values.first().map(|r| r.to_f64()),
        ExifValue::SRational(values) => values.first().map(|r| r.to_f64()),
        _ => None,
    }
}

fn rational_triplet(exif: &exif::Exif, tag: Tag) -> Option<[f64; 3]> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        ExifValue::Rational(values) if values.len() == 3 => {
            Some([values[0].to_f64(), values[1].to_f64(), values[2].to_f64()])
        }
        _ => None,
    }
}

fn uint_value(exif: &exif::Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
    use tempfile::tempdir;

    fn write_image(
        dir: &tempfile::TempDir,
        name: &str,
        width: u32,
        height: u32,
        pixel: [u8; 3],
    ) -> std::path::PathBuf {
        let img: RgbImage = ImageBuffer::from_pixel(width, height, Rgb(pixel));
        let path = dir.path().join(name);
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    #[test]
    fn test_basic_properties() {
        let dir = tempdir().unwrap();
        let path = write_image(&dir, "img.png", 4, 2, [10, 20, 30]);

        let fragment = ImageExtractor::new().extract(&path).unwrap();
        assert_eq!(fragment["format"], "PNG");
        assert_eq!(fragment["mode"], "RGB");
        assert_eq!(fragment["width"], 4);
        assert_eq!(fragment["height"], 2);
        assert_eq!(fragment["aspect_ratio"], 2.0);
        assert_eq!(fragment["pixel_count"], 8);
        assert_eq!(fragment["resolution"], Value::Null);
    }

    #[test]
    fn test_uniform_white_brightness() {
        let dir = tempdir().unwrap();
        let path = write_image(&dir, "white.png", 2, 2, [255, 255, 255]);

        let fragment = ImageExtractor::new().extract(&path).unwrap();
        let color_info = &fragment["color_info"];
        assert_eq!(color_info["average_color"]["rgb"], json!([255, 255, 255]));
        assert_eq!(color_info["brightness"], 1.0);
        assert_eq!(color_info["dominant_colors"][0]["percentage"], 100.0);
        assert_eq!(color_info["dominant_colors"][0]["hex"], "#ffffff");
    }

    #[test]
    fn test_dominant_colors_ranked() {
        let dir = tempdir().unwrap();
        let mut img: RgbImage = ImageBuffer::from_pixel(4, 1, Rgb([255, 0, 0]));
        img.put_pixel(3, 0, Rgb([0, 0, 255]));
        let path = dir.path().join("two.png");
        img.save_with_format(&path, ImageFormat::Png).unwrap();

        let fragment = ImageExtractor::new().extract(&path).unwrap();
        let dominant = fragment["color_info"]["dominant_colors"].as_array().unwrap();
        assert_eq!(dominant.len(), 2);
        assert_eq!(dominant[0]["rgb"], json!([255, 0, 0]));
        assert_eq!(dominant[0]["percentage"], 75.0);
        assert_eq!(dominant[1]["percentage"], 25.0);
    }

    #[test]
    fn test_unreadable_image_reports_error_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image at all").unwrap();

        let fragment = ImageExtractor::new().extract(&path).unwrap();
        assert!(fragment.get("error").is_some());
    }

    #[test]
    fn test_can_handle() {
        let extractor = ImageExtractor::new();
        assert!(extractor.can_handle(Path::new("photo.JPG")));
        assert!(extractor.can_handle(Path::new("photo.webp")));
        assert!(!extractor.can_handle(Path::new("notes.txt")));
    }
}
