//! Text to raster, and raster to PNG bytes.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use tracing::debug;

use crate::builder::QRBuilder;
use crate::common::{ECLevel, QRResult};
use crate::error::{GenerateError, GenerateResult};
use crate::params::HexColor;

/// Light modules around the symbol on each side.
pub const MARGIN_MODULES: u32 = 1;

/// Fewest pixels per module a reader can resolve reliably.
pub const MIN_MODULE_PIXELS: u32 = 2;

/// Pixels per module when the requested size is too small for the symbol.
pub const FALLBACK_MODULE_PIXELS: u32 = 4;

/// Canvas side for a symbol spanning `modules` modules, margin included.
/// The requested size is kept while each module gets [`MIN_MODULE_PIXELS`].
pub fn canvas_size(requested: u32, modules: u32) -> u32 {
    if requested >= modules * MIN_MODULE_PIXELS {
        requested
    } else {
        modules * FALLBACK_MODULE_PIXELS
    }
}

/// Encodes `text` in the smallest symbol that fits and rasterises it onto a
/// `size` x `size` canvas. Dense symbols that don't fit in `size` pixels are
/// drawn at [`FALLBACK_MODULE_PIXELS`] per module instead.
pub fn encode_qr(
    text: &str,
    size: u32,
    color: HexColor,
    bg_color: HexColor,
    ec_level: ECLevel,
) -> QRResult<RgbaImage> {
    let qr = QRBuilder::new(text.as_bytes()).ec_level(ec_level).build()?;
    let modules = qr.width_with_margin(MARGIN_MODULES);
    let side = canvas_size(size, modules);
    if side != size {
        debug!(requested = size, side, modules, "Requested size too small, using fallback scale");
    }
    qr.render(side, MARGIN_MODULES, color.to_rgba(), bg_color.to_rgba())
}

pub fn encode_png(img: &RgbaImage) -> GenerateResult<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png).map_err(|e| GenerateError::composite("encode png", e))?;
    Ok(bytes.into_inner())
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::builder::builder_tests::decode_rgba;
    use crate::common::QRError;

    #[test]
    fn test_encode_qr_colors_and_size() {
        let fg = HexColor::rgb(0x12, 0x34, 0x56);
        let bg = HexColor::rgb(0xFE, 0xDC, 0xBA);
        let img = encode_qr("colors", 333, fg, bg, ECLevel::M).unwrap();
        assert_eq!(img.dimensions(), (333, 333));
        assert_eq!(*img.get_pixel(0, 0), Rgba([0xFE, 0xDC, 0xBA, 255]));
        assert!(img.pixels().all(|p| *p == fg.to_rgba() || *p == bg.to_rgba()));
        assert_eq!(decode_rgba(&img).1, "colors");
    }

    #[test]
    fn test_canvas_size() {
        assert_eq!(canvas_size(100, 23), 100);
        assert_eq!(canvas_size(100, 50), 100);
        assert_eq!(canvas_size(100, 51), 204);
        assert_eq!(canvas_size(100, 119), 476);
        assert_eq!(canvas_size(2048, 179), 2048);
    }

    #[test]
    fn test_encode_qr_dense_payload_at_min_size() {
        // Version 27 at H, 125 modules + margin
        let data = "a".repeat(600);
        let img = encode_qr(&data, 100, HexColor::BLACK, HexColor::WHITE, ECLevel::H).unwrap();
        assert_eq!(img.dimensions(), (127 * FALLBACK_MODULE_PIXELS, 127 * FALLBACK_MODULE_PIXELS));
        assert_eq!(decode_rgba(&img).1, data);
    }

    #[test]
    fn test_encode_qr_empty() {
        let err = encode_qr("", 200, HexColor::BLACK, HexColor::WHITE, ECLevel::H).unwrap_err();
        assert_eq!(err, QRError::EmptyData);
    }

    #[test]
    fn test_encode_png_signature() {
        let img = encode_qr("png", 120, HexColor::BLACK, HexColor::WHITE, ECLevel::L).unwrap();
        let bytes = encode_png(&img).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, img);
    }
}
