//! Request parameters and their validation.
//!
//! [`RequestParams`] mirrors a query string: every field is an optional string
//! and an empty string counts as absent. [`RequestParams::validate`] applies
//! the defaults and produces an immutable [`GenerationRequest`].

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use image::Rgba;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::ECLevel;
use crate::error::{GenerateError, GenerateResult};

pub const MIN_SIZE: u32 = 100;
pub const MAX_SIZE: u32 = 2048;
pub const DEFAULT_SIZE: u32 = 512;

pub const MIN_LOGO_SIZE: u32 = 10;
pub const MAX_LOGO_SIZE: u32 = 40;
pub const DEFAULT_LOGO_SIZE: u32 = 20;

pub const DEFAULT_LOGO_PADDING: u32 = 20;

// Hex color
//------------------------------------------------------------------------------

/// An opaque RGB color written as six hex digits, `#` optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor([u8; 3]);

impl HexColor {
    pub const BLACK: HexColor = HexColor([0, 0, 0]);
    pub const WHITE: HexColor = HexColor([0xFF, 0xFF, 0xFF]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        let [r, g, b] = self.0;
        Rgba([r, g, b, 255])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid hex color {0:?}, expected six hex digits")]
pub struct ParseHexColorError(String);

impl FromStr for HexColor {
    type Err = ParseHexColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let reject = || ParseHexColorError(s.to_string());
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(reject());
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| reject());
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl Display for HexColor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02X}{g:02X}{b:02X}")
    }
}

// Raw parameters
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestParams {
    pub data: Option<String>,
    pub logo_url: Option<String>,
    pub color: Option<String>,
    pub bg_color: Option<String>,
    pub size: Option<String>,
    pub logo_size: Option<String>,
    pub error_correction_level: Option<String>,
    pub logo_bg_color: Option<String>,
    pub logo_padding: Option<String>,
}

impl RequestParams {
    pub fn with_data(data: impl Into<String>) -> Self {
        Self { data: Some(data.into()), ..Default::default() }
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

// Validated request
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub data: String,
    pub color: HexColor,
    pub bg_color: HexColor,
    pub size: u32,
    pub ec_level: ECLevel,
    pub logo_url: Option<String>,
    pub logo_size: u32,
    pub logo_bg_color: HexColor,
    pub logo_padding: u32,
}

impl RequestParams {
    /// Checks every parameter in a fixed order and reports the first problem.
    pub fn validate(&self) -> GenerateResult<GenerationRequest> {
        let data = match present(&self.data) {
            Some(d) if !d.trim().is_empty() => d.to_string(),
            _ => return Err(invalid("Parameter \"data\" is required and cannot be empty")),
        };

        let size = parse_bounded(&self.size, MIN_SIZE, MAX_SIZE, DEFAULT_SIZE)
            .ok_or_else(|| invalid("Parameter \"size\" must be a number between 100 and 2048"))?;

        let logo_size = parse_bounded(&self.logo_size, MIN_LOGO_SIZE, MAX_LOGO_SIZE, DEFAULT_LOGO_SIZE)
            .ok_or_else(|| {
                invalid("Parameter \"logoSize\" must be a number between 10 and 40 (percentage)")
            })?;

        let ec_level = match present(&self.error_correction_level) {
            Some(s) => s
                .parse::<ECLevel>()
                .map_err(|_| invalid("Parameter \"errorCorrectionLevel\" must be one of: L, M, Q, H"))?,
            None => ECLevel::H,
        };

        let color = parse_color(&self.color, HexColor::BLACK).ok_or_else(|| {
            invalid("Parameter \"color\" must be a valid hex color (e.g., #000000 or 000000)")
        })?;
        let bg_color = parse_color(&self.bg_color, HexColor::WHITE).ok_or_else(|| {
            invalid("Parameter \"bgColor\" must be a valid hex color (e.g., #FFFFFF or FFFFFF)")
        })?;

        let logo_url = match present(&self.logo_url) {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                Some(url.to_string())
            }
            Some(_) => return Err(invalid("Parameter \"logoUrl\" must be a valid HTTP/HTTPS URL")),
            None => None,
        };

        let logo_bg_color = parse_color(&self.logo_bg_color, HexColor::WHITE).ok_or_else(|| {
            invalid("Parameter \"logoBgColor\" must be a valid hex color (e.g., #FFFFFF or FFFFFF)")
        })?;
        let logo_padding = match present(&self.logo_padding) {
            Some(s) => s
                .trim()
                .parse::<u32>()
                .map_err(|_| invalid("Parameter \"logoPadding\" must be a non-negative integer"))?,
            None => DEFAULT_LOGO_PADDING,
        };

        Ok(GenerationRequest {
            data,
            color,
            bg_color,
            size,
            ec_level,
            logo_url,
            logo_size,
            logo_bg_color,
            logo_padding,
        })
    }
}

fn invalid(message: &str) -> GenerateError {
    GenerateError::validation(message)
}

fn parse_bounded(field: &Option<String>, min: u32, max: u32, default: u32) -> Option<u32> {
    match present(field) {
        Some(s) => s.trim().parse::<u32>().ok().filter(|v| (min..=max).contains(v)),
        None => Some(default),
    }
}

fn parse_color(field: &Option<String>, default: HexColor) -> Option<HexColor> {
    match present(field) {
        Some(s) => s.parse().ok(),
        None => Some(default),
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::error::ErrorKind;

    fn with(f: impl FnOnce(&mut RequestParams)) -> RequestParams {
        let mut params = RequestParams::with_data("hello");
        f(&mut params);
        params
    }

    fn message(params: &RequestParams) -> String {
        let err = params.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        err.to_string()
    }

    #[test]
    fn test_defaults() {
        let req = RequestParams::with_data("hello").validate().unwrap();
        assert_eq!(req.data, "hello");
        assert_eq!(req.color, HexColor::BLACK);
        assert_eq!(req.bg_color, HexColor::WHITE);
        assert_eq!(req.size, 512);
        assert_eq!(req.ec_level, ECLevel::H);
        assert_eq!(req.logo_url, None);
        assert_eq!(req.logo_size, 20);
        assert_eq!(req.logo_bg_color, HexColor::WHITE);
        assert_eq!(req.logo_padding, 20);
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let params = with(|p| {
            p.size = Some(String::new());
            p.color = Some(String::new());
            p.logo_url = Some(String::new());
        });
        let req = params.validate().unwrap();
        assert_eq!(req.size, 512);
        assert_eq!(req.color, HexColor::BLACK);
        assert_eq!(req.logo_url, None);
    }

    #[test_case(None)]
    #[test_case(Some(""))]
    #[test_case(Some("   \t\n"))]
    fn test_missing_data(data: Option<&str>) {
        let params = RequestParams { data: data.map(str::to_string), ..Default::default() };
        assert_eq!(message(&params), "Parameter \"data\" is required and cannot be empty");
    }

    #[test_case("99", false)]
    #[test_case("100", true)]
    #[test_case("2048", true)]
    #[test_case("2049", false)]
    #[test_case("abc", false)]
    #[test_case("-5", false)]
    #[test_case("512.5", false)]
    fn test_size_bounds(size: &str, ok: bool) {
        let params = with(|p| p.size = Some(size.to_string()));
        match ok {
            true => assert_eq!(params.validate().unwrap().size.to_string(), size),
            false => {
                assert_eq!(message(&params), "Parameter \"size\" must be a number between 100 and 2048")
            }
        }
    }

    #[test_case("9", false)]
    #[test_case("10", true)]
    #[test_case("40", true)]
    #[test_case("41", false)]
    fn test_logo_size_bounds(logo_size: &str, ok: bool) {
        let params = with(|p| p.logo_size = Some(logo_size.to_string()));
        assert_eq!(params.validate().is_ok(), ok);
    }

    #[test_case("l", ECLevel::L)]
    #[test_case("M", ECLevel::M)]
    #[test_case("q", ECLevel::Q)]
    #[test_case("H", ECLevel::H)]
    fn test_ec_level(level: &str, expected: ECLevel) {
        let params = with(|p| p.error_correction_level = Some(level.to_string()));
        assert_eq!(params.validate().unwrap().ec_level, expected);
    }

    #[test]
    fn test_bad_ec_level() {
        let params = with(|p| p.error_correction_level = Some("X".to_string()));
        assert_eq!(message(&params), "Parameter \"errorCorrectionLevel\" must be one of: L, M, Q, H");
    }

    #[test_case("#1a2B3c", Some(HexColor::rgb(0x1A, 0x2B, 0x3C)))]
    #[test_case("1A2B3C", Some(HexColor::rgb(0x1A, 0x2B, 0x3C)))]
    #[test_case("#FFF", None)]
    #[test_case("#GGGGGG", None)]
    #[test_case("##123456", None)]
    #[test_case("1234567", None)]
    fn test_hex_color(input: &str, expected: Option<HexColor>) {
        assert_eq!(input.parse::<HexColor>().ok(), expected);
    }

    #[test]
    fn test_hex_color_error() {
        let err = "#12G456".parse::<HexColor>().unwrap_err();
        assert_eq!(err, ParseHexColorError("#12G456".to_string()));
        assert_eq!(err.to_string(), "Invalid hex color \"#12G456\", expected six hex digits");
    }

    #[test]
    fn test_hex_color_display() {
        assert_eq!(HexColor::rgb(0x0A, 0xBC, 0xFF).to_string(), "#0ABCFF");
        assert_eq!(HexColor::WHITE.to_rgba(), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_color_messages() {
        let params = with(|p| p.color = Some("red".to_string()));
        assert_eq!(
            message(&params),
            "Parameter \"color\" must be a valid hex color (e.g., #000000 or 000000)"
        );
        let params = with(|p| p.bg_color = Some("#12345".to_string()));
        assert_eq!(
            message(&params),
            "Parameter \"bgColor\" must be a valid hex color (e.g., #FFFFFF or FFFFFF)"
        );
        let params = with(|p| p.logo_bg_color = Some("nope".to_string()));
        assert!(message(&params).starts_with("Parameter \"logoBgColor\""));
    }

    #[test_case("http://example.com/logo.png", true)]
    #[test_case("https://example.com/logo.png", true)]
    #[test_case("ftp://x/y.png", false)]
    #[test_case("example.com/logo.png", false)]
    fn test_logo_url_scheme(url: &str, ok: bool) {
        let params = with(|p| p.logo_url = Some(url.to_string()));
        match ok {
            true => assert_eq!(params.validate().unwrap().logo_url.as_deref(), Some(url)),
            false => assert_eq!(message(&params), "Parameter \"logoUrl\" must be a valid HTTP/HTTPS URL"),
        }
    }

    #[test_case("0", Some(0))]
    #[test_case("35", Some(35))]
    #[test_case("-1", None)]
    #[test_case("ten", None)]
    fn test_logo_padding(padding: &str, expected: Option<u32>) {
        let params = with(|p| p.logo_padding = Some(padding.to_string()));
        assert_eq!(params.validate().ok().map(|r| r.logo_padding), expected);
    }

    #[test]
    fn test_first_error_wins() {
        let params = with(|p| {
            p.size = Some("1".to_string());
            p.color = Some("bad".to_string());
        });
        assert!(message(&params).contains("\"size\""));
    }

    #[test]
    fn test_deserialize_query() {
        let params: RequestParams =
            serde_json::from_str(r#"{"data":"x","logoUrl":"https://a/b.png","errorCorrectionLevel":"m"}"#)
                .unwrap();
        assert_eq!(params.logo_url.as_deref(), Some("https://a/b.png"));
        assert_eq!(params.validate().unwrap().ec_level, ECLevel::M);
    }
}
