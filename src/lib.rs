//! # qrcraft
//!
//! QR code image generation with Reed-Solomon error correction, remote logo
//! overlays and a two-partition artifact cache.
//!
//! ## Features
//!
//! - **QR Encoding**: Versions 1-40, all four error correction levels, optimal
//!   numeric/alphanumeric/byte segmentation and penalty based mask selection
//! - **Rasterisation**: Exact pixel sizes with custom foreground and background colors
//! - **Logo Overlays**: Remote logos fitted onto a rounded backing plate in the
//!   middle of the symbol
//! - **Artifact Cache**: Activation code payloads (`LPA:...$...$CODE`) are cached
//!   under a stable name; everything else is stored under a fresh name and
//!   evicted by age
//!
//! ## Quick Start
//!
//! ### Encoding
//!
//! ```rust
//! use image::Rgba;
//! use qrcraft::{ECLevel, QRBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let qr = QRBuilder::new(b"Hello, World!")
//!     .ec_level(ECLevel::Q)   // defaults to ECLevel::H
//!     .build()?;
//!
//! // 256x256 pixels with one light module of margin
//! let img = qr.render(256, 1, Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 255]))?;
//! assert_eq!(img.dimensions(), (256, 256));
//! # Ok(())
//! # }
//! ```
//!
//! ### Full pipeline
//!
//! ```rust,no_run
//! use qrcraft::config::GeneratorConfig;
//! use qrcraft::params::RequestParams;
//! use qrcraft::pipeline::Generator;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = Generator::from_config(&GeneratorConfig::default())?;
//!
//! let mut params = RequestParams::with_data("LPA:1$smdp.example.com$ABC-123");
//! params.logo_url = Some("https://example.com/logo.png".into());
//!
//! let generated = generator.generate(&params).await?;
//! std::fs::write("qrcode.png", &generated.bytes)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Correction Levels
//! - **L (Low)**: ~7% error correction
//! - **M (Medium)**: ~15% error correction
//! - **Q (Quartile)**: ~25% error correction
//! - **H (High)**: ~30% error correction

#![allow(clippy::items_after_test_module, dead_code)]

pub mod builder;
pub mod classify;
pub(crate) mod common;
pub mod config;
pub mod error;
pub mod logging;
pub mod logo;
pub mod params;
pub mod pipeline;
pub mod render;
pub mod storage;

pub use builder::{QRBuilder, QR};
pub use common::error::{QRError, QRResult};
pub use common::mask::MaskPattern;
pub use common::metadata::{Color, ECLevel, Version};
pub use error::{ErrorKind, GenerateError};
pub use pipeline::{Generated, Generator, Source};
