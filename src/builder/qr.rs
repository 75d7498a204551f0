use std::ops::Deref;

use image::{Rgba, RgbaImage};

use crate::common::{
    generate_format_info, BitStream, Color, ECLevel, EncRegionIter, MaskPattern, QRError,
    QRResult, Version, FORMAT_INFO_BIT_LEN, VERSION_INFO_BIT_LEN,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Module {
    Empty,
    Func(Color),
    Version(Color),
    Format(Color),
    Data(Color),
}

impl Deref for Module {
    type Target = Color;
    fn deref(&self) -> &Self::Target {
        match self {
            Module::Empty => &Color::Light,
            Module::Func(c) => c,
            Module::Version(c) => c,
            Module::Format(c) => c,
            Module::Data(c) => c,
        }
    }
}

/// Module grid of a single QR symbol.
#[derive(Debug, Clone)]
pub struct QR {
    grid: Vec<Module>,
    w: usize,
    ver: Version,
    ecl: ECLevel,
    mask: Option<MaskPattern>,
}

// QR type for builder
//------------------------------------------------------------------------------

impl QR {
    pub(crate) fn new(ver: Version, ecl: ECLevel) -> Self {
        let w = ver.width();
        Self { grid: vec![Module::Empty; w * w], w, ver, ecl, mask: None }
    }

    pub fn version(&self) -> Version {
        self.ver
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn ec_level(&self) -> ECLevel {
        self.ecl
    }

    pub fn mask(&self) -> Option<MaskPattern> {
        self.mask
    }

    pub fn count_dark_modules(&self) -> usize {
        self.grid.iter().filter(|&m| matches!(**m, Color::Dark)).count()
    }

    #[cfg(test)]
    pub fn to_debug_str(&self) -> String {
        let w = self.w as i16;
        let mut res = String::with_capacity((w * (w + 1)) as usize);
        res.push('\n');
        for i in 0..w {
            for j in 0..w {
                let c = match self.get(i, j) {
                    Module::Empty => '.',
                    Module::Func(Color::Dark) => 'f',
                    Module::Func(Color::Light) => 'F',
                    Module::Version(Color::Dark) => 'v',
                    Module::Version(Color::Light) => 'V',
                    Module::Format(Color::Dark) => 'm',
                    Module::Format(Color::Light) => 'M',
                    Module::Data(Color::Dark) => 'd',
                    Module::Data(Color::Light) => 'D',
                };
                res.push(c);
            }
            res.push('\n');
        }
        res
    }

    // Negative coordinates index from the bottom/right edge
    fn coord_to_index(&self, r: i16, c: i16) -> usize {
        let w = self.w as i16;
        debug_assert!(-w <= r && r < w, "row should be within -w..w: {r}");
        debug_assert!(-w <= c && c < w, "column should be within -w..w: {c}");

        let r = if r < 0 { r + w } else { r };
        let c = if c < 0 { c + w } else { c };
        (r * w + c) as _
    }

    pub fn get(&self, r: i16, c: i16) -> Module {
        self.grid[self.coord_to_index(r, c)]
    }

    pub(crate) fn set(&mut self, r: i16, c: i16, module: Module) {
        let index = self.coord_to_index(r, c);
        self.grid[index] = module;
    }
}


// Function patterns
//------------------------------------------------------------------------------

impl QR {
    pub(crate) fn draw_all_function_patterns(&mut self) {
        self.draw_finder_patterns();
        self.draw_timing_pattern();
        self.draw_alignment_patterns();
    }

    fn draw_finder_patterns(&mut self) {
        self.draw_finder_pattern_at(3, 3);
        self.draw_finder_pattern_at(3, -4);
        self.draw_finder_pattern_at(-4, 3);
    }

    // Includes the light separator on the sides facing the symbol interior
    fn draw_finder_pattern_at(&mut self, r: i16, c: i16) {
        let (dr_top, dr_bottom): (i16, i16) = if r > 0 { (-3, 4) } else { (-4, 3) };
        let (dc_left, dc_right): (i16, i16) = if c > 0 { (-3, 4) } else { (-4, 3) };
        for i in dr_top..=dr_bottom {
            for j in dc_left..=dc_right {
                let ring = i16::max(i.abs(), j.abs());
                let clr = if ring == 2 || ring == 4 { Color::Light } else { Color::Dark };
                self.set(r + i, c + j, Module::Func(clr));
            }
        }
    }

    fn draw_timing_pattern(&mut self) {
        let last = self.w as i16 - 9;
        for k in 8..=last {
            let clr = if k & 1 == 0 { Color::Dark } else { Color::Light };
            self.set(6, k, Module::Func(clr));
            self.set(k, 6, Module::Func(clr));
        }
    }

    fn draw_alignment_patterns(&mut self) {
        let poses = self.ver.alignment_pattern();
        for &r in &poses {
            for &c in &poses {
                self.draw_alignment_pattern_at(r, c)
            }
        }
    }

    fn draw_alignment_pattern_at(&mut self, r: i16, c: i16) {
        let w = self.w as i16;
        // Skip the three corners already taken by finder patterns
        if (r == 6 && (c == 6 || c == w - 7)) || (r == w - 7 && c == 6) {
            return;
        }
        for i in -2..=2_i16 {
            for j in -2..=2_i16 {
                let clr = if i16::max(i.abs(), j.abs()) == 1 { Color::Light } else { Color::Dark };
                self.set(r + i, c + j, Module::Func(clr));
            }
        }
    }
}

#[cfg(test)]
mod function_pattern_tests {
    use super::QR;
    use crate::common::{ECLevel, Version};

    #[test]
    fn test_all_function_patterns() {
        let mut qr = QR::new(Version::new(3).unwrap(), ECLevel::L);
        qr.draw_all_function_patterns();
        assert_eq!(
            qr.to_debug_str(),
            "\n\
             fffffffF.............Ffffffff\n\
             fFFFFFfF.............FfFFFFFf\n\
             fFfffFfF.............FfFfffFf\n\
             fFfffFfF.............FfFfffFf\n\
             fFfffFfF.............FfFfffFf\n\
             fFFFFFfF.............FfFFFFFf\n\
             fffffffFfFfFfFfFfFfFfFfffffff\n\
             FFFFFFFF.............FFFFFFFF\n\
             ......f......................\n\
             ......F......................\n\
             ......f......................\n\
             ......F......................\n\
             ......f......................\n\
             ......F......................\n\
             ......f......................\n\
             ......F......................\n\
             ......f......................\n\
             ......F......................\n\
             ......f......................\n\
             ......F......................\n\
             ......f.............fffff....\n\
             FFFFFFFF............fFFFf....\n\
             fffffffF............fFfFf....\n\
             fFFFFFfF............fFFFf....\n\
             fFfffFfF............fffff....\n\
             fFfffFfF.....................\n\
             fFfffFfF.....................\n\
             fFFFFFfF.....................\n\
             fffffffF.....................\n"
        );
    }
}

// Format & version info
//------------------------------------------------------------------------------

impl QR {
    fn reserve_format_area(&mut self) {
        self.draw_format_info(0);
    }

    fn draw_format_info(&mut self, format_info: u32) {
        let w = self.w as i16;
        let bit = |i: usize| {
            let clr = if (format_info >> i) & 1 == 1 { Color::Dark } else { Color::Light };
            Module::Format(clr)
        };

        // Around the top left finder
        for i in 0..=5 {
            self.set(i as i16, 8, bit(i));
        }
        self.set(7, 8, bit(6));
        self.set(8, 8, bit(7));
        self.set(8, 7, bit(8));
        for i in 9..FORMAT_INFO_BIT_LEN {
            self.set(8, 14 - i as i16, bit(i));
        }

        // Split between the top right and bottom left finders
        for i in 0..8 {
            self.set(8, w - 1 - i as i16, bit(i));
        }
        for i in 8..FORMAT_INFO_BIT_LEN {
            self.set(w - 15 + i as i16, 8, bit(i));
        }
        self.set(w - 8, 8, Module::Format(Color::Dark));
    }

    fn draw_version_info(&mut self) {
        if *self.ver < 7 {
            return;
        }
        let w = self.w as i16;
        let ver_info = self.ver.info();
        for i in 0..VERSION_INFO_BIT_LEN {
            let clr = if (ver_info >> i) & 1 == 1 { Color::Dark } else { Color::Light };
            let a = w - 11 + (i % 3) as i16;
            let b = (i / 3) as i16;
            self.set(b, a, Module::Version(clr));
            self.set(a, b, Module::Version(clr));
        }
    }
}

#[cfg(test)]
mod info_tests {
    use super::{Module, QR};
    use crate::common::{Color, ECLevel, Version};

    #[test]
    fn test_reserve_format_area() {
        let mut qr = QR::new(Version::new(1).unwrap(), ECLevel::L);
        qr.reserve_format_area();
        let s = qr.to_debug_str();
        assert_eq!(s.matches('M').count(), 30);
        assert_eq!(s.matches('m').count(), 1);
        assert_eq!(qr.get(-8, 8), Module::Format(Color::Dark));
    }

    #[test]
    fn test_version_info_7() {
        let mut qr = QR::new(Version::new(7).unwrap(), ECLevel::L);
        qr.draw_version_info();
        // 0x07C94 = 000111 110010 010100, LSB first along both blocks
        assert_eq!(qr.get(0, -11), Module::Version(Color::Light));
        assert_eq!(qr.get(0, -9), Module::Version(Color::Dark));
        assert_eq!(qr.get(5, -11), Module::Version(Color::Light));
        assert_eq!(qr.get(5, -9), Module::Version(Color::Light));
        assert_eq!(qr.get(-9, 0), Module::Version(Color::Dark));
        let dark = qr.to_debug_str().matches('v').count();
        assert_eq!(dark, 2 * 0x07C94_u32.count_ones() as usize);
    }
}

// Encoding region
//------------------------------------------------------------------------------

impl QR {
    /// Places payload bits in the encoding region; any module left over
    /// (remainder bits) becomes a light data module.
    pub(crate) fn draw_encoding_region(&mut self, payload: &BitStream) {
        self.reserve_format_area();
        self.draw_version_info();

        let mut bits = (0..payload.len()).map(|i| payload.bit(i));
        for (r, c) in EncRegionIter::new(self.ver) {
            if self.get(r, c) != Module::Empty {
                continue;
            }
            let clr = match bits.next() {
                Some(true) => Color::Dark,
                _ => Color::Light,
            };
            self.set(r, c, Module::Data(clr));
        }

        debug_assert!(!self.grid.contains(&Module::Empty), "Empty module found after placement");
    }

    pub(crate) fn apply_mask(&mut self, pattern: MaskPattern) {
        if let Some(old) = self.mask {
            self.toggle_mask(old);
        }
        self.toggle_mask(pattern);
        self.mask = Some(pattern);
        self.draw_format_info(generate_format_info(self.ecl, pattern));
    }

    fn toggle_mask(&mut self, pattern: MaskPattern) {
        let mask_fn = pattern.mask_functions();
        let w = self.w as i16;
        for r in 0..w {
            for c in 0..w {
                if let Module::Data(clr) = self.get(r, c) {
                    if mask_fn(r, c) {
                        self.set(r, c, Module::Data(!clr))
                    }
                }
            }
        }
    }
}

// Render
//------------------------------------------------------------------------------

impl QR {
    /// Side of the symbol in modules once `margin` light modules are added.
    pub fn width_with_margin(&self, margin: u32) -> u32 {
        self.w as u32 + 2 * margin
    }

    /// Rasterises the symbol onto a `size` x `size` canvas with `margin` light
    /// modules on each side. Pixels map onto modules proportionally, so the
    /// symbol always fills the canvas even when the size doesn't divide evenly.
    /// Fails when `size` has fewer pixels than the symbol has modules.
    pub fn render(
        &self,
        size: u32,
        margin: u32,
        dark: Rgba<u8>,
        light: Rgba<u8>,
    ) -> QRResult<RgbaImage> {
        if size == 0 || size < self.width_with_margin(margin) {
            return Err(QRError::InvalidSize);
        }
        let total = self.w as u64 + 2 * margin as u64;
        let margin = margin as u64;
        let w = self.w as u64;

        let module_at = |px: u32| -> Option<i16> {
            let m = px as u64 * total / size as u64;
            if m < margin || m >= margin + w {
                None
            } else {
                Some((m - margin) as i16)
            }
        };

        let lookup: Vec<Option<i16>> = (0..size).map(module_at).collect();
        let canvas = RgbaImage::from_fn(size, size, |x, y| {
            match (lookup[y as usize], lookup[x as usize]) {
                (Some(r), Some(c)) => self.get(r, c).select(light, dark),
                _ => light,
            }
        });
        Ok(canvas)
    }
}
