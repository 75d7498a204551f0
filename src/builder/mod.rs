mod qr;

pub use qr::{Module, QR};

use std::ops::Deref;

use tracing::debug;

use crate::common::{
    codec::{encode, encode_with_version},
    ec::ecc,
    error::{QRError, QRResult},
    mask::{apply_best_mask, MaskPattern},
    metadata::{ECLevel, Version},
    BitStream,
};

/// Configures and builds a single QR symbol from raw bytes.
///
/// The version is picked automatically unless pinned with [`QRBuilder::version`],
/// and the mask with the lowest penalty is used unless pinned with
/// [`QRBuilder::mask`].
pub struct QRBuilder<'a> {
    data: &'a [u8],
    version: Option<Version>,
    ec_level: ECLevel,
    mask: Option<MaskPattern>,
}

impl<'a> QRBuilder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, version: None, ec_level: ECLevel::default(), mask: None }
    }

    pub fn version(&mut self, version: Version) -> &mut Self {
        self.version = Some(version);
        self
    }

    pub fn ec_level(&mut self, ec_level: ECLevel) -> &mut Self {
        self.ec_level = ec_level;
        self
    }

    pub fn mask(&mut self, mask: MaskPattern) -> &mut Self {
        self.mask = Some(mask);
        self
    }
}

impl QRBuilder<'_> {
    pub fn build(&self) -> QRResult<QR> {
        if self.data.is_empty() {
            return Err(QRError::EmptyData);
        }

        let (encoded_data, version) = match self.version {
            Some(v) => (encode_with_version(self.data, self.ec_level, v)?, v),
            None => encode(self.data, self.ec_level)?,
        };
        debug!(version = *version, ec_level = %self.ec_level, bits = encoded_data.len(), "Encoded data");

        let payload = Self::build_payload(&encoded_data, version, self.ec_level);

        let mut qr = QR::new(version, self.ec_level);
        qr.draw_all_function_patterns();
        qr.draw_encoding_region(&payload);

        let mask = match self.mask {
            Some(m) => {
                qr.apply_mask(m);
                m
            }
            None => apply_best_mask(&mut qr),
        };

        debug!(
            version = *version,
            mask = *mask,
            dark_modules = qr.count_dark_modules(),
            total_modules = version.width() * version.width(),
            "Built QR"
        );
        Ok(qr)
    }

    // Data codewords are interleaved across blocks, followed by the
    // interleaved error correction codewords
    fn build_payload(encoded_data: &BitStream, version: Version, ec_level: ECLevel) -> BitStream {
        debug_assert!(
            encoded_data.len() == version.data_bit_capacity(ec_level),
            "Encoded data length {} doesn't fill capacity {}",
            encoded_data.len(),
            version.data_bit_capacity(ec_level)
        );

        let (data_blocks, ecc_blocks) = ecc(encoded_data.data(), version, ec_level);
        let mut payload = BitStream::new(version.total_codewords() << 3);
        payload.extend(&Self::interleave(&data_blocks));
        payload.extend(&Self::interleave(&ecc_blocks));
        payload
    }

    pub fn interleave<T: Copy, V: Deref<Target = [T]>>(blocks: &[V]) -> Vec<T> {
        let max_block_size = blocks.iter().map(|b| b.len()).max().unwrap_or(0);
        let total_size = blocks.iter().map(|b| b.len()).sum::<usize>();
        let mut res = Vec::with_capacity(total_size);
        for i in 0..max_block_size {
            for b in blocks {
                if i < b.len() {
                    res.push(b[i]);
                }
            }
        }
        res
    }
}
