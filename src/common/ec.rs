use super::metadata::{ECLevel, Version};

// Galois field GF(256) over the QR primitive polynomial x^8 + x^4 + x^3 + x^2 + 1
//------------------------------------------------------------------------------

const PRIMITIVE: u16 = 0x11D;

const fn exp_table() -> [u8; 255] {
    let mut table = [0u8; 255];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        table[i] = x as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIMITIVE;
        }
        i += 1;
    }
    table
}

const fn log_table(exp: &[u8; 255]) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 255 {
        table[exp[i] as usize] = i as u8;
        i += 1;
    }
    table
}

static EXP_TABLE: [u8; 255] = exp_table();

static LOG_TABLE: [u8; 256] = log_table(&EXP_TABLE);

fn gf_mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let log_sum = LOG_TABLE[a as usize] as usize + LOG_TABLE[b as usize] as usize;
    EXP_TABLE[log_sum % 255]
}

// Generator polynomial (x - a^0)(x - a^1)...(x - a^(n-1)), leading term dropped
fn generator_polynomial(degree: usize) -> Vec<u8> {
    debug_assert!((1..=255).contains(&degree), "Invalid generator degree: {degree}");

    let mut poly = vec![0u8; degree];
    poly[degree - 1] = 1;
    let mut root = 1u8;
    for _ in 0..degree {
        for j in 0..degree {
            poly[j] = gf_mul(poly[j], root);
            if j + 1 < degree {
                poly[j] ^= poly[j + 1];
            }
        }
        root = gf_mul(root, 0x02);
    }
    poly
}

// ECC: Error Correction Codeword generator
//------------------------------------------------------------------------------

// Remainder of the data polynomial divided by the generator polynomial,
// the coefficients of which are the ecc
pub fn ecc_per_block(block: &[u8], ecc_count: usize) -> Vec<u8> {
    let gen_poly = generator_polynomial(ecc_count);
    let mut res = vec![0u8; ecc_count];
    for &b in block {
        let factor = b ^ res[0];
        res.rotate_left(1);
        res[ecc_count - 1] = 0;
        for (r, g) in res.iter_mut().zip(gen_poly.iter()) {
            *r ^= gf_mul(*g, factor);
        }
    }
    res
}

/// Splits data codewords into the groups of blocks mandated for the version and level.
pub fn blockify(data: &[u8], ver: Version, ecl: ECLevel) -> Vec<&[u8]> {
    let (block1_size, block1_count, block2_size, block2_count) = ver.data_codewords_per_block(ecl);

    let total_block1_size = block1_size * block1_count;
    let total_size = total_block1_size + block2_size * block2_count;

    debug_assert!(
        total_size == data.len(),
        "Data len doesn't match total size of blocks: Data len {}, Total block size {}",
        data.len(),
        total_size
    );

    let mut data_blocks = Vec::with_capacity(block1_count + block2_count);
    data_blocks.extend(data[..total_block1_size].chunks(block1_size));
    if block2_size > 0 {
        data_blocks.extend(data[total_block1_size..].chunks(block2_size));
    }
    data_blocks
}

pub fn ecc(data: &[u8], ver: Version, ecl: ECLevel) -> (Vec<&[u8]>, Vec<Vec<u8>>) {
    let data_blocks = blockify(data, ver, ecl);
    let ecc_size_per_block = ver.ecc_per_block(ecl);
    let ecc_blocks = data_blocks.iter().map(|b| ecc_per_block(b, ecc_size_per_block)).collect();
    (data_blocks, ecc_blocks)
}
