//! 频谱系数解码.
//!
//! 每个量化单元按 (精度 + 1) 选择 Huffman 码本或定长有符号读取,
//! 再按细精度读取补充位. LFE 块只使用定长读取.

use at9_core::{At9Result, BitReader};

use super::huffman::Codebooks;
use super::tables::{
    self, MAX_QUANT_UNITS, QUANT_UNIT_TO_CODEBOOK_INDEX, QUANT_UNIT_TO_COEFF_COUNT,
    QUANT_UNIT_TO_COEFF_INDEX,
};

/// 按相邻比例因子的峰谷选择频谱码本集
///
/// 只依赖本帧已确定的比例因子, 在读取频谱之前计算.
pub fn calculate_codebook_set(
    scale_factors: &[i32],
    coded_units: usize,
    high_sample_rate: bool,
    codebook_set: &mut [usize],
) {
    codebook_set.fill(0);
    if coded_units <= 1 || high_sample_rate {
        return;
    }
    let units = coded_units.min(MAX_QUANT_UNITS);

    // 末单元的右邻取自身, 边界无需特殊处理
    let mut sf = [0i32; MAX_QUANT_UNITS + 1];
    sf[..units].copy_from_slice(&scale_factors[..units]);
    sf[units] = sf[units - 1];

    let average = if units > 12 {
        (sf[..12].iter().sum::<i32>() + 6) / 12
    } else {
        0
    };

    for i in 8..units {
        let prev = sf[i - 1];
        let next = sf[i + 1];
        if sf[i] - prev.min(next) >= 3 || sf[i] - prev + sf[i] - next >= 3 {
            codebook_set[i] = 1;
        }
    }

    for i in 12..units {
        if codebook_set[i] != 0 {
            continue;
        }
        let min_neighbor = sf[i - 1].min(sf[i + 1]);
        let threshold = average - i32::from(QUANT_UNIT_TO_COEFF_COUNT[i] == 16);
        if sf[i] - min_neighbor >= 2 && sf[i] >= threshold {
            codebook_set[i] = 1;
        }
    }
}

/// 读取粗量化系数
pub fn read_spectra(
    br: &mut BitReader,
    books: &Codebooks,
    coded_units: usize,
    precisions: &[i32],
    codebook_set: &[usize],
    high_sample_rate: bool,
    quantized: &mut [i32],
) -> At9Result<()> {
    quantized.fill(0);
    let max_huffman_precision = tables::max_huffman_precision(high_sample_rate);

    for unit in 0..coded_units {
        let start = QUANT_UNIT_TO_COEFF_INDEX[unit];
        let end = QUANT_UNIT_TO_COEFF_INDEX[unit + 1];
        let precision = precisions[unit] + 1;

        if precision <= max_huffman_precision {
            let codebook = books.spectrum(
                codebook_set[unit],
                precision as usize,
                QUANT_UNIT_TO_CODEBOOK_INDEX[unit],
            )?;
            for group in quantized[start..end].chunks_mut(codebook.value_count()) {
                let symbol = codebook.decode(br)?;
                codebook.unpack_group(symbol, group);
            }
        } else {
            for value in &mut quantized[start..end] {
                *value = br.read_bits_signed(precision as u32);
            }
        }
    }
    Ok(())
}

/// 读取细量化补充位
pub fn read_spectra_fine(
    br: &mut BitReader,
    coded_units: usize,
    precisions_fine: &[i32],
    quantized_fine: &mut [i32],
) {
    quantized_fine.fill(0);
    for unit in 0..coded_units {
        if precisions_fine[unit] <= 0 {
            continue;
        }
        let bits = (precisions_fine[unit] + 1) as u32;
        let start = QUANT_UNIT_TO_COEFF_INDEX[unit];
        let end = QUANT_UNIT_TO_COEFF_INDEX[unit + 1];
        for value in &mut quantized_fine[start..end] {
            *value = br.read_bits_signed(bits);
        }
    }
}

/// LFE 块: 定长比例因子
pub fn read_lfe_scale_factors(br: &mut BitReader, unit_count: usize, scale_factors: &mut [i32]) {
    scale_factors.fill(0);
    for value in scale_factors.iter_mut().take(unit_count) {
        *value = br.read_bits(5) as i32;
    }
}

/// LFE 块精度: 复用频带参数时为 8, 否则为 4
pub fn lfe_precision(reuse_band_params: bool) -> i32 {
    if reuse_band_params { 8 } else { 4 }
}

/// LFE 块: 定长有符号系数
pub fn read_lfe_spectra(
    br: &mut BitReader,
    coded_units: usize,
    precisions: &[i32],
    quantized: &mut [i32],
) {
    quantized.fill(0);
    for unit in 0..coded_units {
        if precisions[unit] <= 0 {
            continue;
        }
        let bits = (precisions[unit] + 1) as u32;
        let start = QUANT_UNIT_TO_COEFF_INDEX[unit];
        let count = QUANT_UNIT_TO_COEFF_COUNT[unit];
        for value in &mut quantized[start..start + count] {
            *value = br.read_bits_signed(bits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::atrac9::huffman::codebooks;
    use at9_core::BitWriter;

    #[test]
    fn test_码本集_峰值选择备用集() {
        let mut sf = [10i32; 20];
        sf[9] = 14; // 相对邻居 +4
        let mut set = [0usize; 30];
        calculate_codebook_set(&sf, 20, false, &mut set);
        assert_eq!(set[9], 1);
        assert_eq!(set.iter().sum::<usize>(), 1);
    }

    #[test]
    fn test_码本集_平均阈值() {
        // 左邻 +2, 右邻持平: 仅由平均阈值规则选择
        let mut sf = [10i32; 20];
        sf[14] = 12;
        sf[15] = 12;
        let mut set = [0usize; 30];
        calculate_codebook_set(&sf, 20, false, &mut set);
        assert_eq!(set[14], 1);

        // 低于前 12 单元的平均值时不选择
        let mut sf = [20i32; 20];
        sf[12..].fill(5);
        sf[14] = 7;
        sf[15] = 7;
        calculate_codebook_set(&sf, 20, false, &mut set);
        assert_eq!(set[14], 0);
    }

    #[test]
    fn test_码本集_高采样率与单单元() {
        let mut sf = [0i32; 20];
        sf[10] = 31;
        let mut set = [1usize; 30];
        calculate_codebook_set(&sf, 20, true, &mut set);
        assert!(set.iter().all(|&s| s == 0));
        calculate_codebook_set(&sf, 1, false, &mut set);
        assert!(set.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_码本集_末单元() {
        let mut sf = [0i32; 31];
        sf[9] = 5;
        let mut set = [0usize; 30];
        // 末单元的右邻取自身: 5 - min(0, 5) = 5
        calculate_codebook_set(&sf, 10, false, &mut set);
        assert_eq!(set[9], 1);
    }

    #[test]
    fn test_定长系数() {
        let mut bw = BitWriter::new();
        // 单元 0 精度 7: 8 位有符号
        bw.write_bits_signed(-100, 8);
        bw.write_bits_signed(57, 8);
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut quantized = [0i32; 256];
        read_spectra(&mut br, codebooks(), 1, &[7], &[0], false, &mut quantized).unwrap();
        assert_eq!(&quantized[..3], &[-100, 57, 0]);
        assert_eq!(br.position(), 16);
    }

    #[test]
    fn test_huffman_系数分组解包() {
        let codebook = codebooks().spectrum(0, 2, 0).unwrap();
        // 精度 2 码本: 每符号 2 个 2 位值, 低位在前
        let symbol = (0b11 << 2) | 0b01; // [1, -1]
        let (code, len) = codebook.encode(symbol).unwrap();
        let mut bw = BitWriter::new();
        bw.write_bits(code, len);
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut quantized = [0i32; 256];
        read_spectra(&mut br, codebooks(), 1, &[1], &[0], false, &mut quantized).unwrap();
        assert_eq!(&quantized[..2], &[1, -1]);
        assert_eq!(br.position(), len as usize);
    }

    #[test]
    fn test_细量化补充位() {
        let mut bw = BitWriter::new();
        for v in [1, -2, 3, -4] {
            bw.write_bits_signed(v, 3);
        }
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut fine = [9i32; 256];
        read_spectra_fine(&mut br, 2, &[0, 2], &mut fine);
        assert_eq!(&fine[..5], &[0, 0, 1, -2, 0]);
    }

    #[test]
    fn test_lfe_定长路径() {
        let mut bw = BitWriter::new();
        bw.write_bits(20, 5);
        bw.write_bits(3, 5);
        for v in [-16, 15, 0, -1] {
            bw.write_bits_signed(v, 5);
        }
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut sf = [0i32; 31];
        read_lfe_scale_factors(&mut br, 2, &mut sf);
        assert_eq!(&sf[..3], &[20, 3, 0]);
        let precision = lfe_precision(false);
        let mut quantized = [0i32; 256];
        read_lfe_spectra(&mut br, 2, &[precision, precision], &mut quantized);
        assert_eq!(&quantized[..5], &[-16, 15, 0, -1, 0]);
        assert_eq!(br.position(), 30);
        assert_eq!(lfe_precision(true), 8);
    }
}
