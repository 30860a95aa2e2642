//! 比例因子解码.
//!
//! 每个声道用 2 位选择四种编码模式之一. 差分模式引用的基线 (上一帧或声道 0)
//! 由调用方以只读切片传入.

use at9_core::{At9Error, At9Result, BitReader, OffsetBias};
use log::trace;

use super::huffman::Codebooks;
use super::tables::SCALE_FACTOR_WEIGHTS;

/// 比例因子最大值
pub const MAX_SCALE_FACTOR: i32 = 31;

/// 解码一个声道的比例因子时需要的上下文
#[derive(Debug, Clone, Copy)]
pub struct ScaleFactorContext<'a> {
    pub codebooks: &'a Codebooks,
    /// 声道在块内的索引
    pub channel_index: usize,
    pub first_in_superframe: bool,
    /// 需要解码的单元数
    pub extension_unit: usize,
    /// 声道 0 本帧的比例因子 (声道 0 自身解码时不使用)
    pub channel0: &'a [i32],
    /// 本声道上一帧的比例因子
    pub previous: &'a [i32],
    /// 上一帧的量化单元数
    pub previous_len: usize,
}

/// 读取编码模式并解码比例因子, 返回编码模式
///
/// `sf` 先被清零, 解码结果均在 [0, 31] 内, 否则返回错误.
pub fn read_scale_factors(
    br: &mut BitReader,
    ctx: &ScaleFactorContext<'_>,
    sf: &mut [i32],
) -> At9Result<u32> {
    sf.fill(0);
    let mode = br.read_bits(2);
    let ext = ctx.extension_unit;
    let books = ctx.codebooks;

    match (ctx.channel_index == 0, mode) {
        (_, 0) => read_vlc_delta_offset(br, books, ext, sf)?,
        (true, 1) => read_clc_offset(br, ext, sf),
        (true, 2) => {
            require_previous(ctx, mode)?;
            read_vlc_distance_to_baseline(br, books, ext, ctx.previous, ctx.previous_len, sf)?;
        }
        (true, _) => {
            require_previous(ctx, mode)?;
            read_vlc_delta_offset_with_baseline(
                br,
                books,
                ext,
                ctx.previous,
                ctx.previous_len,
                sf,
            )?;
        }
        (false, 1) => read_vlc_distance_to_baseline(br, books, ext, ctx.channel0, ext, sf)?,
        (false, 2) => {
            read_vlc_delta_offset_with_baseline(br, books, ext, ctx.channel0, ext, sf)?
        }
        (false, _) => {
            require_previous(ctx, mode)?;
            read_vlc_distance_to_baseline(br, books, ext, ctx.previous, ctx.previous_len, sf)?;
        }
    }

    if let Some((unit, &value)) = sf
        .iter()
        .take(ext)
        .enumerate()
        .find(|(_, v)| !(0..=MAX_SCALE_FACTOR).contains(*v))
    {
        return Err(At9Error::InvalidData(format!(
            "比例因子越界: 声道 {} 单元 {} = {} (模式 {})",
            ctx.channel_index, unit, value, mode
        )));
    }

    trace!(
        "比例因子: 声道 {} 模式 {} {:?}",
        ctx.channel_index,
        mode,
        &sf[..ext.min(sf.len())]
    );
    Ok(mode)
}

fn require_previous(ctx: &ScaleFactorContext<'_>, mode: u32) -> At9Result<()> {
    if ctx.first_in_superframe {
        return Err(At9Error::InvalidData(format!(
            "超帧首块不能使用帧间比例因子模式 {} (声道 {})",
            mode, ctx.channel_index
        )));
    }
    Ok(())
}

/// VLC 差分 + 权重曲线
pub fn read_vlc_delta_offset(
    br: &mut BitReader,
    books: &Codebooks,
    unit_count: usize,
    sf: &mut [i32],
) -> At9Result<()> {
    let weights = &SCALE_FACTOR_WEIGHTS[br.read_bits(3) as usize];
    let base = br.read_bits(5) as i32;
    let bit_len = br.read_bits(2) + 3;
    let codebook = books.scale_factor_unsigned(bit_len as usize)?;
    let mask = codebook.value_max() as i32 - 1;

    if unit_count == 0 {
        return Ok(());
    }
    sf[0] = br.read_bits(bit_len) as i32;
    for i in 1..unit_count {
        let delta = codebook.decode(br)? as i32;
        sf[i] = (sf[i - 1] + delta) & mask;
    }
    for (value, &weight) in sf.iter_mut().zip(weights.iter()).take(unit_count) {
        *value += base - i32::from(weight);
    }
    Ok(())
}

/// 定长编码 + 可选基值
pub fn read_clc_offset(br: &mut BitReader, unit_count: usize, sf: &mut [i32]) {
    const MAX_BITS: u32 = 5;
    let bit_len = br.read_bits(2) + 2;
    let base = if bit_len < MAX_BITS {
        br.read_bits(MAX_BITS) as i32
    } else {
        0
    };
    for value in sf.iter_mut().take(unit_count) {
        *value = br.read_bits(bit_len) as i32 + base;
    }
}

/// 相对基线的有符号距离, 基线之外的单元为 5 位定长
pub fn read_vlc_distance_to_baseline(
    br: &mut BitReader,
    books: &Codebooks,
    unit_count: usize,
    baseline: &[i32],
    baseline_len: usize,
    sf: &mut [i32],
) -> At9Result<()> {
    let bit_len = br.read_bits(2) + 2;
    let codebook = books.scale_factor_signed(bit_len as usize)?;
    let coded = unit_count.min(baseline_len).min(baseline.len());

    for i in 0..coded {
        let distance = codebook.decode_signed(br)?;
        sf[i] = (baseline[i] + distance) & MAX_SCALE_FACTOR;
    }
    for value in sf.iter_mut().take(unit_count).skip(coded) {
        *value = br.read_bits(5) as i32;
    }
    Ok(())
}

/// 差分 + 有符号基值, 叠加在基线之上
pub fn read_vlc_delta_offset_with_baseline(
    br: &mut BitReader,
    books: &Codebooks,
    unit_count: usize,
    baseline: &[i32],
    baseline_len: usize,
    sf: &mut [i32],
) -> At9Result<()> {
    let base = br.read_offset_binary(5, OffsetBias::Negative);
    let bit_len = br.read_bits(2) + 1;
    let codebook = books.scale_factor_unsigned(bit_len as usize)?;
    let mask = codebook.value_max() as i32 - 1;
    let coded = unit_count.min(baseline_len).min(baseline.len());

    if unit_count > 0 {
        sf[0] = br.read_bits(bit_len) as i32;
    }
    for i in 1..coded {
        let delta = codebook.decode(br)? as i32;
        sf[i] = (sf[i - 1] + delta) & mask;
    }
    for i in 0..coded {
        sf[i] += base + baseline[i];
    }
    for value in sf.iter_mut().take(unit_count).skip(coded) {
        *value = br.read_bits(5) as i32;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::atrac9::huffman::{HuffmanCodebook, codebooks};
    use at9_core::BitWriter;

    fn write_code(bw: &mut BitWriter, codebook: &HuffmanCodebook, symbol: u32) {
        let (code, len) = codebook.encode(symbol).unwrap();
        bw.write_bits(code, len);
    }

    fn context<'a>(
        channel_index: usize,
        first: bool,
        channel0: &'a [i32],
        previous: &'a [i32],
    ) -> ScaleFactorContext<'a> {
        ScaleFactorContext {
            codebooks: codebooks(),
            channel_index,
            first_in_superframe: first,
            extension_unit: 4,
            channel0,
            previous,
            previous_len: 4,
        }
    }

    #[test]
    fn test_定长编码带基值() {
        let mut bw = BitWriter::new();
        bw.write_bits(1, 2); // 模式 1
        bw.write_bits(1, 2); // 3 位
        bw.write_bits(10, 5); // 基值
        for v in [0, 1, 5, 7] {
            bw.write_bits(v, 3);
        }
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut sf = [0i32; 31];
        let mode = read_scale_factors(&mut br, &context(0, true, &[], &[]), &mut sf).unwrap();
        assert_eq!(mode, 1);
        assert_eq!(&sf[..5], &[10, 11, 15, 17, 0]);
    }

    #[test]
    fn test_定长编码五位无基值() {
        let mut bw = BitWriter::new();
        bw.write_bits(3, 2); // 5 位, 不读基值
        for v in [31, 0, 16, 2] {
            bw.write_bits(v, 5);
        }
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut sf = [0i32; 31];
        read_clc_offset(&mut br, 4, &mut sf);
        assert_eq!(&sf[..4], &[31, 0, 16, 2]);
        assert_eq!(br.position(), 22);
    }

    #[test]
    fn test_vlc_差分与权重() {
        let codebook = codebooks().scale_factor_unsigned(3).unwrap();
        let mut bw = BitWriter::new();
        bw.write_bits(0, 3); // 权重 0
        bw.write_bits(20, 5); // 基值
        bw.write_bits(0, 2); // 3 位
        bw.write_bits(2, 3); // sf[0]
        write_code(&mut bw, codebook, 1);
        write_code(&mut bw, codebook, 7); // 2+1+7 = 10 → & 7 = 2
        write_code(&mut bw, codebook, 0);
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut sf = [0i32; 31];
        read_vlc_delta_offset(&mut br, codebooks(), 4, &mut sf).unwrap();
        // 原始 [2, 3, 2, 2], 加 20 减权重 [0, 0, 0, 1]
        assert_eq!(&sf[..4], &[22, 23, 22, 21]);
    }

    #[test]
    fn test_距离基线_超出部分为定长() {
        let codebook = codebooks().scale_factor_signed(2).unwrap();
        let mut bw = BitWriter::new();
        bw.write_bits(0, 2); // 2 位有符号码本
        write_code(&mut bw, codebook, 1); // +1
        write_code(&mut bw, codebook, 3); // -1
        bw.write_bits(9, 5);
        bw.write_bits(30, 5);
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut sf = [0i32; 31];
        let baseline = [5, 0, 7, 7];
        read_vlc_distance_to_baseline(&mut br, codebooks(), 4, &baseline, 2, &mut sf).unwrap();
        // 0 - 1 回绕到 31
        assert_eq!(&sf[..4], &[6, 31, 9, 30]);
    }

    #[test]
    fn test_差分叠加基线() {
        let codebook = codebooks().scale_factor_unsigned(2).unwrap();
        let mut bw = BitWriter::new();
        bw.write_offset_binary(-3, 5, OffsetBias::Negative);
        bw.write_bits(1, 2); // 2 位
        bw.write_bits(1, 2); // sf[0]
        write_code(&mut bw, codebook, 1);
        write_code(&mut bw, codebook, 3); // (2 + 3) & 3 = 1
        bw.write_bits(12, 5);
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut sf = [0i32; 31];
        let baseline = [10, 10, 20, 0];
        read_vlc_delta_offset_with_baseline(&mut br, codebooks(), 4, &baseline, 3, &mut sf)
            .unwrap();
        assert_eq!(&sf[..4], &[8, 9, 18, 12]);
    }

    #[test]
    fn test_首块禁止帧间模式() {
        for (channel, mode) in [(0usize, 2u32), (0, 3), (1, 3)] {
            let data = [(mode << 6) as u8, 0, 0, 0];
            let mut br = BitReader::new(&data);
            let mut sf = [0i32; 31];
            let ctx = context(channel, true, &[0; 31], &[0; 31]);
            assert!(
                matches!(
                    read_scale_factors(&mut br, &ctx, &mut sf),
                    Err(At9Error::InvalidData(_))
                ),
                "channel={} mode={}",
                channel,
                mode
            );
        }
    }

    #[test]
    fn test_声道1_模式1引用声道0() {
        let codebook = codebooks().scale_factor_signed(2).unwrap();
        let mut bw = BitWriter::new();
        bw.write_bits(1, 2); // 模式 1
        bw.write_bits(0, 2); // 2 位
        for _ in 0..4 {
            write_code(&mut bw, codebook, 0);
        }
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut sf = [0i32; 31];
        let channel0 = [3, 4, 5, 6];
        let ctx = context(1, true, &channel0, &[]);
        assert_eq!(read_scale_factors(&mut br, &ctx, &mut sf).unwrap(), 1);
        assert_eq!(&sf[..4], &channel0);
    }

    #[test]
    fn test_越界比例因子报错() {
        let mut bw = BitWriter::new();
        bw.write_bits(1, 2); // 模式 1
        bw.write_bits(2, 2); // 4 位
        bw.write_bits(31, 5); // 基值 31
        for v in [0, 1, 0, 0] {
            bw.write_bits(v, 4);
        }
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut sf = [0i32; 31];
        let err = read_scale_factors(&mut br, &context(0, true, &[], &[]), &mut sf).unwrap_err();
        assert!(matches!(err, At9Error::InvalidData(_)));
    }
}
