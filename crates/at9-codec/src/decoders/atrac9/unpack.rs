//! 块参数解析.
//!
//! 每个块依次读取: 块头 → 频带参数 → 梯度参数 → 立体声参数 → 扩展参数,
//! 然后逐声道读取比例因子与频谱. 所有字段在读取后立即做范围校验.

use at9_core::{At9Error, At9Result, BitReader};
use log::trace;

use super::band_extension::{BEX_MODE_NONE, BandExtensionParams, bex_band_info};
use super::bit_allocation;
use super::block::{BandParams, Block, GradientParams, SCALE_FACTOR_LEN};
use super::config::{Atrac9Config, BlockKind};
use super::huffman::Codebooks;
use super::scale_factors::{ScaleFactorContext, read_scale_factors};
use super::spectrum;
use super::tables::{self, BAND_TO_QUANT_UNIT_COUNT, GRADIENT_LEN, MAX_BAND_COUNT};

/// LFE 块固定的量化单元数
pub const LFE_UNIT_COUNT: usize = 2;

/// 解析一个块 (结束后对齐到字节)
pub fn unpack_block(
    br: &mut BitReader,
    block: &mut Block,
    config: &Atrac9Config,
    codebooks: &Codebooks,
    frame_index: usize,
) -> At9Result<()> {
    read_block_header(br, block, frame_index)?;
    match block.kind {
        BlockKind::Lfe => unpack_lfe_block(br, block),
        BlockKind::Mono | BlockKind::Stereo => {
            unpack_standard_block(br, block, config, codebooks)?
        }
    }
    br.align_position(8);
    Ok(())
}

/// 块头: 首块标志与频带参数复用标志
pub fn read_block_header(
    br: &mut BitReader,
    block: &mut Block,
    frame_index: usize,
) -> At9Result<()> {
    let expected_first = frame_index == 0;
    block.first_in_superframe = !br.read_bool();
    block.reuse_band_params = br.read_bool();

    if block.first_in_superframe != expected_first {
        return Err(At9Error::InvalidData(format!(
            "块 {} 首块标志与帧位置不符: 帧 {}, 标志 {}",
            block.index, frame_index, block.first_in_superframe
        )));
    }
    if block.first_in_superframe && block.reuse_band_params && block.kind != BlockKind::Lfe {
        return Err(At9Error::InvalidData(format!(
            "块 {} ({}) 在超帧首帧不能复用频带参数",
            block.index, block.kind
        )));
    }
    Ok(())
}

/// 频带参数
pub fn read_band_params(
    br: &mut BitReader,
    kind: BlockKind,
    config: &Atrac9Config,
) -> At9Result<BandParams> {
    let min_band_count = tables::min_band_count(config.high_sample_rate);
    let max_extension_band = tables::max_extension_band(config.high_sample_rate);
    let max_band_count = MAX_BAND_COUNT[config.sample_rate_index];

    let band_count = br.read_bits(4) as usize + min_band_count;
    if band_count > max_band_count {
        return Err(At9Error::InvalidData(format!(
            "频带数越界: {} > {}",
            band_count, max_band_count
        )));
    }
    let unit_count = BAND_TO_QUANT_UNIT_COUNT[band_count];

    let (stereo_band, stereo_unit) = if kind == BlockKind::Stereo {
        let stereo_band = br.read_bits(4) as usize + min_band_count;
        if stereo_band > band_count {
            return Err(At9Error::InvalidData(format!(
                "立体声频带越界: {} > 频带数 {}",
                stereo_band, band_count
            )));
        }
        (stereo_band, BAND_TO_QUANT_UNIT_COUNT[stereo_band])
    } else {
        (band_count, unit_count)
    };

    let band_extension_enabled = br.read_bool();
    let (extension_band, extension_unit) = if band_extension_enabled {
        let extension_band = br.read_bits(4) as usize + min_band_count;
        if extension_band < band_count || extension_band > max_extension_band {
            return Err(At9Error::InvalidData(format!(
                "扩展频带越界: {} 不在 [{}, {}] 内",
                extension_band, band_count, max_extension_band
            )));
        }
        (extension_band, BAND_TO_QUANT_UNIT_COUNT[extension_band])
    } else {
        (band_count, unit_count)
    };

    Ok(BandParams {
        band_count,
        stereo_band,
        extension_band,
        unit_count,
        stereo_unit,
        extension_unit,
        band_extension_enabled,
    })
}

/// 梯度参数
pub fn read_gradient_params(br: &mut BitReader, unit_count: usize) -> At9Result<GradientParams> {
    let mode = br.read_bits(2);
    let (start_unit, end_unit, start_value, end_value) = if mode > 0 {
        let start_unit = br.read_bits(5) as usize;
        let start_value = br.read_bits(5) as i32;
        (start_unit, 31, start_value, 31)
    } else {
        let start_unit = br.read_bits(6) as usize;
        let end_unit = br.read_bits(6) as usize + 1;
        let start_value = br.read_bits(5) as i32;
        let end_value = br.read_bits(5) as i32;
        (start_unit, end_unit, start_value, end_value)
    };
    let boundary = br.read_bits(4) as usize;

    let params = GradientParams {
        mode,
        start_unit,
        end_unit,
        start_value,
        end_value,
        boundary,
    };
    validate_gradient_params(&params, unit_count)?;
    Ok(params)
}

fn validate_gradient_params(params: &GradientParams, unit_count: usize) -> At9Result<()> {
    let unit_range = 1..GRADIENT_LEN;
    let value_range = 0..=31;
    if params.boundary > unit_count {
        return Err(At9Error::InvalidData(format!(
            "梯度边界越界: {} > 量化单元数 {}",
            params.boundary, unit_count
        )));
    }
    if !unit_range.contains(&params.start_unit)
        || !unit_range.contains(&params.end_unit)
        || params.start_unit > params.end_unit
    {
        return Err(At9Error::InvalidData(format!(
            "梯度单元越界: start={} end={}",
            params.start_unit, params.end_unit
        )));
    }
    if !value_range.contains(&params.start_value) || !value_range.contains(&params.end_value) {
        return Err(At9Error::InvalidData(format!(
            "梯度值越界: start={} end={}",
            params.start_value, params.end_value
        )));
    }
    Ok(())
}

/// 立体声参数 (仅立体声块)
pub fn read_stereo_params(br: &mut BitReader, block: &mut Block) {
    block.joint_stereo_signs.fill(false);
    if block.kind != BlockKind::Stereo {
        block.primary_channel = 0;
        block.has_joint_stereo_signs = false;
        return;
    }

    block.primary_channel = br.read_bits(1) as usize;
    block.has_joint_stereo_signs = br.read_bool();
    if block.has_joint_stereo_signs {
        for sign in &mut block.joint_stereo_signs[block.stereo_unit..block.unit_count] {
            *sign = br.read_bool();
        }
    }
}

/// 扩展参数
///
/// 核心解码器不解释扩展负载: 未启用频带扩展时跳过, 启用时保存原始位.
pub fn read_extension_params(br: &mut BitReader, block: &mut Block) -> At9Result<()> {
    let mut params = BandExtensionParams {
        enabled: block.band_extension_enabled,
        unit_count: block.unit_count,
        extension_unit: block.extension_unit,
        modes: [BEX_MODE_NONE; 2],
        ..BandExtensionParams::default()
    };

    if params.enabled {
        params.group = bex_band_info(block.unit_count)?.group;
        if block.kind == BlockKind::Stereo {
            params.modes[1] = read_bex_header_mode(br, params.group);
        } else {
            br.skip_bits(1);
        }
    }

    params.has_data = br.read_bool();
    if params.has_data {
        if params.enabled {
            params.modes[0] = read_bex_header_mode(br, params.group);
            params.data_length = br.read_bits(5);
            params.payload = br.read_bits(params.data_length);
        } else {
            params.data_mode = br.read_bits(2);
            params.data_length = br.read_bits(5);
            br.skip_bits(params.data_length as usize);
        }
    }

    block.extension = params;
    Ok(())
}

fn read_bex_header_mode(br: &mut BitReader, group: usize) -> u32 {
    let mode = br.read_bits(2);
    if group > 2 { mode } else { BEX_MODE_NONE }
}

/// 单声道/立体声块
pub fn unpack_standard_block(
    br: &mut BitReader,
    block: &mut Block,
    config: &Atrac9Config,
    codebooks: &Codebooks,
) -> At9Result<()> {
    if block.reuse_band_params {
        let band = block.band.ok_or_else(|| {
            At9Error::InvalidData(format!("块 {} 复用频带参数, 但此前未读取过", block.index))
        })?;
        block.apply_band_params(band);
    } else {
        let band = read_band_params(br, block.kind, config)?;
        block.apply_band_params(band);
    }

    let gradient = read_gradient_params(br, block.unit_count)?;
    block.gradient_params = gradient;
    bit_allocation::create_gradient(&gradient, block.unit_count, &mut block.gradient);
    read_stereo_params(br, block);
    read_extension_params(br, block)?;

    trace!(
        "块 {} ({}): 单元 {} 立体声 {} 扩展 {} 梯度 {:?} 主声道 {}",
        block.index,
        block.kind,
        block.unit_count,
        block.stereo_unit,
        block.extension_unit,
        gradient,
        block.primary_channel,
    );

    let mut channel0 = [0i32; SCALE_FACTOR_LEN];
    for index in 0..block.channels.len() {
        let coded_units = if block.is_primary(index) {
            block.unit_count
        } else {
            block.stereo_unit
        };
        let channel = &mut block.channels[index];
        channel.coded_units = coded_units;

        let ctx = ScaleFactorContext {
            codebooks,
            channel_index: index,
            first_in_superframe: block.first_in_superframe,
            extension_unit: block.extension_unit,
            channel0: &channel0,
            previous: &channel.scale_factors_prev,
            previous_len: block.units_prev,
        };
        channel.scale_factor_mode = read_scale_factors(br, &ctx, &mut channel.scale_factors)?;
        channel.scale_factors_prev = channel.scale_factors;
        if index == 0 {
            channel0 = channel.scale_factors;
        }

        bit_allocation::calculate_mask(
            &channel.scale_factors,
            block.unit_count,
            &mut channel.precision_mask,
        );
        bit_allocation::calculate_precisions(
            &gradient,
            &block.gradient,
            &channel.scale_factors,
            &channel.precision_mask,
            block.unit_count,
            &mut channel.precisions,
            &mut channel.precisions_fine,
        );
        spectrum::calculate_codebook_set(
            &channel.scale_factors,
            coded_units,
            config.high_sample_rate,
            &mut channel.codebook_set,
        );

        spectrum::read_spectra(
            br,
            codebooks,
            coded_units,
            &channel.precisions,
            &channel.codebook_set,
            config.high_sample_rate,
            &mut channel.quantized_spectra,
        )?;
        spectrum::read_spectra_fine(
            br,
            coded_units,
            &channel.precisions_fine,
            &mut channel.quantized_spectra_fine,
        );
    }

    block.units_prev = if block.band_extension_enabled {
        block.extension_unit
    } else {
        block.unit_count
    };
    Ok(())
}

/// LFE 块: 2 个量化单元, 定长比例因子与系数
pub fn unpack_lfe_block(br: &mut BitReader, block: &mut Block) {
    block.unit_count = LFE_UNIT_COUNT;
    block.stereo_unit = LFE_UNIT_COUNT;
    block.extension_unit = LFE_UNIT_COUNT;
    block.band_extension_enabled = false;
    block.extension = BandExtensionParams::default();

    let precision = spectrum::lfe_precision(block.reuse_band_params);
    let channel = &mut block.channels[0];
    spectrum::read_lfe_scale_factors(br, LFE_UNIT_COUNT, &mut channel.scale_factors);

    channel.precisions.fill(0);
    channel.precisions_fine.fill(0);
    channel.precisions[..LFE_UNIT_COUNT].fill(precision);
    channel.coded_units = LFE_UNIT_COUNT;

    spectrum::read_lfe_spectra(
        br,
        LFE_UNIT_COUNT,
        &channel.precisions,
        &mut channel.quantized_spectra,
    );
    channel.quantized_spectra_fine.fill(0);
}
