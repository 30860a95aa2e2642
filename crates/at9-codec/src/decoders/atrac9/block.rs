//! 块与声道状态.
//!
//! `Block` 按声道配置中的槽位创建, 每帧覆盖其逐帧字段; 频带参数可被下一帧复用.
//! `Channel` 保存跨帧状态 (上一帧比例因子与 IMDCT 历史), 仅在流重新初始化时清零.

use at9_core::At9Result;

use super::band_extension::BandExtensionParams;
use super::config::{Atrac9Config, BlockKind};
use super::imdct::Imdct;
use super::tables::{GRADIENT_LEN, MAX_FRAME_SAMPLES, MAX_QUANT_UNITS};

/// 比例因子数组长度 (含一个哨兵位)
pub const SCALE_FACTOR_LEN: usize = MAX_QUANT_UNITS + 1;

/// 频带参数, 可通过 `reuse_band_params` 跨帧复用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BandParams {
    /// 频带数
    pub band_count: usize,
    /// 立体声频带边界
    pub stereo_band: usize,
    /// 扩展频带边界
    pub extension_band: usize,
    /// 量化单元数
    pub unit_count: usize,
    /// 立体声量化单元边界
    pub stereo_unit: usize,
    /// 扩展量化单元边界
    pub extension_unit: usize,
    /// 是否启用频带扩展
    pub band_extension_enabled: bool,
}

/// 梯度参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GradientParams {
    /// 曲线模式 (0-3)
    pub mode: u32,
    pub start_unit: usize,
    pub end_unit: usize,
    pub start_value: i32,
    pub end_value: i32,
    /// 此边界以下的单元精度加 1
    pub boundary: usize,
}

/// 单个物理声道
#[derive(Debug, Clone)]
pub struct Channel {
    /// 在块内的索引 (0 或 1)
    pub index: usize,
    pub scale_factors: [i32; SCALE_FACTOR_LEN],
    /// 上一帧的比例因子
    pub scale_factors_prev: [i32; SCALE_FACTOR_LEN],
    /// 比例因子编码模式
    pub scale_factor_mode: u32,
    pub precisions: [i32; MAX_QUANT_UNITS],
    pub precisions_fine: [i32; MAX_QUANT_UNITS],
    pub precision_mask: [i32; MAX_QUANT_UNITS],
    /// 每单元的频谱码本集 (0 或 1)
    pub codebook_set: [usize; MAX_QUANT_UNITS],
    /// 本帧实际编码的量化单元数
    pub coded_units: usize,
    pub quantized_spectra: [i32; MAX_FRAME_SAMPLES],
    pub quantized_spectra_fine: [i32; MAX_FRAME_SAMPLES],
    pub spectra: [f64; MAX_FRAME_SAMPLES],
    pub pcm: [f64; MAX_FRAME_SAMPLES],
    pub imdct: Imdct,
}

impl Channel {
    pub fn new(index: usize, frame_samples_power: u32) -> At9Result<Self> {
        Ok(Self {
            index,
            scale_factors: [0; SCALE_FACTOR_LEN],
            scale_factors_prev: [0; SCALE_FACTOR_LEN],
            scale_factor_mode: 0,
            precisions: [0; MAX_QUANT_UNITS],
            precisions_fine: [0; MAX_QUANT_UNITS],
            precision_mask: [0; MAX_QUANT_UNITS],
            codebook_set: [0; MAX_QUANT_UNITS],
            coded_units: 0,
            quantized_spectra: [0; MAX_FRAME_SAMPLES],
            quantized_spectra_fine: [0; MAX_FRAME_SAMPLES],
            spectra: [0.0; MAX_FRAME_SAMPLES],
            pcm: [0.0; MAX_FRAME_SAMPLES],
            imdct: Imdct::new(frame_samples_power)?,
        })
    }

    /// 清空跨帧状态
    pub fn reset(&mut self) {
        self.scale_factors = [0; SCALE_FACTOR_LEN];
        self.scale_factors_prev = [0; SCALE_FACTOR_LEN];
        self.imdct.reset();
    }
}

/// 一个编码块 (单声道/立体声/LFE)
#[derive(Debug, Clone)]
pub struct Block {
    pub kind: BlockKind,
    /// 在声道配置中的槽位
    pub index: usize,
    pub first_in_superframe: bool,
    pub reuse_band_params: bool,
    /// 最近一次读取的频带参数
    pub band: Option<BandParams>,
    /// 本帧使用的频带参数
    pub unit_count: usize,
    pub stereo_unit: usize,
    pub extension_unit: usize,
    pub band_extension_enabled: bool,
    pub gradient_params: GradientParams,
    pub gradient: [i32; GRADIENT_LEN],
    pub primary_channel: usize,
    pub has_joint_stereo_signs: bool,
    pub joint_stereo_signs: [bool; MAX_QUANT_UNITS],
    pub extension: BandExtensionParams,
    /// 上一帧的量化单元数, 约束帧间基线长度
    pub units_prev: usize,
    pub channels: Vec<Channel>,
}

impl Block {
    pub fn new(config: &Atrac9Config, index: usize, kind: BlockKind) -> At9Result<Self> {
        let channels = (0..kind.channel_count())
            .map(|i| Channel::new(i, config.frame_samples_power))
            .collect::<At9Result<Vec<_>>>()?;
        Ok(Self {
            kind,
            index,
            first_in_superframe: false,
            reuse_band_params: false,
            band: None,
            unit_count: 0,
            stereo_unit: 0,
            extension_unit: 0,
            band_extension_enabled: false,
            gradient_params: GradientParams::default(),
            gradient: [0; GRADIENT_LEN],
            primary_channel: 0,
            has_joint_stereo_signs: false,
            joint_stereo_signs: [false; MAX_QUANT_UNITS],
            extension: BandExtensionParams::default(),
            units_prev: 0,
            channels,
        })
    }

    /// 应用频带参数到本帧
    pub fn apply_band_params(&mut self, band: BandParams) {
        self.band = Some(band);
        self.unit_count = band.unit_count;
        self.stereo_unit = band.stereo_unit;
        self.extension_unit = band.extension_unit;
        self.band_extension_enabled = band.band_extension_enabled;
    }

    /// 主声道在块内的索引
    pub fn primary_index(&self) -> usize {
        if self.primary_channel == 0 { 0 } else { 1 }
    }

    /// 声道是否为主声道
    pub fn is_primary(&self, channel_index: usize) -> bool {
        self.primary_channel == channel_index
    }

    /// 清空跨帧状态
    pub fn reset(&mut self) {
        self.band = None;
        self.units_prev = 0;
        for channel in &mut self.channels {
            channel.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_按块类型创建声道() {
        let config = Atrac9Config::from_bytes(&[0xFE, 0x64, 0x22, 0xD0]).unwrap();
        let block = Block::new(&config, 0, BlockKind::Stereo).unwrap();
        assert_eq!(block.channels.len(), 2);
        assert_eq!(block.channels[1].index, 1);
        assert_eq!(block.channels[0].imdct.size(), config.frame_samples);
        let lfe = Block::new(&config, 2, BlockKind::Lfe).unwrap();
        assert_eq!(lfe.channels.len(), 1);
    }

    #[test]
    fn test_主声道索引() {
        let config = Atrac9Config::from_bytes(&[0xFE, 0x64, 0x22, 0xD0]).unwrap();
        let mut block = Block::new(&config, 0, BlockKind::Stereo).unwrap();
        assert!(block.is_primary(0));
        block.primary_channel = 1;
        assert_eq!(block.primary_index(), 1);
        assert!(block.is_primary(1));
        assert!(!block.is_primary(0));
    }
}
