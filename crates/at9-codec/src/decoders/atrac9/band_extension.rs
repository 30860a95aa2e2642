//! 频带扩展 (BEX) 阶段.
//!
//! 核心解码器只解析扩展头部并原样保留负载位, 高频重建交给可替换的
//! [`BandExtension`] 实现. 默认的 [`PassThrough`] 不修改频谱.

use at9_core::{At9Error, At9Result};

/// 单声道块或立体声块中不读取头部的声道使用的模式
pub const BEX_MODE_NONE: u32 = 4;

/// 量化单元数 13..=20 → (源单元上限, 扩展单元上限, 扩展频带组)
const BEX_GROUP_INFO: [(usize, usize, usize); 8] = [
    (16, 21, 0),
    (18, 22, 1),
    (20, 22, 2),
    (21, 22, 3),
    (21, 22, 3),
    (23, 24, 4),
    (23, 24, 4),
    (24, 24, 5),
];

/// 扩展频带组信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BexBandInfo {
    pub source_units: usize,
    pub extension_units: usize,
    pub group: usize,
}

/// 按量化单元数查询扩展频带组
pub fn bex_band_info(unit_count: usize) -> At9Result<BexBandInfo> {
    unit_count
        .checked_sub(13)
        .and_then(|i| BEX_GROUP_INFO.get(i))
        .map(|&(source_units, extension_units, group)| BexBandInfo {
            source_units,
            extension_units,
            group,
        })
        .ok_or_else(|| {
            At9Error::InvalidData(format!(
                "启用频带扩展时量化单元数必须在 13..=20, 实际 {}",
                unit_count
            ))
        })
}

/// 每块的扩展参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BandExtensionParams {
    /// 是否启用频带扩展
    pub enabled: bool,
    pub unit_count: usize,
    pub extension_unit: usize,
    /// 扩展频带组 (未启用时为 0)
    pub group: usize,
    /// 各声道头部模式 (未读取时为 [`BEX_MODE_NONE`])
    pub modes: [u32; 2],
    /// 是否携带扩展数据
    pub has_data: bool,
    /// 未启用频带扩展时的数据模式
    pub data_mode: u32,
    /// 负载位数 (0-31)
    pub data_length: u32,
    /// 负载原始位, 高位在前
    pub payload: u32,
}

/// 可替换的频带扩展实现
///
/// 对启用了频带扩展的块, 在强度立体声和缩放之后、IMDCT 之前对每个声道调用一次.
/// 实现可以写入核心编码范围之外的系数.
pub trait BandExtension: Send {
    /// 实现名称
    fn name(&self) -> &str;

    /// 处理一个声道的频谱
    fn apply(
        &mut self,
        params: &BandExtensionParams,
        channel_index: usize,
        spectrum: &mut [f64],
    ) -> At9Result<()>;

    /// 流重新初始化
    fn reset(&mut self) {}
}

/// 不做任何处理的频带扩展
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl BandExtension for PassThrough {
    fn name(&self) -> &str {
        "pass-through"
    }

    fn apply(
        &mut self,
        _params: &BandExtensionParams,
        _channel_index: usize,
        _spectrum: &mut [f64],
    ) -> At9Result<()> {
        Ok(())
    }
}

/// 频带扩展噪声填充使用的 16 位 xorshift 生成器
#[derive(Debug, Clone)]
pub struct BexRng {
    state_a: u16,
    state_b: u16,
    state_c: u16,
    state_d: u16,
}

impl BexRng {
    pub fn new(seed: u16) -> Self {
        let start = 0x4D93u16.wrapping_mul(seed ^ (seed >> 14));
        Self {
            state_a: 3u16.wrapping_sub(start),
            state_b: 2u16.wrapping_sub(start),
            state_c: 1u16.wrapping_sub(start),
            state_d: 0u16.wrapping_sub(start),
        }
    }

    pub fn next_u16(&mut self) -> u16 {
        let t = self.state_d ^ (self.state_d << 5);
        self.state_d = self.state_c;
        self.state_c = self.state_b;
        self.state_b = self.state_a;
        self.state_a = t ^ self.state_a ^ ((t ^ (self.state_a >> 5)) >> 4);
        self.state_a
    }
}
