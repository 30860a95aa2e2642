//! ATRAC9 4 字节配置解析.
//!
//! 位布局 (MSB first):
//! `[8 位头 0xFE][4 位采样率索引][3 位声道配置索引][1 位校验 (必须为 0)]`
//! `[11 位帧字节数 - 1][2 位超帧索引]`

use std::fmt;

use at9_core::{At9Error, At9Result, BitReader, BitWriter, ChannelLayout};
use log::debug;

use crate::codec_parameters::{AudioCodecParams, CodecParameters};

/// 配置头常量
pub const CONFIG_HEADER: u32 = 0xFE;

/// 配置数据长度 (字节)
pub const CONFIG_SIZE: usize = 4;

/// 采样率索引 → 采样率 (Hz)
const SAMPLE_RATES: [u32; 16] = [
    11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000, 44100, 48000, 64000, 88200, 96000,
    128000, 176400, 192000,
];

/// 采样率索引 → 帧长指数
const FRAME_SAMPLES_POWER: [u32; 16] = [6, 6, 7, 7, 7, 8, 8, 8, 6, 6, 7, 7, 7, 8, 8, 8];

/// 块类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// 单声道块
    Mono,
    /// 立体声块 (两个声道, 支持强度立体声)
    Stereo,
    /// 低频效果块
    Lfe,
}

impl BlockKind {
    /// 块包含的声道数
    pub fn channel_count(self) -> usize {
        match self {
            Self::Stereo => 2,
            Self::Mono | Self::Lfe => 1,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mono => write!(f, "mono"),
            Self::Stereo => write!(f, "stereo"),
            Self::Lfe => write!(f, "lfe"),
        }
    }
}

/// 声道配置索引 → 块序列
const CHANNEL_CONFIGS: [&[BlockKind]; 6] = [
    &[BlockKind::Mono],
    &[BlockKind::Mono, BlockKind::Mono],
    &[BlockKind::Stereo],
    &[
        BlockKind::Stereo,
        BlockKind::Mono,
        BlockKind::Lfe,
        BlockKind::Stereo,
    ],
    &[
        BlockKind::Stereo,
        BlockKind::Mono,
        BlockKind::Lfe,
        BlockKind::Stereo,
        BlockKind::Stereo,
    ],
    &[BlockKind::Stereo, BlockKind::Stereo],
];

/// ATRAC9 流配置
///
/// 打开流时由 4 字节配置解析一次, 在整个流的生命周期内不变.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atrac9Config {
    /// 原始配置数据
    pub config_data: [u8; CONFIG_SIZE],
    /// 采样率索引 (0-15)
    pub sample_rate_index: usize,
    /// 声道配置索引 (0-5)
    pub channel_config_index: usize,
    /// 每帧字节数
    pub frame_bytes: usize,
    /// 超帧索引 (0-3)
    pub superframe_index: usize,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 块序列 (按解码顺序)
    pub blocks: &'static [BlockKind],
    /// 总声道数
    pub channel_count: usize,
    /// 声道布局
    pub channel_layout: ChannelLayout,
    /// 每超帧的帧数
    pub frames_per_superframe: usize,
    /// 帧长指数
    pub frame_samples_power: u32,
    /// 每帧采样数 (每声道)
    pub frame_samples: usize,
    /// 每超帧字节数
    pub superframe_bytes: usize,
    /// 每超帧采样数 (每声道)
    pub superframe_samples: usize,
    /// 是否为高采样率模式 (采样率索引 > 7)
    pub high_sample_rate: bool,
}

impl Atrac9Config {
    /// 从 8 位十六进制文本解析 (如 `FE6422D0`, 可带 `0x` 前缀)
    pub fn from_hex(text: &str) -> At9Result<Self> {
        let digits = text.trim().trim_start_matches("0x").trim_start_matches("0X");
        if digits.len() != CONFIG_SIZE * 2 || !digits.is_ascii() {
            return Err(At9Error::InvalidConfig(format!(
                "配置必须是 {} 位十六进制: '{}'",
                CONFIG_SIZE * 2,
                text
            )));
        }
        let mut bytes = [0u8; CONFIG_SIZE];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &digits[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|e| {
                At9Error::InvalidConfig(format!("无效的十六进制 '{}': {}", pair, e))
            })?;
        }
        Self::from_bytes(&bytes)
    }

    /// 配置的十六进制表示 (大写)
    pub fn to_hex(&self) -> String {
        self.config_data.iter().map(|b| format!("{b:02X}")).collect()
    }

    /// 从 4 字节配置解析
    pub fn from_bytes(data: &[u8]) -> At9Result<Self> {
        let config_data: [u8; CONFIG_SIZE] = data
            .get(..CONFIG_SIZE)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| {
                At9Error::InvalidConfig(format!(
                    "配置数据长度不足: 需要 {} 字节, 实际 {} 字节",
                    CONFIG_SIZE,
                    data.len()
                ))
            })?;

        let mut br = BitReader::new(&config_data);
        let header = br.read_bits(8);
        let sample_rate_index = br.read_bits(4) as usize;
        let channel_config_index = br.read_bits(3) as usize;
        let validation_bit = br.read_bits(1);
        let frame_bytes = br.read_bits(11) as usize + 1;
        let superframe_index = br.read_bits(2) as usize;

        if header != CONFIG_HEADER {
            return Err(At9Error::InvalidConfig(format!(
                "配置头无效: 0x{:02X}, 期望 0x{:02X}",
                header, CONFIG_HEADER
            )));
        }
        if validation_bit != 0 {
            return Err(At9Error::InvalidConfig("配置校验位必须为 0".into()));
        }
        let blocks = CHANNEL_CONFIGS
            .get(channel_config_index)
            .copied()
            .ok_or_else(|| {
                At9Error::InvalidConfig(format!("不支持的声道配置索引: {}", channel_config_index))
            })?;

        let channel_count: usize = blocks.iter().map(|kind| kind.channel_count()).sum();
        let frames_per_superframe = 1usize << superframe_index;
        let frame_samples_power = FRAME_SAMPLES_POWER[sample_rate_index];
        let frame_samples = 1usize << frame_samples_power;

        let config = Self {
            config_data,
            sample_rate_index,
            channel_config_index,
            frame_bytes,
            superframe_index,
            sample_rate: SAMPLE_RATES[sample_rate_index],
            blocks,
            channel_count,
            channel_layout: ChannelLayout::from_channels(channel_count as u32),
            frames_per_superframe,
            frame_samples_power,
            frame_samples,
            superframe_bytes: frame_bytes * frames_per_superframe,
            superframe_samples: frame_samples * frames_per_superframe,
            high_sample_rate: sample_rate_index > 7,
        };

        debug!(
            "ATRAC9 配置: {} Hz, {} ({} 声道), 帧 {} 字节 / {} 采样, 超帧 {} 帧",
            config.sample_rate,
            config.channel_layout,
            config.channel_count,
            config.frame_bytes,
            config.frame_samples,
            config.frames_per_superframe,
        );

        Ok(config)
    }

    /// 按字段组装 4 字节配置
    ///
    /// 与 [`Atrac9Config::from_bytes`] 互逆, 供工具和测试构造配置.
    pub fn encode(
        sample_rate_index: usize,
        channel_config_index: usize,
        frame_bytes: usize,
        superframe_index: usize,
    ) -> At9Result<[u8; CONFIG_SIZE]> {
        if sample_rate_index >= SAMPLE_RATES.len() {
            return Err(At9Error::InvalidArgument(format!(
                "采样率索引越界: {}",
                sample_rate_index
            )));
        }
        if channel_config_index >= CHANNEL_CONFIGS.len() {
            return Err(At9Error::InvalidArgument(format!(
                "声道配置索引越界: {}",
                channel_config_index
            )));
        }
        if !(1..=2048).contains(&frame_bytes) {
            return Err(At9Error::InvalidArgument(format!(
                "帧字节数越界: {}",
                frame_bytes
            )));
        }
        if superframe_index > 3 {
            return Err(At9Error::InvalidArgument(format!(
                "超帧索引越界: {}",
                superframe_index
            )));
        }

        let mut bw = BitWriter::new();
        bw.write_bits(CONFIG_HEADER, 8);
        bw.write_bits(sample_rate_index as u32, 4);
        bw.write_bits(channel_config_index as u32, 3);
        bw.write_bits(0, 1);
        bw.write_bits(frame_bytes as u32 - 1, 11);
        bw.write_bits(superframe_index as u32, 2);

        let mut out = [0u8; CONFIG_SIZE];
        out.copy_from_slice(&bw.finish());
        Ok(out)
    }

    /// 生成供流式解码器使用的编解码器参数
    pub fn codec_parameters(&self) -> CodecParameters {
        CodecParameters {
            extra_data: self.config_data.to_vec(),
            bit_rate: (self.superframe_bytes as u64 * 8 * u64::from(self.sample_rate))
                / self.superframe_samples as u64,
            audio: Some(AudioCodecParams {
                sample_rate: self.sample_rate,
                channel_layout: self.channel_layout,
                frame_size: self.superframe_samples as u32,
            }),
        }
    }
}
