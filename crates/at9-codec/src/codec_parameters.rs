//! 编解码器参数.
//!
//! 描述打开解码器所需的配置, 通常从容器格式中提取.

use at9_core::ChannelLayout;

/// 编解码器参数
#[derive(Debug, Clone, Default)]
pub struct CodecParameters {
    /// 额外数据 (ATRAC9 为 4 字节配置)
    pub extra_data: Vec<u8>,
    /// 码率 (bits/s)
    pub bit_rate: u64,
    /// 音频参数
    pub audio: Option<AudioCodecParams>,
}

/// 音频编解码器参数
#[derive(Debug, Clone)]
pub struct AudioCodecParams {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道布局
    pub channel_layout: ChannelLayout,
    /// 每帧采样数 (0 表示可变)
    pub frame_size: u32,
}

impl CodecParameters {
    /// 由额外数据创建参数
    pub fn from_extra_data(extra_data: impl Into<Vec<u8>>) -> Self {
        Self {
            extra_data: extra_data.into(),
            ..Self::default()
        }
    }
}
