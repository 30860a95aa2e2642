//! 解码后的音频帧.

use at9_core::ChannelLayout;

use crate::packet::NOPTS_VALUE;

/// 音频帧
///
/// 平面 S16 格式: `data` 中每个 Vec 对应一个声道.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// 音频采样数据 (每声道一个 Vec)
    pub data: Vec<Vec<i16>>,
    /// 本帧包含的采样数 (每声道)
    pub nb_samples: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道布局
    pub channel_layout: ChannelLayout,
    /// 显示时间戳 (以采样为单位)
    pub pts: i64,
    /// 帧时长 (以采样为单位)
    pub duration: i64,
}

impl AudioFrame {
    /// 创建静音帧
    pub fn new(nb_samples: u32, sample_rate: u32, channel_layout: ChannelLayout) -> Self {
        Self {
            data: vec![vec![0; nb_samples as usize]; channel_layout.channels as usize],
            nb_samples,
            sample_rate,
            channel_layout,
            pts: NOPTS_VALUE,
            duration: i64::from(nb_samples),
        }
    }

    /// 转换为交错排列 (L R L R ...)
    pub fn interleaved(&self) -> Vec<i16> {
        let samples = self.nb_samples as usize;
        let mut out = Vec::with_capacity(samples * self.data.len());
        for i in 0..samples {
            for plane in &self.data {
                out.push(plane.get(i).copied().unwrap_or(0));
            }
        }
        out
    }
}
