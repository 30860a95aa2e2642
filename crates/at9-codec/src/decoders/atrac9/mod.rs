//! ATRAC9 音频解码器.
//!
//! 以超帧为单位把 ATRAC9 码流解码为 16 位 PCM.
//!
//! # 解码流程
//! 1. 解析 4 字节配置 (采样率, 声道配置, 帧字节数, 超帧帧数)
//! 2. 逐帧解析各块的频带/梯度/立体声/扩展参数
//! 3. 比例因子解码 (定长, VLC 差分, 帧间或跨声道基线)
//! 4. 比特分配: 梯度 + 局部掩码 → 每单元精度
//! 5. Huffman/定长读取量化系数, 反量化
//! 6. 强度立体声, 按比例因子缩放, 频带扩展 (可替换)
//! 7. IMDCT + 加窗 + overlap-add
//! 8. 四舍五入并饱和到 i16

pub mod band_extension;
mod bit_allocation;
mod block;
mod config;
pub mod huffman;
mod imdct;
mod quantization;
mod scale_factors;
mod spectrum;
mod stereo;
pub mod tables;
mod unpack;


use std::sync::Arc;

use at9_core::{At9Error, At9Result, BitReader};
use log::{debug, trace};

use crate::codec_parameters::CodecParameters;
use crate::decoder::Decoder;
use crate::frame::AudioFrame;
use crate::packet::{NOPTS_VALUE, Packet};

use band_extension::{BandExtension, PassThrough};
use block::Block;
use huffman::Codebooks;

pub use config::{Atrac9Config, BlockKind, CONFIG_SIZE};
pub use imdct::Imdct;

/// ATRAC9 解码器
pub struct Atrac9Decoder {
    config: Option<Atrac9Config>,
    /// 按声道配置顺序排列的块, 持有跨帧状态
    blocks: Vec<Block>,
    band_extension: Box<dyn BandExtension>,
    /// Huffman 码本, 默认共享内置占位码本
    codebooks: Arc<Codebooks>,
    /// 超帧 PCM 暂存, 整个超帧成功后才写给调用方
    staging: Vec<Vec<i16>>,
    output_frame: Option<AudioFrame>,
    opened: bool,
    flushing: bool,
    next_pts: i64,
}

impl Atrac9Decoder {
    /// 创建未打开的解码器实例 (配置由 `open` 提供)
    pub fn create() -> At9Result<Box<dyn Decoder>> {
        Ok(Box::new(Self::unopened()))
    }

    /// 以已解析的配置创建解码器
    pub fn new(config: Atrac9Config) -> At9Result<Self> {
        let mut decoder = Self::unopened();
        decoder.configure(config)?;
        Ok(decoder)
    }

    fn unopened() -> Self {
        Self {
            config: None,
            blocks: Vec::new(),
            band_extension: Box::new(PassThrough),
            codebooks: huffman::shared_codebooks(),
            staging: Vec::new(),
            output_frame: None,
            opened: false,
            flushing: false,
            next_pts: 0,
        }
    }

    fn configure(&mut self, config: Atrac9Config) -> At9Result<()> {
        self.blocks = config
            .blocks
            .iter()
            .enumerate()
            .map(|(index, &kind)| Block::new(&config, index, kind))
            .collect::<At9Result<Vec<_>>>()?;
        self.staging = vec![vec![0; config.superframe_samples]; config.channel_count];
        self.band_extension.reset();
        self.output_frame = None;
        self.flushing = false;
        self.next_pts = 0;
        self.config = Some(config);
        self.opened = true;
        Ok(())
    }

    /// 当前流配置 (未打开时为 `None`)
    pub fn config(&self) -> Option<&Atrac9Config> {
        self.config.as_ref()
    }

    /// 替换频带扩展实现
    pub fn set_band_extension(&mut self, stage: Box<dyn BandExtension>) {
        debug!("ATRAC9: 频带扩展实现 {}", stage.name());
        self.band_extension = stage;
    }

    /// 替换 Huffman 码本 (跨 `reset` 与重新打开保留)
    ///
    /// 内置码本是占位数据, 解码真实码流前需要用完整的码本表替换.
    pub fn set_codebooks(&mut self, codebooks: Arc<Codebooks>) {
        debug!("ATRAC9: 替换 Huffman 码本");
        self.codebooks = codebooks;
    }

    /// 当前使用的 Huffman 码本
    pub fn codebooks(&self) -> &Codebooks {
        &self.codebooks
    }

    /// 流重新初始化: 清空所有跨帧状态
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            block.reset();
        }
        self.band_extension.reset();
    }

    /// 解码一个超帧
    ///
    /// `data` 至少包含 `superframe_bytes` 字节, 多余部分忽略.
    /// `pcm` 每个声道一个缓冲区, 每个至少 `superframe_samples` 个采样.
    /// 出错时 `pcm` 保持不变.
    pub fn decode_superframe(&mut self, data: &[u8], pcm: &mut [Vec<i16>]) -> At9Result<()> {
        let Some(config) = self.config.as_ref() else {
            return Err(At9Error::Codec("ATRAC9 解码器未打开".into()));
        };
        check_capacity(config, data.len(), pcm)?;

        let mut br = BitReader::new(&data[..config.superframe_bytes]);
        for frame_index in 0..config.frames_per_superframe {
            decode_frame(
                &mut br,
                config,
                &self.codebooks,
                &mut self.blocks,
                self.band_extension.as_mut(),
                frame_index,
            )?;
            if br.is_overrun() {
                return Err(At9Error::InvalidData(format!(
                    "帧 {} 读取越过超帧末尾: 位置 {} > {} 位",
                    frame_index,
                    br.position(),
                    br.len_bits()
                )));
            }
            write_frame_pcm(config, &self.blocks, frame_index, &mut self.staging);
            br.align_position(8);
        }

        for (out, staged) in pcm.iter_mut().zip(&self.staging) {
            out[..config.superframe_samples].copy_from_slice(staged);
        }
        trace!(
            "ATRAC9 超帧解码完成: 读取 {} / {} 字节",
            br.position() / 8,
            config.superframe_bytes
        );
        Ok(())
    }
}

/// 调用方缓冲区容量检查 (在任何解析之前)
fn check_capacity(config: &Atrac9Config, data_len: usize, pcm: &[Vec<i16>]) -> At9Result<()> {
    if data_len < config.superframe_bytes {
        return Err(At9Error::BufferTooSmall {
            what: "超帧数据",
            required: config.superframe_bytes,
            actual: data_len,
        });
    }
    if pcm.len() < config.channel_count {
        return Err(At9Error::BufferTooSmall {
            what: "PCM 声道数",
            required: config.channel_count,
            actual: pcm.len(),
        });
    }
    if let Some(short) = pcm
        .iter()
        .take(config.channel_count)
        .find(|plane| plane.len() < config.superframe_samples)
    {
        return Err(At9Error::BufferTooSmall {
            what: "PCM 声道采样数",
            required: config.superframe_samples,
            actual: short.len(),
        });
    }
    Ok(())
}

/// 解码一帧: 先解析所有块, 再逐块重建
fn decode_frame(
    br: &mut BitReader,
    config: &Atrac9Config,
    codebooks: &Codebooks,
    blocks: &mut [Block],
    band_extension: &mut dyn BandExtension,
    frame_index: usize,
) -> At9Result<()> {
    for block in blocks.iter_mut() {
        unpack::unpack_block(br, block, config, codebooks, frame_index)?;
    }

    for block in blocks.iter_mut() {
        for channel in &mut block.channels {
            quantization::dequantize_spectra(
                channel.coded_units,
                &channel.precisions,
                &channel.precisions_fine,
                &channel.quantized_spectra,
                &channel.quantized_spectra_fine,
                &mut channel.spectra,
            );
        }

        stereo::apply_intensity_stereo(block);

        for channel in &mut block.channels {
            quantization::scale_spectrum(
                block.unit_count,
                &channel.scale_factors,
                &mut channel.spectra,
            );
            if block.band_extension_enabled {
                band_extension.apply(&block.extension, channel.index, &mut channel.spectra)?;
            }
            channel.imdct.run(&channel.spectra, &mut channel.pcm)?;
        }
    }
    Ok(())
}

/// 把一帧的浮点输出写入超帧暂存区 (按块/声道顺序)
fn write_frame_pcm(
    config: &Atrac9Config,
    blocks: &[Block],
    frame_index: usize,
    staging: &mut [Vec<i16>],
) {
    let start = frame_index * config.frame_samples;
    let end = start + config.frame_samples;
    let channels = blocks.iter().flat_map(|block| block.channels.iter());
    for (plane, channel) in staging.iter_mut().zip(channels) {
        for (out, &sample) in plane[start..end].iter_mut().zip(&channel.pcm) {
            *out = to_pcm16(sample);
        }
    }
}

/// 四舍五入 (向上取半) 并饱和到 i16
fn to_pcm16(sample: f64) -> i16 {
    (sample + 0.5)
        .floor()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

// ============================================================
// Decoder trait 实现
// ============================================================

impl Decoder for Atrac9Decoder {
    fn name(&self) -> &str {
        "atrac9"
    }

    fn open(&mut self, params: &CodecParameters) -> At9Result<()> {
        let config = Atrac9Config::from_bytes(&params.extra_data)?;
        if let Some(audio) = &params.audio {
            if audio.sample_rate != 0 && audio.sample_rate != config.sample_rate {
                debug!(
                    "ATRAC9: 容器采样率 {} 与配置 {} 不一致, 以配置为准",
                    audio.sample_rate, config.sample_rate
                );
            }
        }
        self.configure(config)
    }

    fn send_packet(&mut self, packet: &Packet) -> At9Result<()> {
        if !self.opened {
            return Err(At9Error::Codec("ATRAC9 解码器未打开".into()));
        }
        if packet.is_empty() {
            self.flushing = true;
            return Ok(());
        }
        if self.output_frame.is_some() {
            return Err(At9Error::NeedMoreData);
        }
        let Some(config) = self.config.as_ref() else {
            return Err(At9Error::Codec("ATRAC9 解码器未打开".into()));
        };

        let mut frame = AudioFrame::new(
            config.superframe_samples as u32,
            config.sample_rate,
            config.channel_layout,
        );
        if let Err(e) = self.decode_superframe(&packet.data, &mut frame.data) {
            debug!("ATRAC9 超帧解码失败: {}", e);
            return Err(e);
        }

        frame.pts = if packet.pts != NOPTS_VALUE {
            packet.pts
        } else {
            self.next_pts
        };
        self.next_pts = frame.pts + frame.duration;
        self.output_frame = Some(frame);
        Ok(())
    }

    fn receive_frame(&mut self) -> At9Result<AudioFrame> {
        if let Some(frame) = self.output_frame.take() {
            Ok(frame)
        } else if self.flushing {
            Err(At9Error::Eof)
        } else {
            Err(At9Error::NeedMoreData)
        }
    }

    fn flush(&mut self) {
        self.output_frame = None;
        self.flushing = false;
        self.next_pts = 0;
        self.reset();
    }
}
