//! 裸超帧流解码.
//!
//! 输入文件是连续拼接的超帧, 每个超帧 `superframe_bytes` 字节.
//! 末尾不足一个超帧的数据会被报告并忽略.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use at9_codec::{Atrac9Config, Atrac9Decoder};

use crate::wav;

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// 16 位 PCM WAV
    Wav,
    /// 交错 s16le, 无文件头
    Raw,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Raw => "pcm",
        }
    }
}

/// 单个流的解码统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    /// 成功解码的超帧数
    pub superframes: usize,
    /// 每声道采样数
    pub samples: usize,
    /// 末尾被忽略的字节数
    pub trailing_bytes: usize,
}

/// 解码后的交错 PCM
#[derive(Debug)]
pub struct DecodedStream {
    pub samples: Vec<i16>,
    pub summary: DecodeSummary,
}

/// 由输入路径推导输出路径
pub fn output_path(input: &Path, output_dir: Option<&Path>, format: OutputFormat) -> PathBuf {
    let file_name = input.with_extension(format.extension());
    match (output_dir, file_name.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => file_name,
    }
}

/// 解码整个超帧流
///
/// 任一超帧解码失败即终止, 错误中注明超帧序号.
pub fn decode_stream(config: &Atrac9Config, data: &[u8]) -> Result<DecodedStream> {
    let mut decoder = Atrac9Decoder::new(config.clone())?;
    let mut planes = vec![vec![0i16; config.superframe_samples]; config.channel_count];

    let chunks = data.chunks_exact(config.superframe_bytes);
    let trailing_bytes = chunks.remainder().len();
    let mut samples = Vec::with_capacity(
        data.len() / config.superframe_bytes * config.superframe_samples * config.channel_count,
    );
    let mut summary = DecodeSummary {
        trailing_bytes,
        ..DecodeSummary::default()
    };

    for (index, superframe) in chunks.enumerate() {
        decoder
            .decode_superframe(superframe, &mut planes)
            .with_context(|| {
                format!(
                    "超帧 {} (偏移 {}) 解码失败",
                    index,
                    index * config.superframe_bytes
                )
            })?;
        interleave(&planes, config.superframe_samples, &mut samples);
        summary.superframes += 1;
        summary.samples += config.superframe_samples;
    }

    if trailing_bytes > 0 {
        warn!(
            "末尾 {} 字节不足一个超帧 ({} 字节), 已忽略",
            trailing_bytes, config.superframe_bytes
        );
    }
    Ok(DecodedStream { samples, summary })
}

fn interleave(planes: &[Vec<i16>], samples: usize, out: &mut Vec<i16>) {
    for i in 0..samples {
        for plane in planes {
            out.push(plane[i]);
        }
    }
}

/// 解码一个输入文件并写出结果
pub fn decode_file(
    config: &Atrac9Config,
    input: &Path,
    output: &Path,
    format: OutputFormat,
) -> Result<DecodeSummary> {
    let data = std::fs::read(input).with_context(|| format!("无法读取 '{}'", input.display()))?;
    debug!("{}: {} 字节", input.display(), data.len());

    let decoded = decode_stream(config, &data)
        .with_context(|| format!("'{}' 解码失败", input.display()))?;

    let file =
        File::create(output).with_context(|| format!("无法创建 '{}'", output.display()))?;
    let mut writer = BufWriter::new(file);
    match format {
        OutputFormat::Wav => wav::write_wav(
            &mut writer,
            config.sample_rate,
            config.channel_count as u16,
            &decoded.samples,
        ),
        OutputFormat::Raw => wav::write_pcm_s16le(&mut writer, &decoded.samples),
    }
    .and_then(|()| writer.flush())
    .with_context(|| format!("写入 '{}' 失败", output.display()))?;

    Ok(decoded.summary)
}
