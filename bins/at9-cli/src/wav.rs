//! WAV (RIFF WAVE) 与原始 PCM 写入.
//!
//! 解码结果一次性写出, 长度已知, 因此头部无需回填.

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

/// WAV 音频格式码: PCM 整数
const WAV_FORMAT_PCM: u16 = 0x0001;

/// 每个采样的位数
const BITS_PER_SAMPLE: u16 = 16;

/// WAV 头部长度 (RIFF + fmt + data 块头)
pub const WAV_HEADER_SIZE: usize = 44;

/// 写入 16 位 PCM WAV
///
/// `samples` 为交错排列的采样.
pub fn write_wav<W: Write>(
    writer: &mut W,
    sample_rate: u32,
    channels: u16,
    samples: &[i16],
) -> io::Result<()> {
    let data_size = u32::try_from(samples.len() * 2)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "WAV 数据超过 4 GiB"))?;
    let block_align = channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * u32::from(block_align);

    // RIFF header
    writer.write_all(b"RIFF")?;
    writer.write_u32::<LittleEndian>(36 + data_size)?;
    writer.write_all(b"WAVE")?;

    // fmt chunk
    writer.write_all(b"fmt ")?;
    writer.write_u32::<LittleEndian>(16)?;
    writer.write_u16::<LittleEndian>(WAV_FORMAT_PCM)?;
    writer.write_u16::<LittleEndian>(channels)?;
    writer.write_u32::<LittleEndian>(sample_rate)?;
    writer.write_u32::<LittleEndian>(byte_rate)?;
    writer.write_u16::<LittleEndian>(block_align)?;
    writer.write_u16::<LittleEndian>(BITS_PER_SAMPLE)?;

    // data chunk
    writer.write_all(b"data")?;
    writer.write_u32::<LittleEndian>(data_size)?;
    write_pcm_s16le(writer, samples)
}

/// 写入交错 s16le 采样
pub fn write_pcm_s16le<W: Write>(writer: &mut W, samples: &[i16]) -> io::Result<()> {
    for &sample in samples {
        writer.write_i16::<LittleEndian>(sample)?;
    }
    Ok(())
}
