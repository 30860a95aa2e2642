//! ATRAC9 端到端集成测试.
//!
//! 测试流程: 按字段合成超帧流 → 解码器 → PCM → 验证
//! 覆盖直接接口、流式接口以及多个流的并行解码.

use rayon::prelude::*;

use at9::codec::decoders::atrac9::huffman::{HuffmanCodebook, codebooks};
use at9::codec::decoders::atrac9::tables::{
    QUANT_UNIT_TO_CODEBOOK_INDEX, QUANT_UNIT_TO_COEFF_COUNT,
};
use at9::codec::{Atrac9Config, Atrac9Decoder, Decoder, Packet};
use at9::core::{At9Error, BitWriter, ChannelLayout};

// ============================================================
// 辅助函数
// ============================================================

/// 44100 Hz 立体声, 帧 279 字节, 每超帧 4 帧
const STEREO_44100: [u8; 4] = [0xFE, 0x64, 0x22, 0xD0];

/// 最小频带 (原始值 0) 对应的量化单元数
const MINIMAL_UNITS: usize = 10;

fn write_code(bw: &mut BitWriter, codebook: &HuffmanCodebook, symbol: u32) {
    let (code, len) = codebook.encode(symbol).unwrap();
    bw.write_bits(code, len);
}

/// 立体声静音块: 精度全 1, 系数全 0
fn write_silent_stereo_block(bw: &mut BitWriter, first: bool) {
    bw.write_bool(!first);
    bw.write_bool(!first);
    if first {
        bw.write_bits(0, 4);
        bw.write_bits(0, 4);
        bw.write_bool(false);
    }

    // 梯度模式 1, 起止值 31
    bw.write_bits(1, 2);
    bw.write_bits(1, 5);
    bw.write_bits(31, 5);
    bw.write_bits(0, 4);

    // 立体声参数: 主声道 0, 无强度立体声
    bw.write_bits(0, 1);
    bw.write_bool(false);
    // 无局部掩码
    bw.write_bool(false);

    for channel in 0..2 {
        bw.write_bits(1, 2);
        bw.write_bits(0, 2);
        if channel == 0 {
            bw.write_bits(0, 5);
            for _ in 0..MINIMAL_UNITS {
                bw.write_bits(0, 2);
            }
        } else {
            let codebook = codebooks().scale_factor_signed(2).unwrap();
            for _ in 0..MINIMAL_UNITS {
                write_code(bw, codebook, 0);
            }
        }
        for unit in 0..MINIMAL_UNITS {
            let codebook = codebooks()
                .spectrum(0, 2, QUANT_UNIT_TO_CODEBOOK_INDEX[unit])
                .unwrap();
            for _ in 0..QUANT_UNIT_TO_COEFF_COUNT[unit].div_ceil(codebook.value_count()) {
                write_code(bw, codebook, 0);
            }
        }
    }
    bw.align_to_byte();
}

fn silent_stereo_superframe(config: &Atrac9Config) -> Vec<u8> {
    let mut bw = BitWriter::new();
    for frame in 0..config.frames_per_superframe {
        write_silent_stereo_block(&mut bw, frame == 0);
    }
    bw.pad_to_bytes(config.superframe_bytes);
    bw.finish()
}

/// 单声道 44100 Hz, 每超帧 1 帧 64 字节
fn mono_config() -> Atrac9Config {
    Atrac9Config::from_bytes(&Atrac9Config::encode(6, 0, 64, 0).unwrap()).unwrap()
}

/// 单声道定长编码超帧: 比例因子全 28, 精度 8, 24 个 9 位系数
fn tone_superframe(config: &Atrac9Config, coefficients: &[i32]) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bool(false);
    bw.write_bool(false);
    bw.write_bits(0, 4);
    bw.write_bool(false);

    bw.write_bits(0, 2);
    bw.write_bits(1, 6);
    bw.write_bits(0, 6);
    bw.write_bits(20, 5);
    bw.write_bits(20, 5);
    bw.write_bits(0, 4);
    bw.write_bool(false);

    bw.write_bits(1, 2);
    bw.write_bits(3, 2);
    for _ in 0..MINIMAL_UNITS {
        bw.write_bits(28, 5);
    }
    for i in 0..24 {
        bw.write_bits_signed(coefficients.get(i).copied().unwrap_or(0), 9);
    }
    bw.pad_to_bytes(config.superframe_bytes);
    bw.finish()
}

/// 由种子生成一段单声道流
fn tone_stream(config: &Atrac9Config, seed: i32, superframes: usize) -> Vec<Vec<u8>> {
    (0..superframes)
        .map(|n| {
            let coefficients: Vec<i32> = (0..24)
                .map(|i| ((seed * 31 + n as i32 * 17 + i * 7) % 255) - 127)
                .collect();
            tone_superframe(config, &coefficients)
        })
        .collect()
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn decode_all(config: &Atrac9Config, superframes: &[Vec<u8>]) -> Vec<i16> {
    let mut decoder = Atrac9Decoder::new(config.clone()).unwrap();
    let mut pcm = vec![vec![0i16; config.superframe_samples]; config.channel_count];
    let mut out = Vec::new();
    for data in superframes {
        decoder.decode_superframe(data, &mut pcm).unwrap();
        out.extend_from_slice(&pcm[0]);
    }
    out
}

// ============================================================
// 直接接口
// ============================================================

#[test]
fn test_立体声静音流() {
    init_logging();
    let config = Atrac9Config::from_bytes(&STEREO_44100).unwrap();
    assert_eq!(config.channel_layout, ChannelLayout::STEREO);
    let data = silent_stereo_superframe(&config);
    assert_eq!(data.len(), 1116);

    let mut decoder = Atrac9Decoder::new(config.clone()).unwrap();
    let mut pcm = vec![vec![-7i16; 1024]; 2];
    for _ in 0..8 {
        decoder.decode_superframe(&data, &mut pcm).unwrap();
        assert!(pcm.iter().all(|plane| plane.len() == 1024));
        assert!(pcm.iter().flatten().all(|&s| s == 0));
    }
}

#[test]
fn test_单声道流输出确定() {
    let config = mono_config();
    let stream = tone_stream(&config, 3, 12);
    let first = decode_all(&config, &stream);
    let second = decode_all(&config, &stream);
    assert_eq!(first.len(), 12 * 256);
    assert_eq!(first, second);
    assert!(first.iter().any(|&s| s != 0));
}

#[test]
fn test_重置后与新解码器一致() {
    let config = mono_config();
    let stream = tone_stream(&config, 9, 4);
    let expected = decode_all(&config, &stream);

    let mut decoder = Atrac9Decoder::new(config.clone()).unwrap();
    let mut pcm = vec![vec![0i16; 256]];
    for data in tone_stream(&config, 1, 3) {
        decoder.decode_superframe(&data, &mut pcm).unwrap();
    }
    decoder.reset();

    let mut out = Vec::new();
    for data in &stream {
        decoder.decode_superframe(data, &mut pcm).unwrap();
        out.extend_from_slice(&pcm[0]);
    }
    assert_eq!(out, expected);
}

#[test]
fn test_损坏超帧不改写输出() {
    let config = Atrac9Config::from_bytes(&STEREO_44100).unwrap();
    let mut data = silent_stereo_superframe(&config);
    let first_frame_len = {
        let mut bw = BitWriter::new();
        write_silent_stereo_block(&mut bw, true);
        bw.finish().len()
    };
    // 第 2 帧的块首位: 置为首块
    data[first_frame_len] &= 0x7F;

    let mut decoder = Atrac9Decoder::new(config.clone()).unwrap();
    let mut pcm = vec![vec![42i16; 1024]; 2];
    let err = decoder.decode_superframe(&data, &mut pcm).unwrap_err();
    assert!(matches!(err, At9Error::InvalidData(_)));
    assert!(pcm.iter().flatten().all(|&s| s == 42));
}

// ============================================================
// 流式接口
// ============================================================

#[test]
fn test_流式接口解码整段流() {
    init_logging();
    let config = mono_config();
    let stream = tone_stream(&config, 5, 6);
    let expected = decode_all(&config, &stream);

    let mut decoder = Atrac9Decoder::create().unwrap();
    decoder.open(&config.codec_parameters()).unwrap();
    assert_eq!(decoder.name(), "atrac9");

    let mut out = Vec::new();
    let mut pts = Vec::new();
    for data in &stream {
        let packet = Packet::from_data(bytes::Bytes::from(data.clone()));
        decoder.send_packet(&packet).unwrap();
        let frame = decoder.receive_frame().unwrap();
        assert_eq!(frame.nb_samples, 256);
        assert_eq!(frame.channel_layout, ChannelLayout::MONO);
        pts.push(frame.pts);
        out.extend(frame.interleaved());
    }
    assert_eq!(out, expected);
    assert_eq!(pts, vec![0, 256, 512, 768, 1024, 1280]);

    decoder.send_packet(&Packet::empty()).unwrap();
    assert!(matches!(decoder.receive_frame(), Err(At9Error::Eof)));
}

// ============================================================
// 并行
// ============================================================

#[test]
fn test_多个解码器并行() {
    let config = mono_config();
    let streams: Vec<Vec<Vec<u8>>> = (0..8).map(|seed| tone_stream(&config, seed, 5)).collect();
    let sequential: Vec<Vec<i16>> = streams.iter().map(|s| decode_all(&config, s)).collect();
    let parallel: Vec<Vec<i16>> = streams.par_iter().map(|s| decode_all(&config, s)).collect();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_版本号() {
    assert_eq!(at9::version(), env!("CARGO_PKG_VERSION"));
}
