//! at9-probe - ATRAC9 配置探测工具
//!
//! 解析 4 字节配置并输出流参数, 可选 JSON 格式.
//! 给出输入文件时, 额外统计其中完整超帧的数量和时长.

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::process;

use at9_codec::decoders::atrac9::{Atrac9Config, BlockKind};

/// ATRAC9 配置探测工具
#[derive(Parser, Debug)]
#[command(name = "at9-probe", version, about = "纯 Rust ATRAC9 配置探测工具")]
struct Cli {
    /// 4 字节配置, 8 位十六进制 (如 FE6422D0)
    #[arg(short, long)]
    config: String,

    /// 裸超帧流文件 (可选)
    input: Option<PathBuf>,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,
}

// ============================================================
// JSON 输出结构体
// ============================================================

/// 完整探测结果
#[derive(Serialize)]
struct ProbeOutput {
    config: ConfigInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<StreamInfo>,
}

/// 配置信息
#[derive(Serialize)]
struct ConfigInfo {
    config_hex: String,
    sample_rate_index: usize,
    sample_rate: u32,
    channel_config_index: usize,
    channels: usize,
    blocks: Vec<String>,
    frame_bytes: usize,
    frame_samples: usize,
    frames_per_superframe: usize,
    superframe_bytes: usize,
    superframe_samples: usize,
    high_sample_rate: bool,
    bit_rate: u64,
}

/// 流统计
#[derive(Serialize)]
struct StreamInfo {
    filename: String,
    size: u64,
    superframes: u64,
    trailing_bytes: u64,
    duration: f64,
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match Atrac9Config::from_hex(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("错误: {e}");
            process::exit(1);
        }
    };

    log::debug!("配置解析完成: {:?}", config);

    let stream = match &cli.input {
        Some(path) => match std::fs::metadata(path) {
            Ok(meta) => Some(build_stream_info(&config, path, meta.len())),
            Err(e) => {
                eprintln!("错误: 无法读取 '{}': {e}", path.display());
                process::exit(1);
            }
        },
        None => None,
    };

    let output = ProbeOutput {
        config: build_config_info(&config),
        stream,
    };

    if cli.json {
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("错误: JSON 序列化失败: {e}");
                process::exit(1);
            }
        }
    } else {
        print_config_text(&output.config);
        if let Some(stream) = &output.stream {
            print_stream_text(stream);
        }
    }
}

fn build_config_info(config: &Atrac9Config) -> ConfigInfo {
    let params = config.codec_parameters();
    ConfigInfo {
        config_hex: config.to_hex(),
        sample_rate_index: config.sample_rate_index,
        sample_rate: config.sample_rate,
        channel_config_index: config.channel_config_index,
        channels: config.channel_count,
        blocks: config.blocks.iter().map(BlockKind::to_string).collect(),
        frame_bytes: config.frame_bytes,
        frame_samples: config.frame_samples,
        frames_per_superframe: config.frames_per_superframe,
        superframe_bytes: config.superframe_bytes,
        superframe_samples: config.superframe_samples,
        high_sample_rate: config.high_sample_rate,
        bit_rate: params.bit_rate,
    }
}

fn build_stream_info(config: &Atrac9Config, path: &std::path::Path, size: u64) -> StreamInfo {
    let superframe_bytes = config.superframe_bytes as u64;
    let superframes = size / superframe_bytes;
    StreamInfo {
        filename: path.display().to_string(),
        size,
        superframes,
        trailing_bytes: size % superframe_bytes,
        duration: (superframes * config.superframe_samples as u64) as f64
            / f64::from(config.sample_rate),
    }
}

// ============================================================
// 文本输出
// ============================================================

fn print_config_text(info: &ConfigInfo) {
    println!("[CONFIG]");
    println!("  配置         : {}", info.config_hex);
    println!(
        "  采样率       : {} Hz (索引 {}{})",
        info.sample_rate,
        info.sample_rate_index,
        if info.high_sample_rate { ", 高采样率" } else { "" }
    );
    println!(
        "  声道         : {} (配置 {}: {})",
        info.channels,
        info.channel_config_index,
        info.blocks.join(" + ")
    );
    println!(
        "  帧           : {} 字节 / {} 采样",
        info.frame_bytes, info.frame_samples
    );
    println!(
        "  超帧         : {} 帧, {} 字节 / {} 采样",
        info.frames_per_superframe, info.superframe_bytes, info.superframe_samples
    );
    println!("  码率         : {} kbps", info.bit_rate / 1000);
    println!("[/CONFIG]");
    println!();
}

fn print_stream_text(info: &StreamInfo) {
    println!("[STREAM]");
    println!("  文件         : {}", info.filename);
    println!("  大小         : {} 字节", info.size);
    println!("  超帧数       : {}", info.superframes);
    if info.trailing_bytes > 0 {
        println!("  末尾多余     : {} 字节", info.trailing_bytes);
    }
    println!("  时长         : {:.3} 秒", info.duration);
    println!("[/STREAM]");
    println!();
}
