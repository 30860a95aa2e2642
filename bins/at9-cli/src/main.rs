//! at9-cli - ATRAC9 解码命令行工具
//!
//! 把裸超帧流 (无容器, 超帧首尾相接) 解码为 WAV 或原始 PCM.
//! 多个输入文件彼此独立, 在 rayon 线程池上并行解码.

mod decode;
mod logging;
mod wav;

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use tracing::{error, info};

use at9_codec::Atrac9Config;

use decode::{DecodeSummary, OutputFormat, decode_file, output_path};

#[derive(Parser, Debug)]
#[command(name = "at9-cli", version, about = "纯 Rust ATRAC9 解码工具")]
struct Cli {
    /// 4 字节配置, 8 位十六进制 (如 FE6422D0)
    #[arg(short, long, value_parser = Atrac9Config::from_hex)]
    config: Atrac9Config,

    /// 输出目录 (默认与输入文件同目录)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 输出交错 s16le 原始 PCM, 而不是 WAV
    #[arg(long)]
    raw: bool,

    /// 并行解码的线程数 (默认按 CPU 核数)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// 输入文件 (裸超帧流)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init("at9-cli", cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    match run(&cli) {
        Ok(0) => {}
        Ok(failed) => {
            eprintln!("{} / {} 个文件解码失败", failed, cli.inputs.len());
            process::exit(1);
        }
        Err(e) => {
            eprintln!("错误: {e:#}");
            process::exit(1);
        }
    }
}

/// 返回失败的文件数
fn run(cli: &Cli) -> Result<usize> {
    let config = &cli.config;
    let format = if cli.raw {
        OutputFormat::Raw
    } else {
        OutputFormat::Wav
    };
    if let Some(dir) = &cli.output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("无法创建输出目录 '{}'", dir.display()))?;
    }

    info!(
        "at9-cli {}: {} 个输入, {} Hz, {} 声道, 超帧 {} 字节",
        env!("CARGO_PKG_VERSION"),
        cli.inputs.len(),
        config.sample_rate,
        config.channel_count,
        config.superframe_bytes
    );

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = cli.jobs {
        builder = builder.num_threads(jobs);
    }
    let pool = builder.build().context("创建线程池失败")?;

    let results: Vec<(PathBuf, Result<DecodeSummary>)> = pool.install(|| {
        cli.inputs
            .par_iter()
            .map(|input| {
                let output = output_path(input, cli.output.as_deref(), format);
                let result = decode_file(config, input, &output, format);
                (output, result)
            })
            .collect()
    });

    let mut failed = 0;
    for (output, result) in results {
        match result {
            Ok(summary) => {
                let seconds = summary.samples as f64 / f64::from(config.sample_rate);
                info!(
                    "{}: {} 个超帧, {:.2} 秒",
                    output.display(),
                    summary.superframes,
                    seconds
                );
                println!(
                    "{} ({} 个超帧, {:.2} 秒)",
                    output.display(),
                    summary.superframes,
                    seconds
                );
            }
            Err(e) => {
                error!("{:#}", e);
                eprintln!("错误: {e:#}");
                failed += 1;
            }
        }
    }
    Ok(failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_命令行参数() {
        let cli =
            Cli::try_parse_from(["at9-cli", "-c", "FE6422D0", "--raw", "a.at9", "b.at9"]).unwrap();
        assert_eq!(cli.config.to_hex(), "FE6422D0");
        assert_eq!(cli.config.superframe_bytes, 1116);
        assert!(cli.raw);
        assert_eq!(cli.inputs.len(), 2);
        assert!(Cli::try_parse_from(["at9-cli", "-c", "FE6422D0"]).is_err());
        assert!(Cli::try_parse_from(["at9-cli", "-c", "FE6422", "a.at9"]).is_err());
        // 校验位非零
        assert!(Cli::try_parse_from(["at9-cli", "-c", "FE6522D0", "a.at9"]).is_err());
    }

    #[test]
    fn test_批量解码统计失败数() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.at9");
        let cli = Cli {
            config: Atrac9Config::from_hex("FE6422D0").unwrap(),
            output: Some(dir.path().join("out")),
            raw: false,
            jobs: Some(2),
            verbose: 0,
            inputs: vec![missing.clone(), missing],
        };
        assert_eq!(run(&cli).unwrap(), 2);
        assert!(dir.path().join("out").is_dir());
    }
}
