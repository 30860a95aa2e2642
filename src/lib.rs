//! # at9
//!
//! 纯 Rust 实现的 ATRAC9 音频解码器.
//!
//! 以超帧为单位把 ATRAC9 码流解码为 16 位 PCM, 不依赖任何外部库或样本文件.
//!
//! **注意**: 内置 Huffman 码本是占位数据, 码字与正式格式不同.
//! 解码真实文件前需要用正式码本表构造 [`codec::decoders::atrac9::huffman::Codebooks`],
//! 并通过 [`codec::Atrac9Decoder::set_codebooks`] 装入 (见下例).
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use at9::codec::decoders::atrac9::huffman::Codebooks;
//! use at9::codec::{Atrac9Config, Atrac9Decoder};
//!
//! # fn load_codebooks(books: &mut Codebooks) -> at9::core::At9Result<()> { Ok(()) }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Atrac9Config::from_bytes(&[0xFE, 0x64, 0x22, 0xD0])?;
//! let mut decoder = Atrac9Decoder::new(config.clone())?;
//!
//! // 逐个替换为正式码本 (HuffmanCodebook::new + Codebooks::set_*)
//! let mut books = Codebooks::placeholder();
//! load_codebooks(&mut books)?;
//! decoder.set_codebooks(Arc::new(books));
//! let mut pcm = vec![vec![0i16; config.superframe_samples]; config.channel_count];
//!
//! let stream = std::fs::read("voice.at9")?;
//! for superframe in stream.chunks_exact(config.superframe_bytes) {
//!     decoder.decode_superframe(superframe, &mut pcm)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `at9-core` | 错误类型, 比特流读写, 声道布局 |
//! | `at9-codec` | ATRAC9 解码器与流式解码接口 |

/// 基础类型与比特流工具
pub use at9_core as core;

/// ATRAC9 解码器
pub use at9_codec as codec;

/// 获取 at9 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
