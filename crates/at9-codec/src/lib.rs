//! # at9-codec
//!
//! ATRAC9 解码器, 以及它所实现的编解码器框架抽象 (Decoder/Packet/Frame).
//!
//! ## 使用示例
//!
//! ```rust
//! use at9_codec::decoders::atrac9::{Atrac9Config, Atrac9Decoder};
//!
//! let config = Atrac9Config::from_bytes(&[0xFE, 0x64, 0x22, 0xD0]).unwrap();
//! let mut decoder = Atrac9Decoder::new(config.clone()).unwrap();
//! let mut pcm = vec![vec![0i16; config.superframe_samples]; config.channel_count];
//!
//! // 每次传入一个完整超帧
//! let superframe = vec![0u8; config.superframe_bytes];
//! let _ = decoder.decode_superframe(&superframe, &mut pcm);
//! ```
//!
//! ## Huffman 码本
//!
//! 内置的 Huffman 码本是占位数据: 符号数与分组结构符合格式, 码字不同,
//! 真实 ATRAC9 文件会解码失败或输出噪声. 取得正式码本表后用
//! [`Atrac9Decoder::set_codebooks`] 装入, 构造方式见
//! [`decoders::atrac9::huffman`].

pub mod codec_parameters;
pub mod decoder;
pub mod decoders;
pub mod frame;
pub mod packet;

// 重导出常用类型
pub use codec_parameters::{AudioCodecParams, CodecParameters};
pub use decoder::Decoder;
pub use decoders::atrac9::{Atrac9Config, Atrac9Decoder};
pub use frame::AudioFrame;
pub use packet::Packet;
