//! # at9-core
//!
//! ATRAC9 解码器的基础库, 提供错误类型、比特流读写器和声道布局.
//!
//! 本 crate 不依赖任何编解码逻辑, 供 `at9-codec` 与命令行工具共用.

pub mod bitreader;
pub mod bitwriter;
pub mod channel_layout;
pub mod error;

// 重导出常用类型
pub use bitreader::{BitReader, OffsetBias};
pub use bitwriter::BitWriter;
pub use channel_layout::{ChannelLayout, ChannelMask};
pub use error::{At9Error, At9Result};
