//! 解码器实现.

pub mod atrac9;
