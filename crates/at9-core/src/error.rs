//! 统一错误类型定义.
//!
//! 解码器各阶段共用的错误类型, 按来源分为配置错误、码流结构错误和容量错误三类,
//! 另有供流式解码接口使用的通用变体.

use thiserror::Error;

/// ATRAC9 统一错误类型
#[derive(Debug, Error)]
pub enum At9Error {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 编解码器状态错误
    #[error("编解码器错误: {0}")]
    Codec(String),

    /// 4 字节配置无效 (打开流时拒绝)
    #[error("无效配置: {0}")]
    InvalidConfig(String),

    /// 无效数据 (损坏的码流, 越界字段等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 调用方提供的缓冲区容量不足
    #[error("缓冲区不足: {what} 需要 {required}, 实际 {actual}")]
    BufferTooSmall {
        /// 缓冲区名称
        what: &'static str,
        /// 所需大小
        required: usize,
        /// 实际大小
        actual: usize,
    },

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据不足, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,
}

/// ATRAC9 统一 Result 类型
pub type At9Result<T> = Result<T, At9Error>;
