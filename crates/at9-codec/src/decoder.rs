//! 解码器 trait 定义.
//!
//! 所有解码器实现必须实现 `Decoder` trait.

use at9_core::At9Result;

use crate::codec_parameters::CodecParameters;
use crate::frame::AudioFrame;
use crate::packet::Packet;

/// 解码器 trait
///
/// 解码流程:
/// 1. 调用 `open()` 提供流参数 (ATRAC9 需要 4 字节配置)
/// 2. 调用 `send_packet()` 送入压缩数据
/// 3. 调用 `receive_frame()` 取出解码后的帧
/// 4. 送入空包 (flush) 后, `receive_frame()` 返回 `Eof`
pub trait Decoder: Send {
    /// 获取解码器名称
    fn name(&self) -> &str;

    /// 使用参数配置解码器
    fn open(&mut self, params: &CodecParameters) -> At9Result<()>;

    /// 送入一个压缩数据包进行解码
    ///
    /// # 返回
    /// - `Ok(())`: 数据包已接受
    /// - `Err(At9Error::NeedMoreData)`: 已有待取出的帧, 需要先调用 `receive_frame()`
    fn send_packet(&mut self, packet: &Packet) -> At9Result<()>;

    /// 从解码器取出一帧解码数据
    ///
    /// # 返回
    /// - `Err(At9Error::NeedMoreData)`: 需要送入更多数据包
    /// - `Err(At9Error::Eof)`: 所有帧已取出
    fn receive_frame(&mut self) -> At9Result<AudioFrame>;

    /// 刷新解码器, 清空内部状态
    ///
    /// 用于 seek 后重置解码器状态.
    fn flush(&mut self);
}
