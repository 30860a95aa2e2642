//! 比特流写入器.
//!
//! 按大端位序 (MSB first) 写入, 与 [`BitReader`](crate::bitreader::BitReader) 对应.
//! 解码器本身不需要写入, 测试和工具用它拼装配置字节与超帧码流.

use crate::bitreader::OffsetBias;

/// 比特流写入器
///
/// # 示例
/// ```
/// use at9_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b1011, 4);
/// bw.write_bits(0b0001, 4);
/// bw.write_bits(0b01010101, 8);
/// let data = bw.finish();
/// assert_eq!(data, vec![0b10110001, 0b01010101]);
/// ```
#[derive(Debug, Default)]
pub struct BitWriter {
    /// 输出缓冲区
    data: Vec<u8>,
    /// 当前字节 (正在填充)
    current_byte: u8,
    /// 当前字节中已填充的位数 (0-7)
    bit_count: u8,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.bit_count as usize
    }

    /// 写入 1 个位
    pub fn write_bool(&mut self, bit: bool) {
        self.current_byte = (self.current_byte << 1) | u8::from(bit);
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 写入 N 个位 (最多 32 位)
    ///
    /// 值的低 N 位被写入, 高位在前.
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);
        for i in (0..n).rev() {
            self.write_bool((value >> i) & 1 == 1);
        }
    }

    /// 写入有符号整数 (二进制补码)
    pub fn write_bits_signed(&mut self, value: i32, n: u32) {
        let mask = if n >= 32 { u32::MAX } else { (1u32 << n) - 1 };
        self.write_bits(value as u32 & mask, n);
    }

    /// 写入偏移二进制编码的有符号整数
    pub fn write_offset_binary(&mut self, value: i32, n: u32, bias: OffsetBias) {
        if n == 0 {
            return;
        }
        let offset = (1i32 << (n - 1)) - bias as i32;
        self.write_bits((value + offset) as u32, n);
    }

    /// 对齐到字节边界 (用 0 填充)
    pub fn align_to_byte(&mut self) {
        while self.bit_count != 0 {
            self.write_bool(false);
        }
    }

    /// 对齐后用 0 填充到指定字节数
    pub fn pad_to_bytes(&mut self, len: usize) {
        self.align_to_byte();
        if self.data.len() < len {
            self.data.resize(len, 0);
        }
    }

    /// 完成写入, 返回字节数据
    ///
    /// 如果当前不在字节边界, 自动用 0 填充.
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.data
    }
}
