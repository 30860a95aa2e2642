//! 比特流读取器.
//!
//! 按大端位序 (MSB first) 从不可变字节缓冲区读取定长字段.
//!
//! 与通用读取器不同, 越过缓冲区末尾的读取不会失败, 而是补零并照常推进位置.
//! Huffman 解码需要先窥视最长码长的位数, 码流末尾的短码因此也能正常解出;
//! 调用方在一帧结束后通过 [`BitReader::is_overrun`] 判断是否真的读越界.

/// 偏移二进制读取的偏置
///
/// `read_offset_binary(n, bias)` 返回 `raw - (2^(n-1) - bias as i32)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetBias {
    /// 范围 [-2^(n-1), 2^(n-1)-1]
    Negative = 0,
    /// 范围 [-(2^(n-1)-1), 2^(n-1)]
    Positive = 1,
}

/// 比特流读取器
///
/// # 示例
/// ```
/// use at9_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4), 0b1011);
/// assert_eq!(br.peek_bits(4), 0b0001);
/// assert_eq!(br.read_bits(12), 0b0001_0101_0101);
/// // 越界读取补零
/// assert_eq!(br.read_bits(8), 0);
/// assert!(br.is_overrun());
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前位位置
    position: usize,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// 当前位位置
    pub fn position(&self) -> usize {
        self.position
    }

    /// 设置位位置
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// 缓冲区总位数
    pub fn len_bits(&self) -> usize {
        self.data.len() * 8
    }

    /// 剩余可读位数 (越界后为 0)
    pub fn bits_left(&self) -> usize {
        self.len_bits().saturating_sub(self.position)
    }

    /// 位置是否已越过缓冲区末尾
    pub fn is_overrun(&self) -> bool {
        self.position > self.len_bits()
    }

    /// 窥视 N 个位 (不移动位置, 最多 32 位)
    pub fn peek_bits(&self, n: u32) -> u32 {
        debug_assert!(n <= 32, "peek_bits: n={} 超过 32 位", n);
        if n == 0 {
            return 0;
        }

        let byte_index = self.position / 8;
        let bit_index = self.position % 8;

        // 40 位窗口可覆盖任意位偏移下的 32 位
        let mut window = 0u64;
        for i in 0..5 {
            let byte = self
                .data
                .get(byte_index.saturating_add(i))
                .copied()
                .unwrap_or(0);
            window = (window << 8) | u64::from(byte);
        }

        let shift = 40 - bit_index - n as usize;
        ((window >> shift) & ((1u64 << n) - 1)) as u32
    }

    /// 读取 N 个位 (最多 32 位)
    pub fn read_bits(&mut self, n: u32) -> u32 {
        let value = self.peek_bits(n);
        self.position = self.position.saturating_add(n as usize);
        value
    }

    /// 读取 1 个位
    pub fn read_bool(&mut self) -> bool {
        self.read_bits(1) == 1
    }

    /// 读取有符号整数 (二进制补码)
    pub fn read_bits_signed(&mut self, n: u32) -> i32 {
        let value = self.read_bits(n);
        sign_extend(value, n)
    }

    /// 读取偏移二进制编码的有符号整数 (最多 31 位)
    pub fn read_offset_binary(&mut self, n: u32, bias: OffsetBias) -> i32 {
        debug_assert!(n <= 31, "read_offset_binary: n={} 超过 31 位", n);
        if n == 0 {
            return 0;
        }
        let offset = (1i64 << (n - 1)) - bias as i64;
        (i64::from(self.read_bits(n)) - offset) as i32
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: usize) {
        self.position = self.position.saturating_add(n);
    }

    /// 对齐到 `multiple` 位的整数倍
    pub fn align_position(&mut self, multiple: usize) {
        if multiple == 0 {
            return;
        }
        let rem = self.position % multiple;
        if rem != 0 {
            self.position += multiple - rem;
        }
    }

    /// 对齐到下一个字节边界
    pub fn align_to_byte(&mut self) {
        self.align_position(8);
    }

    /// 获取底层数据的引用
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

/// 将低 `bits` 位视为二进制补码并符号扩展
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    match bits {
        0 => 0,
        32.. => value as i32,
        _ => {
            let shift = 32 - bits;
            ((value << shift) as i32) >> shift
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_basic() {
        let data = [0b10110001, 0b01010101];
        let mut br = BitReader::new(&data);

        assert!(br.read_bool());
        assert!(!br.read_bool());
        assert_eq!(br.read_bits(2), 0b11);
        assert_eq!(br.read_bits(4), 0b0001);
        assert_eq!(br.read_bits(8), 0b01010101);
        assert_eq!(br.bits_left(), 0);
        assert!(!br.is_overrun());
    }

    #[test]
    fn test_read_bits_32_bit_unaligned() {
        let data = [0x0F, 0xF0, 0x0F, 0xF0, 0xFF];
        let mut br = BitReader::new(&data);
        br.skip_bits(4);
        assert_eq!(br.read_bits(32), 0xFF00FF0F);
    }

    #[test]
    fn test_read_bits_signed() {
        let data = [0b11111010, 0b10000000];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits_signed(5), -1);
        assert_eq!(br.read_bits_signed(5), 10);
        assert_eq!(br.read_bits_signed(0), 0);
    }

    #[test]
    fn test_read_offset_binary() {
        // 5 位原始值 3, 负偏置: 3 - 16 = -13
        let data = [0b00011000];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_offset_binary(5, OffsetBias::Negative), -13);

        // 5 位原始值 31, 正偏置: 31 - 15 = 16
        let data = [0b11111000];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_offset_binary(5, OffsetBias::Positive), 16);
    }

    #[test]
    fn test_read_offset_binary_31_位边界() {
        let data = [0xFF; 4];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_offset_binary(31, OffsetBias::Positive), 1 << 30);

        let data = [0x00; 4];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_offset_binary(31, OffsetBias::Negative), -(1 << 30));
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_offset_binary(31, OffsetBias::Positive), -(1 << 30) + 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "超过 31 位")]
    fn test_read_offset_binary_拒绝_32_位() {
        let data = [0xFF; 4];
        let mut br = BitReader::new(&data);
        br.read_offset_binary(32, OffsetBias::Positive);
    }

    #[test]
    fn test_peek_不移动位置() {
        let data = [0b10110001];
        let mut br = BitReader::new(&data);

        assert_eq!(br.peek_bits(4), 0b1011);
        assert_eq!(br.peek_bits(4), 0b1011);
        assert_eq!(br.read_bits(4), 0b1011);
        assert_eq!(br.peek_bits(4), 0b0001);
    }

    #[test]
    fn test_越界读取补零() {
        let data = [0xFF];
        let mut br = BitReader::new(&data);
        br.skip_bits(4);
        // 4 位有效数据 + 4 位补零
        assert_eq!(br.peek_bits(8), 0xF0);
        assert_eq!(br.read_bits(12), 0xF00);
        assert_eq!(br.position(), 16);
        assert!(br.is_overrun());
        assert_eq!(br.bits_left(), 0);
        assert_eq!(br.read_bits(32), 0);
    }

    #[test]
    fn test_align_position() {
        let data = [0u8; 4];
        let mut br = BitReader::new(&data);

        br.read_bits(3);
        br.align_to_byte();
        assert_eq!(br.position(), 8);
        br.align_to_byte();
        assert_eq!(br.position(), 8);

        br.skip_bits(1);
        br.align_position(16);
        assert_eq!(br.position(), 16);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0b11, 2), -1);
        assert_eq!(sign_extend(0b10, 2), -2);
        assert_eq!(sign_extend(0b01, 2), 1);
        assert_eq!(sign_extend(0xFFFF_FFFF, 32), -1);
    }
}
