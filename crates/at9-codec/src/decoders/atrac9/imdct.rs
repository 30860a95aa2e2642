//! ATRAC9 IMDCT (逆修正离散余弦变换).
//!
//! 先做 N 点 DCT-IV (一次预旋转 + log2(N)-1 级蝶形 + 位反转重排),
//! 再与合成窗和上一帧保存的历史做 50% 重叠相加, 输出 N 个时域样本.
//!
//! 各尺寸的正弦/余弦/重排表在进程内只生成一次, 所有声道共享.

use std::f64::consts::PI;
use std::sync::OnceLock;

use at9_core::{At9Error, At9Result};

use super::tables;

/// 支持的最大变换位数 (256 点)
const MAX_BITS: u32 = 8;

/// 各尺寸 (2^0..=2^8) 的三角函数表与重排表
struct TrigTables {
    sin: Vec<Vec<f64>>,
    cos: Vec<Vec<f64>>,
    shuffle: Vec<Vec<usize>>,
}

static TRIG_TABLES: OnceLock<TrigTables> = OnceLock::new();

fn trig_tables() -> &'static TrigTables {
    TRIG_TABLES.get_or_init(|| {
        let mut sin = Vec::with_capacity(MAX_BITS as usize + 1);
        let mut cos = Vec::with_capacity(MAX_BITS as usize + 1);
        let mut shuffle = Vec::with_capacity(MAX_BITS as usize + 1);
        for bits in 0..=MAX_BITS {
            let size = 1usize << bits;
            let angles: Vec<f64> = (0..size)
                .map(|i| PI * (4 * i + 1) as f64 / (4 * size) as f64)
                .collect();
            sin.push(angles.iter().map(|a| a.sin()).collect());
            cos.push(angles.iter().map(|a| a.cos()).collect());
            shuffle.push(
                (0..size)
                    .map(|i| bit_reverse(i ^ (i / 2), bits))
                    .collect(),
            );
        }
        TrigTables { sin, cos, shuffle }
    })
}

fn bit_reverse(value: usize, bits: u32) -> usize {
    if bits == 0 {
        return 0;
    }
    (value as u32).reverse_bits() as usize >> (32 - bits)
}

/// 单声道 IMDCT 状态
///
/// 历史缓冲在整个流的生命周期内保留, 仅在 [`Imdct::reset`] 时清零.
#[derive(Debug, Clone)]
pub struct Imdct {
    bits: u32,
    size: usize,
    scale: f64,
    window: &'static [f64],
    previous: Vec<f64>,
    dct_out: Vec<f64>,
    dct_temp: Vec<f64>,
}

impl Imdct {
    /// 创建 2^bits 点 IMDCT (bits 取 6/7/8)
    pub fn new(bits: u32) -> At9Result<Self> {
        if !(6..=MAX_BITS).contains(&bits) {
            return Err(At9Error::InvalidArgument(format!(
                "不支持的 IMDCT 尺寸: 2^{}",
                bits
            )));
        }
        let size = 1usize << bits;
        Ok(Self {
            bits,
            size,
            scale: 1.0,
            window: &tables::derived().imdct_windows[(bits - 6) as usize],
            previous: vec![0.0; size],
            dct_out: vec![0.0; size],
            dct_temp: vec![0.0; size],
        })
    }

    /// 变换尺寸
    pub fn size(&self) -> usize {
        self.size
    }

    /// 重叠相加历史
    pub fn history(&self) -> &[f64] {
        &self.previous
    }

    /// 清空历史 (流重新初始化)
    pub fn reset(&mut self) {
        self.previous.fill(0.0);
    }

    /// 频域 → 时域, 并更新历史
    pub fn run(&mut self, input: &[f64], output: &mut [f64]) -> At9Result<()> {
        let size = self.size;
        if input.len() < size || output.len() < size {
            return Err(At9Error::InvalidArgument(format!(
                "IMDCT 缓冲区长度不足: 输入 {}, 输出 {}, 需要 {}",
                input.len(),
                output.len(),
                size
            )));
        }
        let half = size / 2;

        let mut dct_out = std::mem::take(&mut self.dct_out);
        self.dct4(&input[..size], &mut dct_out);

        let window = self.window;
        let previous = &mut self.previous;
        for i in 0..half {
            output[i] = window[i] * dct_out[i + half] + previous[i];
            output[i + half] = window[i + half] * -dct_out[size - 1 - i] - previous[i + half];
            previous[i] = window[size - 1 - i] * -dct_out[half - i - 1];
            previous[i + half] = window[half - i - 1] * dct_out[i];
        }

        self.dct_out = dct_out;
        Ok(())
    }

    /// 未归一化 DCT-IV: `X[k] = Σ x[n]·cos(π/N·(n+½)(k+½))`
    pub fn dct4(&mut self, input: &[f64], output: &mut [f64]) {
        let trig = trig_tables();
        let bits = self.bits as usize;
        let size = self.size;
        let last = size - 1;
        let half = size / 2;
        let temp = &mut self.dct_temp;

        let sin = &trig.sin[bits];
        let cos = &trig.cos[bits];
        for i in 0..half {
            let i2 = i * 2;
            let a = input[i2];
            let b = input[last - i2];
            temp[i2] = a * cos[i] + b * sin[i];
            temp[i2 + 1] = a * sin[i] - b * cos[i];
        }

        let stage_count = bits - 1;
        for stage in 0..stage_count {
            let block_count = 1usize << stage;
            let block_size_bits = stage_count - stage;
            let block_half_bits = block_size_bits - 1;
            let block_size = 1usize << block_size_bits;
            let block_half = 1usize << block_half_bits;
            let sin = &trig.sin[block_half_bits];
            let cos = &trig.cos[block_half_bits];

            for block in 0..block_count {
                for i in 0..block_half {
                    let front = (block * block_size + i) * 2;
                    let back = front + block_size;
                    let a = temp[front] - temp[back];
                    let b = temp[front + 1] - temp[back + 1];
                    temp[front] += temp[back];
                    temp[front + 1] += temp[back + 1];
                    temp[back] = a * cos[i] + b * sin[i];
                    temp[back + 1] = a * sin[i] - b * cos[i];
                }
            }
        }

        let shuffle = &trig.shuffle[bits];
        for (out, &index) in output.iter_mut().zip(shuffle.iter()).take(size) {
            *out = temp[index] * self.scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_dct4(input: &[f64]) -> Vec<f64> {
        let n = input.len();
        (0..n)
            .map(|k| {
                input
                    .iter()
                    .enumerate()
                    .map(|(i, &x)| {
                        x * (PI / n as f64 * (i as f64 + 0.5) * (k as f64 + 0.5)).cos()
                    })
                    .sum()
            })
            .collect()
    }

    fn test_signal(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| ((i * 7 + 3) % 13) as f64 - 6.0 + (i as f64 * 0.37).sin())
            .collect()
    }

    #[test]
    fn test_dct4_与定义一致() {
        for bits in 6..=8 {
            let mut imdct = Imdct::new(bits).unwrap();
            let input = test_signal(1 << bits);
            let mut output = vec![0.0; 1 << bits];
            imdct.dct4(&input, &mut output);
            let expected = reference_dct4(&input);
            for (k, (a, b)) in output.iter().zip(&expected).enumerate() {
                assert!((a - b).abs() < 1e-9, "bits={} k={} {} != {}", bits, k, a, b);
            }
        }
    }

    #[test]
    fn test_重叠相加_零输入输出历史() {
        let mut imdct = Imdct::new(8).unwrap();
        let size = imdct.size();
        let half = size / 2;
        let mut output = vec![0.0; size];

        imdct.run(&test_signal(size), &mut output).unwrap();
        let history = imdct.history().to_vec();
        assert!(history.iter().any(|&v| v != 0.0));

        imdct.run(&vec![0.0; size], &mut output).unwrap();
        for i in 0..half {
            assert_eq!(output[i], history[i]);
            assert_eq!(output[i + half], -history[i + half]);
        }
        assert!(imdct.history().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_全零输入输出全零() {
        let mut imdct = Imdct::new(7).unwrap();
        let mut output = vec![1.0; 128];
        imdct.run(&[0.0; 128], &mut output).unwrap();
        assert!(output.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_reset_清空历史() {
        let mut imdct = Imdct::new(6).unwrap();
        let mut output = vec![0.0; 64];
        imdct.run(&test_signal(64), &mut output).unwrap();
        imdct.reset();
        assert!(imdct.history().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_尺寸校验() {
        assert!(Imdct::new(5).is_err());
        assert!(Imdct::new(9).is_err());
        let mut imdct = Imdct::new(8).unwrap();
        let mut output = vec![0.0; 128];
        assert!(imdct.run(&[0.0; 256], &mut output).is_err());
    }

    #[test]
    fn test_位反转() {
        assert_eq!(bit_reverse(1, 3), 4);
        assert_eq!(bit_reverse(6, 3), 3);
        assert_eq!(bit_reverse(0, 0), 0);
    }
}
