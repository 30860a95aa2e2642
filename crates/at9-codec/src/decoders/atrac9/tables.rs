//! ATRAC9 静态表与一次性生成的派生表.
//!
//! 量化单元划分、比例因子权重和梯度主曲线是格式常量;
//! 步长、频谱缩放、梯度曲线和 IMDCT 窗函数由这些常量推导, 首次使用时生成.

use std::f64::consts::PI;
use std::sync::OnceLock;

/// 每帧最大量化单元数
pub const MAX_QUANT_UNITS: usize = 30;

/// 每帧最大频谱系数数 (2^8)
pub const MAX_FRAME_SAMPLES: usize = 256;

/// 梯度数组长度 (梯度单元上限 47)
pub const GRADIENT_LEN: usize = 48;

/// 频带数 → 量化单元数
pub const BAND_TO_QUANT_UNIT_COUNT: [usize; 19] = [
    0, 4, 8, 10, 12, 13, 14, 15, 16, 18, 20, 21, 22, 23, 24, 25, 26, 28, 30,
];

/// 采样率索引 → 最大频带数
pub const MAX_BAND_COUNT: [usize; 16] = [8, 8, 12, 12, 12, 18, 18, 18, 8, 8, 12, 12, 12, 16, 16, 16];

/// 每个量化单元包含的系数数
pub const QUANT_UNIT_TO_COEFF_COUNT: [usize; MAX_QUANT_UNITS] = [
    2, 2, 2, 2, 2, 2, 2, 2, 4, 4, 4, 4, 8, 8, 8, 8, 8, 8, 8, 8, 16, 16, 16, 16, 16, 16, 16, 16, 16,
    16,
];

/// 每个量化单元的首个系数索引 (末项为系数总数)
pub const QUANT_UNIT_TO_COEFF_INDEX: [usize; MAX_QUANT_UNITS + 1] = [
    0, 2, 4, 6, 8, 10, 12, 14, 16, 20, 24, 28, 32, 40, 48, 56, 64, 72, 80, 88, 96, 112, 128, 144,
    160, 176, 192, 208, 224, 240, 256,
];

/// 量化单元 → 频谱码本索引 (按单元系数数 2/4/8/16 区分)
pub const QUANT_UNIT_TO_CODEBOOK_INDEX: [usize; MAX_QUANT_UNITS] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
];

/// VLC 差分比例因子的权重曲线 (3 位索引选择)
pub const SCALE_FACTOR_WEIGHTS: [[u8; 32]; 8] = [
    [
        0, 0, 0, 1, 1, 2, 2, 2, 2, 2, 2, 3, 2, 3, 3, 4, 4, 4, 4, 4, 4, 5, 5, 6, 6, 7, 7, 8, 10, 12, 12,
        12,
    ],
    [
        3, 2, 2, 1, 1, 1, 1, 1, 0, 1, 1, 1, 0, 0, 0, 1, 0, 1, 1, 1, 1, 1, 1, 2, 3, 3, 4, 5, 7, 10, 10,
        10,
    ],
    [
        0, 2, 4, 5, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 7, 7, 7, 7, 8, 9, 12, 12,
        12,
    ],
    [
        0, 1, 1, 2, 2, 2, 3, 3, 3, 3, 3, 4, 4, 4, 5, 5, 5, 6, 6, 6, 6, 7, 8, 8, 10, 11, 11, 12, 13, 13,
        13, 13,
    ],
    [
        0, 2, 2, 3, 3, 4, 4, 5, 4, 5, 5, 5, 5, 6, 7, 8, 8, 8, 8, 9, 9, 9, 10, 10, 11, 12, 12, 13, 13,
        14, 14, 14,
    ],
    [
        1, 1, 0, 0, 0, 0, 1, 0, 0, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3, 3, 4, 4, 5, 6, 7, 7, 9, 11, 11,
        11,
    ],
    [
        0, 5, 8, 10, 11, 11, 12, 12, 12, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13,
        12, 12, 12, 12, 13, 15, 15, 15,
    ],
    [
        0, 2, 3, 4, 5, 6, 6, 7, 7, 8, 8, 8, 9, 9, 10, 10, 10, 11, 11, 11, 11, 11, 11, 12, 12, 12, 12,
        13, 13, 15, 15, 15,
    ],
];

/// 48 点梯度主曲线
const GRADIENT_MAIN_CURVE: [u8; GRADIENT_LEN] = [
    1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 4, 4, 5, 5, 6, 7, 8, 9, 10, 11, 12, 13, 15, 16, 18, 19, 20, 21,
    22, 23, 24, 25, 26, 26, 27, 27, 28, 28, 28, 29, 29, 29, 29, 30, 30, 30, 30,
];

/// 最小频带数
pub fn min_band_count(high_sample_rate: bool) -> usize {
    if high_sample_rate { 1 } else { 3 }
}

/// 最大扩展频带
pub fn max_extension_band(high_sample_rate: bool) -> usize {
    if high_sample_rate { 16 } else { 18 }
}

/// 使用 Huffman 编码的最大精度 (精度 + 1)
pub fn max_huffman_precision(high_sample_rate: bool) -> i32 {
    if high_sample_rate { 1 } else { 7 }
}

/// 细精度表长度
///
/// 模式 0 下精度最大为 31 + 1 (边界加成), 减去粗精度上限 15 后细精度最大 17.
pub const FINE_STEP_COUNT: usize = 32;

/// 由格式常量推导出的只读表
pub struct DerivedTables {
    /// 粗量化步长, 按精度索引
    pub quantizer_step_size: [f64; 16],
    /// 细量化步长, 按细精度索引
    pub quantizer_fine_step_size: [f64; FINE_STEP_COUNT],
    /// 2^(sf-15), 按比例因子索引
    pub spectrum_scale: [f64; 32],
    /// 第 L-1 项为长度 L 的梯度曲线
    pub gradient_curves: Vec<Vec<i32>>,
    /// IMDCT 合成窗, 按帧长指数 6/7/8 索引
    pub imdct_windows: [Vec<f64>; 3],
}

static DERIVED_TABLES: OnceLock<DerivedTables> = OnceLock::new();

/// 获取派生表 (首次调用时生成)
pub fn derived() -> &'static DerivedTables {
    DERIVED_TABLES.get_or_init(|| {
        let step_size = |i: usize| 2.0 / (2f64.powi(i as i32 + 1) - 1.0);
        let quantizer_step_size: [f64; 16] = std::array::from_fn(step_size);
        let quantizer_fine_step_size: [f64; FINE_STEP_COUNT] =
            std::array::from_fn(|i| step_size(i) / f64::from(u16::MAX));

        let mut spectrum_scale = [0.0; 32];
        for (i, scale) in spectrum_scale.iter_mut().enumerate() {
            *scale = 2f64.powi(i as i32 - 15);
        }

        DerivedTables {
            quantizer_step_size,
            quantizer_fine_step_size,
            spectrum_scale,
            gradient_curves: generate_gradient_curves(),
            imdct_windows: [
                generate_imdct_window(6),
                generate_imdct_window(7),
                generate_imdct_window(8),
            ],
        }
    })
}

/// 以最近索引重采样主曲线, 生成长度 1..=48 的曲线
fn generate_gradient_curves() -> Vec<Vec<i32>> {
    let main_len = GRADIENT_MAIN_CURVE.len();
    (1..=main_len)
        .map(|len| {
            (0..len)
                .map(|i| i32::from(GRADIENT_MAIN_CURVE[i * main_len / len]))
                .collect()
        })
        .collect()
}

fn generate_mdct_window(power: u32) -> Vec<f64> {
    let size = 1usize << power;
    (0..size)
        .map(|i| ((((i as f64 + 0.5) / size as f64) - 0.5) * PI).sin().mul_add(0.5, 0.5))
        .collect()
}

/// 与分析窗配对的合成窗, 保证重叠相加完全重建
fn generate_imdct_window(power: u32) -> Vec<f64> {
    let analysis = generate_mdct_window(power);
    let size = analysis.len();
    (0..size)
        .map(|i| {
            let a = analysis[i];
            let b = analysis[size - 1 - i];
            a / (b * b + a * a)
        })
        .collect()
}
