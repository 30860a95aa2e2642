//! ATRAC9 Huffman 码本.
//!
//! 每个码本由码字/码长表和分组指数构造, 并展开为 2^最大码长 的查找表:
//! 解码时窥视最大码长位数, 查表得到符号, 再按该符号的真实码长推进.
//!
//! 分组码本 (分组指数 > 0) 的一个符号打包了 2^指数 个量化值,
//! 每个值占 `value_bits` 位, 低位在前, 解包时逐个符号扩展.
//!
//! # 内置码本是占位数据
//!
//! 格式规定的码字/码长表不在本仓库中. [`codebooks`] 返回的内置集合由幅度衰减
//! 模型生成规范 Huffman 码, 各码本的符号数与分组指数与格式一致,
//! 但码字不同: 用它解码真实 ATRAC9 文件会失步或输出噪声.
//!
//! 取得正式表后, 用 [`HuffmanCodebook::new`] 逐个构造, 通过
//! [`Codebooks::set_scale_factor_unsigned`] / [`Codebooks::set_scale_factor_signed`] /
//! [`Codebooks::set_spectrum`] 替换, 再用
//! [`Atrac9Decoder::set_codebooks`](super::Atrac9Decoder::set_codebooks) 装入解码器.
//!
//! 内置集合在进程内只构建一次, 默认由所有解码器实例共享.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, OnceLock};

use at9_core::bitreader::sign_extend;
use at9_core::{At9Error, At9Result, BitReader};

/// 码长上限
pub const MAX_CODE_LEN: u32 = 16;

/// 查找表中的空位
const INVALID_ENTRY: u16 = u16::MAX;

/// Huffman 码本
#[derive(Debug, Clone)]
pub struct HuffmanCodebook {
    /// 各符号的码字
    codes: Vec<u32>,
    /// 各符号的码长
    bits: Vec<u8>,
    /// 窥视值 → 符号
    lookup: Vec<u16>,
    value_count_power: u32,
    value_bits: u32,
    max_bit_size: u32,
}

impl HuffmanCodebook {
    /// 由码字和码长表构造
    ///
    /// 符号数必须是 2 的幂, `value_bits = log2(符号数) >> value_count_power`.
    pub fn new(codes: &[u32], bits: &[u8], value_count_power: u32) -> At9Result<Self> {
        if codes.len() != bits.len() {
            return Err(At9Error::InvalidArgument(format!(
                "码字表与码长表长度不一致: {} != {}",
                codes.len(),
                bits.len()
            )));
        }
        let len = codes.len();
        if len < 2 || !len.is_power_of_two() || len > usize::from(INVALID_ENTRY) {
            return Err(At9Error::InvalidArgument(format!(
                "码本符号数必须是 2 的幂: {}",
                len
            )));
        }

        let max_bit_size = bits.iter().copied().max().map_or(0, u32::from);
        if max_bit_size == 0 || max_bit_size > MAX_CODE_LEN {
            return Err(At9Error::InvalidArgument(format!(
                "码长越界: 最大码长 {}",
                max_bit_size
            )));
        }

        let mut lookup = vec![INVALID_ENTRY; 1usize << max_bit_size];
        for (symbol, (&code, &bit_len)) in codes.iter().zip(bits).enumerate() {
            if bit_len == 0 {
                continue;
            }
            let bit_len = u32::from(bit_len);
            if code >> bit_len != 0 {
                return Err(At9Error::InvalidArgument(format!(
                    "码字 0x{:X} 超出码长 {}",
                    code, bit_len
                )));
            }
            let unused = max_bit_size - bit_len;
            let start = (code as usize) << unused;
            let end = start + (1usize << unused);
            for entry in &mut lookup[start..end] {
                if *entry != INVALID_ENTRY {
                    return Err(At9Error::InvalidArgument(format!(
                        "码字冲突: 符号 {} 与符号 {}",
                        entry, symbol
                    )));
                }
                *entry = symbol as u16;
            }
        }

        Ok(Self {
            codes: codes.to_vec(),
            bits: bits.to_vec(),
            lookup,
            value_count_power,
            value_bits: len.trailing_zeros() >> value_count_power,
            max_bit_size,
        })
    }

    /// 由码长表按规范 Huffman 规则分配码字
    ///
    /// 码字按 (码长, 符号序号) 递增分配.
    pub fn from_lengths(bits: &[u8], value_count_power: u32) -> At9Result<Self> {
        let mut bl_count = [0u32; MAX_CODE_LEN as usize + 1];
        for &len in bits {
            if u32::from(len) > MAX_CODE_LEN {
                return Err(At9Error::InvalidArgument(format!("码长越界: {}", len)));
            }
            if len > 0 {
                bl_count[len as usize] += 1;
            }
        }

        let mut next_code = [0u32; MAX_CODE_LEN as usize + 1];
        let mut code = 0u32;
        for len in 1..=MAX_CODE_LEN as usize {
            code = (code + bl_count[len - 1]) << 1;
            next_code[len] = code;
        }

        let codes: Vec<u32> = bits
            .iter()
            .map(|&len| {
                if len == 0 {
                    return 0;
                }
                let code = next_code[len as usize];
                next_code[len as usize] += 1;
                code
            })
            .collect();

        Self::new(&codes, bits, value_count_power)
    }

    /// 符号数
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// 是否没有符号
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// 每个符号打包的值个数
    pub fn value_count(&self) -> usize {
        1 << self.value_count_power
    }

    /// 分组指数
    pub fn value_count_power(&self) -> u32 {
        self.value_count_power
    }

    /// 每个值的位宽
    pub fn value_bits(&self) -> u32 {
        self.value_bits
    }

    /// 单个值的取值个数 (2^value_bits)
    pub fn value_max(&self) -> u32 {
        1 << self.value_bits
    }

    /// 最大码长
    pub fn max_bit_size(&self) -> u32 {
        self.max_bit_size
    }

    /// 解码一个符号
    pub fn decode(&self, br: &mut BitReader) -> At9Result<u32> {
        let peek = br.peek_bits(self.max_bit_size) as usize;
        let symbol = self.lookup[peek];
        if symbol == INVALID_ENTRY {
            return Err(At9Error::InvalidData(format!(
                "无效的 Huffman 码字: 0x{:X} ({} 位)",
                peek, self.max_bit_size
            )));
        }
        br.skip_bits(usize::from(self.bits[usize::from(symbol)]));
        Ok(u32::from(symbol))
    }

    /// 解码一个符号并按 `value_bits` 符号扩展
    pub fn decode_signed(&self, br: &mut BitReader) -> At9Result<i32> {
        let symbol = self.decode(br)?;
        Ok(sign_extend(symbol, self.value_bits))
    }

    /// 将分组符号解包为单个有符号值, 低位在前
    pub fn unpack_group(&self, symbol: u32, out: &mut [i32]) {
        let mask = (1u32 << self.value_bits) - 1;
        let mut value = symbol;
        for slot in out.iter_mut().take(self.value_count()) {
            *slot = sign_extend(value & mask, self.value_bits);
            value >>= self.value_bits;
        }
    }

    /// 查询符号的码字和码长
    pub fn encode(&self, symbol: u32) -> Option<(u32, u32)> {
        let index = symbol as usize;
        match self.bits.get(index) {
            Some(&len) if len > 0 => Some((self.codes[index], u32::from(len))),
            _ => None,
        }
    }
}

// ============================================================
// 码本集合
// ============================================================

/// 解码器使用的全部码本
#[derive(Debug, Clone)]
pub struct Codebooks {
    /// 无符号比例因子差分码本, 按码长 1..=6 索引
    scale_factors_unsigned: Vec<Option<HuffmanCodebook>>,
    /// 有符号比例因子距离码本, 按码长 2..=5 索引
    scale_factors_signed: Vec<Option<HuffmanCodebook>>,
    /// 频谱码本, [码本集][精度][码本索引], 精度 2..=7
    spectrum: Vec<Vec<Vec<Option<HuffmanCodebook>>>>,
}

impl Codebooks {
    /// 内置占位码本的一份拷贝, 可在其上逐个替换
    pub fn placeholder() -> Self {
        codebooks().clone()
    }

    /// 替换无符号比例因子码本 (码长 1..=6, 2^码长 个符号, 不分组)
    pub fn set_scale_factor_unsigned(
        &mut self,
        bit_len: usize,
        codebook: HuffmanCodebook,
    ) -> At9Result<()> {
        check_shape("无符号比例因子", &codebook, (1..=6).contains(&bit_len), bit_len, 0)?;
        self.scale_factors_unsigned[bit_len] = Some(codebook);
        Ok(())
    }

    /// 替换有符号比例因子码本 (码长 2..=5, 2^码长 个符号, 不分组)
    pub fn set_scale_factor_signed(
        &mut self,
        bit_len: usize,
        codebook: HuffmanCodebook,
    ) -> At9Result<()> {
        check_shape("有符号比例因子", &codebook, (2..=5).contains(&bit_len), bit_len, 0)?;
        self.scale_factors_signed[bit_len] = Some(codebook);
        Ok(())
    }

    /// 替换频谱码本, 形状须符合 [`spectrum_codebook_shape`]
    pub fn set_spectrum(
        &mut self,
        set: usize,
        precision: usize,
        codebook_index: usize,
        codebook: HuffmanCodebook,
    ) -> At9Result<()> {
        let shape = spectrum_codebook_shape(precision, codebook_index).filter(|_| set < 2);
        let (size_log2, power) = shape.unwrap_or((0, 0));
        check_shape("频谱", &codebook, shape.is_some(), size_log2 as usize, power)?;
        self.spectrum[set][precision][codebook_index] = Some(codebook);
        Ok(())
    }

    /// 无符号比例因子码本
    pub fn scale_factor_unsigned(&self, bit_len: usize) -> At9Result<&HuffmanCodebook> {
        self.scale_factors_unsigned
            .get(bit_len)
            .and_then(Option::as_ref)
            .ok_or_else(|| At9Error::Codec(format!("缺少无符号比例因子码本: {} 位", bit_len)))
    }

    /// 有符号比例因子码本
    pub fn scale_factor_signed(&self, bit_len: usize) -> At9Result<&HuffmanCodebook> {
        self.scale_factors_signed
            .get(bit_len)
            .and_then(Option::as_ref)
            .ok_or_else(|| At9Error::Codec(format!("缺少有符号比例因子码本: {} 位", bit_len)))
    }

    /// 频谱码本
    pub fn spectrum(
        &self,
        set: usize,
        precision: usize,
        codebook_index: usize,
    ) -> At9Result<&HuffmanCodebook> {
        self.spectrum
            .get(set)
            .and_then(|sets| sets.get(precision))
            .and_then(|books| books.get(codebook_index))
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                At9Error::Codec(format!(
                    "缺少频谱码本: set={} precision={} index={}",
                    set, precision, codebook_index
                ))
            })
    }
}

fn check_shape(
    kind: &str,
    codebook: &HuffmanCodebook,
    slot_exists: bool,
    size_log2: usize,
    value_count_power: u32,
) -> At9Result<()> {
    if !slot_exists {
        return Err(At9Error::InvalidArgument(format!("不存在该{}码本位置", kind)));
    }
    if codebook.len() != 1 << size_log2 || codebook.value_count_power() != value_count_power {
        return Err(At9Error::InvalidArgument(format!(
            "{}码本形状不符: 需要 {} 个符号/分组指数 {}, 实际 {}/{}",
            kind,
            1usize << size_log2,
            value_count_power,
            codebook.len(),
            codebook.value_count_power()
        )));
    }
    Ok(())
}

static CODEBOOKS: OnceLock<Arc<Codebooks>> = OnceLock::new();

/// 内置 (占位) 码本集合, 首次调用时构建
pub fn codebooks() -> &'static Codebooks {
    shared()
}

/// 内置码本集合的共享句柄
pub fn shared_codebooks() -> Arc<Codebooks> {
    Arc::clone(shared())
}

fn shared() -> &'static Arc<Codebooks> {
    CODEBOOKS.get_or_init(|| Arc::new(build_codebooks()))
}

/// 频谱码本的 (log2 符号数, 分组指数)
pub fn spectrum_codebook_shape(precision: usize, codebook_index: usize) -> Option<(u32, u32)> {
    match (precision, codebook_index) {
        (2, 0) => Some((4, 1)),
        (2, 1..=3) => Some((8, 2)),
        (3, 0..=3) => Some((6, 1)),
        (4, 0..=3) => Some((8, 1)),
        (5..=7, 0..=3) => Some((precision as u32, 0)),
        _ => None,
    }
}

fn build_codebooks() -> Codebooks {
    let scale_factors_unsigned = (0..=6)
        .map(|bit_len| {
            (bit_len >= 1).then(|| {
                let size = 1u32 << bit_len;
                let weights: Vec<f64> = (0..size)
                    .map(|delta| {
                        let distance = delta.min(size - delta);
                        magnitude_weight(distance as i32, 2.0)
                    })
                    .collect();
                model_codebook(&weights, 0)
            })
        })
        .collect();

    let scale_factors_signed = (0..=5)
        .map(|bit_len| {
            (bit_len >= 2).then(|| {
                let weights: Vec<f64> = (0..1u32 << bit_len)
                    .map(|symbol| magnitude_weight(sign_extend(symbol, bit_len), 2.0))
                    .collect();
                model_codebook(&weights, 0)
            })
        })
        .collect();

    let spectrum = (0..2)
        .map(|set| {
            (0..8)
                .map(|precision| {
                    (0..4)
                        .map(|codebook_index| {
                            let (size_log2, power) =
                                spectrum_codebook_shape(precision, codebook_index)?;
                            let value_bits = size_log2 >> power;
                            // 备选码本集用于局部峰值单元, 分布更平坦
                            let exponent = if set == 0 { 2.0 } else { 1.25 }
                                + 0.25 * codebook_index as f64;
                            let weights: Vec<f64> = (0..1u32 << size_log2)
                                .map(|symbol| group_weight(symbol, power, value_bits, exponent))
                                .collect();
                            Some(model_codebook(&weights, power))
                        })
                        .collect()
                })
                .collect()
        })
        .collect();

    Codebooks {
        scale_factors_unsigned,
        scale_factors_signed,
        spectrum,
    }
}

fn magnitude_weight(value: i32, exponent: f64) -> f64 {
    (1.0 + f64::from(value.unsigned_abs())).powf(-exponent)
}

fn group_weight(symbol: u32, power: u32, value_bits: u32, exponent: f64) -> f64 {
    let mask = (1u32 << value_bits) - 1;
    (0..1u32 << power)
        .map(|j| {
            let value = sign_extend((symbol >> (j * value_bits)) & mask, value_bits);
            magnitude_weight(value, exponent)
        })
        .product()
}

/// 由符号权重生成规范码本
///
/// 码长集合总是完备的 (Kraft 和为 1), 构造不会失败.
fn model_codebook(weights: &[f64], value_count_power: u32) -> HuffmanCodebook {
    let lengths = limited_code_lengths(weights);
    match HuffmanCodebook::from_lengths(&lengths, value_count_power) {
        Ok(codebook) => codebook,
        Err(_) => fixed_length_codebook(weights.len(), value_count_power),
    }
}

fn fixed_length_codebook(len: usize, value_count_power: u32) -> HuffmanCodebook {
    let bit_len = len.trailing_zeros();
    let codes: Vec<u32> = (0..len as u32).collect();
    let bits = vec![bit_len as u8; len];
    HuffmanCodebook {
        codes,
        bits,
        lookup: (0..len as u16).collect(),
        value_count_power,
        value_bits: bit_len >> value_count_power,
        max_bit_size: bit_len,
    }
}

/// 码长超过 [`MAX_CODE_LEN`] 时对权重开方压平后重建
fn limited_code_lengths(weights: &[f64]) -> Vec<u8> {
    let mut current = weights.to_vec();
    for _ in 0..32 {
        let lengths = huffman_code_lengths(&current);
        if lengths.iter().all(|&len| len <= MAX_CODE_LEN as usize) {
            return lengths.into_iter().map(|len| len as u8).collect();
        }
        for weight in &mut current {
            *weight = weight.sqrt();
        }
    }
    vec![weights.len().trailing_zeros() as u8; weights.len()]
}

struct HeapNode {
    weight: f64,
    id: usize,
}

impl PartialEq for HeapNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapNode {}

impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapNode {
    // 小顶堆: 权重小者优先, 同权重按 id 小者优先
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .total_cmp(&self.weight)
            .then_with(|| other.id.cmp(&self.id))
    }
}

fn huffman_code_lengths(weights: &[f64]) -> Vec<usize> {
    let n = weights.len();
    if n <= 1 {
        return vec![1; n];
    }

    let mut parent = vec![usize::MAX; 2 * n - 1];
    let mut heap: BinaryHeap<HeapNode> = weights
        .iter()
        .enumerate()
        .map(|(id, &weight)| HeapNode { weight, id })
        .collect();

    let mut next_id = n;
    while heap.len() > 1 {
        let (Some(a), Some(b)) = (heap.pop(), heap.pop()) else {
            break;
        };
        parent[a.id] = next_id;
        parent[b.id] = next_id;
        heap.push(HeapNode {
            weight: a.weight + b.weight,
            id: next_id,
        });
        next_id += 1;
    }

    (0..n)
        .map(|leaf| {
            let mut depth = 0;
            let mut node = leaf;
            while parent[node] != usize::MAX {
                node = parent[node];
                depth += 1;
            }
            depth
        })
        .collect()
}
