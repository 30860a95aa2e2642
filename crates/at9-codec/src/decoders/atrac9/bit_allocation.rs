//! 比特分配: 梯度曲线, 局部掩码与量化精度.

use super::block::GradientParams;
use super::tables::{self, GRADIENT_LEN};

/// 粗精度上限, 超出部分转入细精度
pub const MAX_PRECISION: i32 = 15;

/// 生成梯度数组
///
/// `[0, end)` 填起始值, `[end, unit_count]` 填结束值, 起止值不同时
/// 用长度为 `end - start` 的曲线在两者之间插值.
pub fn create_gradient(
    params: &GradientParams,
    unit_count: usize,
    gradient: &mut [i32; GRADIENT_LEN],
) {
    let start = params.start_unit.min(GRADIENT_LEN);
    let end = params.end_unit.min(GRADIENT_LEN);

    gradient[..end].fill(params.start_value);
    for value in gradient.iter_mut().take(unit_count + 1).skip(end) {
        *value = params.end_value;
    }

    let value_delta = params.end_value - params.start_value;
    if end <= start || value_delta == 0 {
        return;
    }

    let curve = &tables::derived().gradient_curves[end - start - 1];
    if value_delta < 0 {
        let scale = f64::from(-value_delta - 1) / 31.0;
        let base = params.start_value - 1;
        for (value, &c) in gradient[start..end].iter_mut().zip(curve) {
            *value = base - (f64::from(c) * scale) as i32;
        }
    } else {
        let scale = f64::from(value_delta - 1) / 31.0;
        let base = params.start_value + 1;
        for (value, &c) in gradient[start..end].iter_mut().zip(curve) {
            *value = base + (f64::from(c) * scale) as i32;
        }
    }
}

/// 由相邻比例因子的跳变计算局部掩码
pub fn calculate_mask(scale_factors: &[i32], unit_count: usize, mask: &mut [i32]) {
    mask.fill(0);
    for i in 1..unit_count {
        let delta = scale_factors[i] - scale_factors[i - 1];
        if delta > 1 {
            mask[i] += (delta - 1).min(5);
        } else if delta < -1 {
            mask[i - 1] += (-delta - 1).min(5);
        }
    }
}

/// 计算每个量化单元的粗精度与细精度
pub fn calculate_precisions(
    params: &GradientParams,
    gradient: &[i32],
    scale_factors: &[i32],
    mask: &[i32],
    unit_count: usize,
    precisions: &mut [i32],
    precisions_fine: &mut [i32],
) {
    for i in 0..unit_count {
        let precision = if params.mode == 0 {
            scale_factors[i] - gradient[i]
        } else {
            let raw = scale_factors[i] + mask[i] - gradient[i];
            if raw > 0 {
                match params.mode {
                    1 => raw / 2,
                    2 => 3 * raw / 8,
                    _ => raw / 4,
                }
            } else {
                raw
            }
        };
        precisions[i] = precision.max(1);
    }

    for precision in precisions.iter_mut().take(params.boundary.min(unit_count)) {
        *precision += 1;
    }

    for i in 0..unit_count {
        (precisions[i], precisions_fine[i]) = split_precision(precisions[i]);
    }
}

/// 拆分为 (粗精度, 细精度)
pub fn split_precision(precision: i32) -> (i32, i32) {
    if precision > MAX_PRECISION {
        (MAX_PRECISION, precision - MAX_PRECISION)
    } else {
        (precision, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode0(
        start_unit: usize,
        end_unit: usize,
        start_value: i32,
        end_value: i32,
    ) -> GradientParams {
        GradientParams {
            mode: 0,
            start_unit,
            end_unit,
            start_value,
            end_value,
            boundary: 0,
        }
    }

    #[test]
    fn test_梯度单调上升() {
        let mut gradient = [0; GRADIENT_LEN];
        create_gradient(&mode0(5, 20, 10, 25), 30, &mut gradient);
        assert!(gradient[..5].iter().all(|&v| v == 10));
        assert!(gradient[20..=30].iter().all(|&v| v == 25));
        assert!(gradient[..=30].windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(gradient[5], 11);
    }

    #[test]
    fn test_梯度下降() {
        let mut gradient = [0; GRADIENT_LEN];
        create_gradient(&mode0(2, 10, 20, 4), 12, &mut gradient);
        assert_eq!(gradient[0], 20);
        assert_eq!(gradient[2], 19);
        assert!(gradient[10..=12].iter().all(|&v| v == 4));
        assert!(gradient[..=12].windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_梯度起止值相同() {
        let mut gradient = [0; GRADIENT_LEN];
        create_gradient(&mode0(1, 31, 7, 7), 30, &mut gradient);
        assert!(gradient[..=30].iter().all(|&v| v == 7));
    }

    #[test]
    fn test_局部掩码() {
        let sf = [10, 13, 13, 5, 6, 30];
        let mut mask = [0; 6];
        calculate_mask(&sf, 6, &mut mask);
        // +3 → mask[1] += 2; -8 → mask[2] += 5; +1 忽略; +24 → mask[5] += 5
        assert_eq!(mask, [0, 2, 5, 0, 0, 5]);
    }

    #[test]
    fn test_精度溢出到细精度() {
        assert_eq!(split_precision(17), (15, 2));
        assert_eq!(split_precision(15), (15, 0));

        let params = mode0(1, 1, 0, 0);
        let gradient = [0; GRADIENT_LEN];
        let sf = [17, 3, 0];
        let mask = [0; 3];
        let mut precisions = [0; 3];
        let mut fine = [0; 3];
        calculate_precisions(&params, &gradient, &sf, &mask, 3, &mut precisions, &mut fine);
        assert_eq!(precisions, [15, 3, 1]);
        assert_eq!(fine, [2, 0, 0]);
    }

    #[test]
    fn test_精度模式缩放与边界() {
        let gradient = [2; GRADIENT_LEN];
        let sf = [18, 18, 18, 1];
        let mask = [2, 0, 0, 0];
        let mut precisions = [0; 4];
        let mut fine = [0; 4];
        for (mode, expected) in [(1, [9, 8, 8, 1]), (2, [6, 6, 6, 1]), (3, [4, 4, 4, 1])] {
            let params = GradientParams {
                mode,
                boundary: 2,
                ..mode0(1, 1, 0, 0)
            };
            calculate_precisions(&params, &gradient, &sf, &mask, 4, &mut precisions, &mut fine);
            let mut expected = expected;
            expected[0] += 1;
            expected[1] += 1;
            assert_eq!(precisions, expected, "mode={}", mode);
        }
    }

    #[test]
    fn test_最大细精度在步长表内() {
        let gradient = [0; GRADIENT_LEN];
        let sf = [31; 4];
        let mask = [0; 4];
        let mut precisions = [0; 4];
        let mut fine = [0; 4];
        let params = GradientParams {
            boundary: 1,
            ..mode0(1, 1, 0, 0)
        };
        calculate_precisions(&params, &gradient, &sf, &mask, 4, &mut precisions, &mut fine);
        assert_eq!(precisions, [15; 4]);
        assert_eq!(fine, [17, 16, 16, 16]);
        assert!(fine.iter().all(|&f| (f as usize) < tables::FINE_STEP_COUNT));
    }
}
