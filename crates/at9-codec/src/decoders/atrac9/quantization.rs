//! 反量化与比例因子缩放.

use super::tables::{self, QUANT_UNIT_TO_COEFF_INDEX};

/// 粗/细量化值 → 浮点系数 (未缩放)
///
/// `coded_units` 之外的系数置零.
pub fn dequantize_spectra(
    coded_units: usize,
    precisions: &[i32],
    precisions_fine: &[i32],
    quantized: &[i32],
    quantized_fine: &[i32],
    spectra: &mut [f64],
) {
    let tables = tables::derived();
    spectra.fill(0.0);

    for unit in 0..coded_units {
        let step = tables.quantizer_step_size[precisions[unit] as usize];
        let fine_step = tables.quantizer_fine_step_size[precisions_fine[unit] as usize];
        let range = QUANT_UNIT_TO_COEFF_INDEX[unit]..QUANT_UNIT_TO_COEFF_INDEX[unit + 1];
        for i in range {
            spectra[i] = f64::from(quantized[i]) * step + f64::from(quantized_fine[i]) * fine_step;
        }
    }
}

/// 按比例因子缩放 (2^(sf-15))
pub fn scale_spectrum(unit_count: usize, scale_factors: &[i32], spectra: &mut [f64]) {
    let scales = &tables::derived().spectrum_scale;
    for unit in 0..unit_count {
        let scale = scales[scale_factors[unit] as usize];
        let range = QUANT_UNIT_TO_COEFF_INDEX[unit]..QUANT_UNIT_TO_COEFF_INDEX[unit + 1];
        for value in &mut spectra[range] {
            *value *= scale;
        }
    }
}
