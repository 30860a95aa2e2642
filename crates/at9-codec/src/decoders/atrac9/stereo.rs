//! 强度立体声重建.

use super::block::Block;
use super::config::BlockKind;
use super::tables::QUANT_UNIT_TO_COEFF_INDEX;

/// 立体声边界以上的单元: 次声道复制主声道系数, 符号位为 1 时取反
pub fn apply_intensity_stereo(block: &mut Block) {
    if block.kind != BlockKind::Stereo || block.stereo_unit >= block.unit_count {
        return;
    }
    let primary = block.primary_index();
    let [first, second] = block.channels.as_mut_slice() else {
        return;
    };
    let (source, dest) = if primary == 0 {
        (&*first, second)
    } else {
        (&*second, first)
    };
    recombine(
        block.stereo_unit,
        block.unit_count,
        &block.joint_stereo_signs,
        &source.spectra,
        &mut dest.spectra,
    );
}

/// 对 `[stereo_unit, unit_count)` 执行强度立体声
pub fn recombine(
    stereo_unit: usize,
    unit_count: usize,
    signs: &[bool],
    source: &[f64],
    dest: &mut [f64],
) {
    for unit in stereo_unit..unit_count {
        let range = QUANT_UNIT_TO_COEFF_INDEX[unit]..QUANT_UNIT_TO_COEFF_INDEX[unit + 1];
        let negate = signs[unit];
        for i in range {
            dest[i] = if negate { -source[i] } else { source[i] };
        }
    }
}
