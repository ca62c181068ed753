use tables::{
    D65_WHITE, LAB_EPSILON, LAB_KAPPA, LAB_OFFSET, LINEAR_TO_XYZ, SRGB_GAMMA_TBL, XYZ_TO_LINEAR,
};

pub(crate) mod tables {
    use static_init::dynamic;
    /// Reference white (D65, 2° observer), XYZ scaled to 0..100.
    pub const D65_WHITE: [f64; 3] = [95.047, 100.0, 108.883];
    pub const LAB_EPSILON: f64 = 0.008856;
    pub const LAB_KAPPA: f64 = 7.787;
    pub const LAB_OFFSET: f64 = 16.0 / 116.0;
    pub const LINEAR_TO_XYZ: [f64; 9] = [
        0.4124, 0.3576, 0.1805, //
        0.2126, 0.7152, 0.0722, //
        0.0193, 0.1192, 0.9505,
    ];
    pub const XYZ_TO_LINEAR: [f64; 9] = [
        3.2406, -1.5372, -0.4986, //
        -0.9689, 1.8758, 0.0415, //
        0.0557, -0.2040, 1.0570,
    ];
    // Every byte value is linearized exactly once, the table holds the same values as the
    // formula would.
    #[dynamic(65535)]
    pub static SRGB_GAMMA_TBL: [f64; 256] =
        core::array::from_fn(|i| calculate_xyz_nonlin(i as u8));

    pub(crate) fn calculate_xyz_nonlin(a: u8) -> f64 {
        let v: f64 = a as f64 / 255.0;
        if v <= 0.04045 {
            return v / 12.92;
        }
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

#[inline(always)]
fn lab_nonlin(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.powf(1.0 / 3.0)
    } else {
        LAB_KAPPA * t + LAB_OFFSET
    }
}

#[inline(always)]
fn lab_nonlin_inv(f: f64) -> f64 {
    // The branch is taken on the cube of the transformed value, not on `f` itself.
    let cubed = f.powf(3.0);
    if cubed > LAB_EPSILON {
        cubed
    } else {
        (f - LAB_OFFSET) / LAB_KAPPA
    }
}

#[inline(always)]
fn srgb_gamma_inv(v: f64) -> f64 {
    if v > 0.0031308 {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    } else {
        12.92 * v
    }
}

/// Convert one sRGB pixel (first three bytes of `rgb`) to CIE L\*a\*b\*.
///
/// The output range is for:
///  - L - from 0 to 100
///  - a - roughly from -86 to 98
///  - b - roughly from -108 to 94
#[inline(always)]
pub fn srgb_to_cielab_pixel(rgb: &[u8]) -> [f64; 3] {
    debug_assert!(rgb.len() >= 3);
    let sr = unsafe { SRGB_GAMMA_TBL[rgb[0] as usize] } * 100.0;
    let sg = unsafe { SRGB_GAMMA_TBL[rgb[1] as usize] } * 100.0;
    let sb = unsafe { SRGB_GAMMA_TBL[rgb[2] as usize] } * 100.0;
    let m = &LINEAR_TO_XYZ;
    let x = m[0] * sr + m[1] * sg + m[2] * sb;
    let y = m[3] * sr + m[4] * sg + m[5] * sb;
    let z = m[6] * sr + m[7] * sg + m[8] * sb;
    let fx = lab_nonlin(x / D65_WHITE[0]);
    let fy = lab_nonlin(y / D65_WHITE[1]);
    let fz = lab_nonlin(z / D65_WHITE[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// Convert CIE L\*a\*b\* back to sRGB bytes.
///
/// Channels outside of the sRGB gamut are clamped to `0.0..=1.0` and then truncated (not
/// rounded) to a byte.
#[inline(always)]
pub fn cielab_to_srgb_pixel(lab: &[f64; 3]) -> [u8; 3] {
    let fy = (lab[0] + 16.0) / 116.0;
    let fx = lab[1] / 500.0 + fy;
    let fz = fy - lab[2] / 200.0;
    let x = lab_nonlin_inv(fx) * D65_WHITE[0];
    let y = lab_nonlin_inv(fy) * D65_WHITE[1];
    let z = lab_nonlin_inv(fz) * D65_WHITE[2];
    let m = &XYZ_TO_LINEAR;
    let linear = [
        (x * m[0] + y * m[1] + z * m[2]) / 100.0,
        (x * m[3] + y * m[4] + z * m[5]) / 100.0,
        (x * m[6] + y * m[7] + z * m[8]) / 100.0,
    ];
    linear.map(|c| (srgb_gamma_inv(c).clamp(0.0, 1.0) * 255.0) as u8)
}
