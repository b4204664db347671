// crates/rad_physics/src/planck.rs

//! 归一化普朗克积分
//!
//! 多群发射项需要黑体谱在各群能量区间内的份额：
//!
//! ```text
//! P(x) = (15/π⁴) ∫₀ˣ t³/(eᵗ−1) dt,   x = hν/kT
//! ```
//!
//! P 单调递增，P(0)=0，P(∞)=1。
//!
//! # 算法
//!
//! - `x < 2`: 伯努利级数展开
//!   `∫₀ˣ = x³/3 − x⁴/8 + x⁵/60 − x⁷/5040 + x⁹/272160`
//! - `x ≥ 2`: 指数级数
//!   `∫₀ˣ = π⁴/15 − Σ_k e^{−kx}(x³/k + 3x²/k² + 6x/k³ + 6/k⁴)`
//!
//! 级数在 x=2 处的截断误差约 2e-5（归一化后），两支在切换点
//! 的失配也在这一量级。

use crate::groups::{GroupBoundaries, GroupVec};
use rad_foundation::constants::BOLTZMANN_CGS;
use std::f64::consts::PI;

/// 级数截断的相对容差
const SERIES_TOL: f64 = 1e-14;

/// 归一化普朗克积分 P(x) ∈ [0, 1]
pub fn planck_integral(x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let pi4_15 = PI.powi(4) / 15.0;
    let raw = if x < 2.0 {
        integral_small_x(x)
    } else {
        pi4_15 - integral_tail(x)
    };
    (raw / pi4_15).clamp(0.0, 1.0)
}

/// 小 x 分支：t³/(eᵗ−1) 的伯努利展开逐项积分
fn integral_small_x(x: f64) -> f64 {
    let x3 = x * x * x;
    let x2 = x * x;
    x3 * (1.0 / 3.0 - x / 8.0 + x2 / 60.0 - x2 * x2 / 5040.0 + x2 * x2 * x2 / 272_160.0)
}

/// 大 x 分支：∫ₓ^∞ t³/(eᵗ−1) dt = Σ_k e^{−kx}(x³/k + 3x²/k² + 6x/k³ + 6/k⁴)
fn integral_tail(x: f64) -> f64 {
    let mut sum = 0.0;
    for k in 1..=64_u32 {
        let kf = f64::from(k);
        let term = (-kf * x).exp()
            * (x * x * x / kf + 3.0 * x * x / (kf * kf) + 6.0 * x / (kf * kf * kf)
                + 6.0 / (kf * kf * kf * kf));
        sum += term;
        if term < SERIES_TOL * sum {
            break;
        }
    }
    sum
}

// ============================================================
// 逐群黑体谱份额与热发射
// ============================================================

/// 各群的黑体能量份额，对群求和后归一化为 1
///
/// `energy_unit` 把群边界换算到 erg（如边界以 eV 给出则传
/// `EV2ERG`）。单群退化为份额 1。
pub fn planck_energy_fractions(
    boundaries: &GroupBoundaries,
    temperature: f64,
    energy_unit: f64,
) -> GroupVec {
    let n = boundaries.n_groups();
    let mut fractions = GroupVec::zeros(n);
    if n == 1 {
        fractions[0] = 1.0;
        return fractions;
    }
    let unit_over_kt = energy_unit / (BOLTZMANN_CGS * temperature);
    let mut previous = planck_integral(boundaries.lower(0) * unit_over_kt);
    for g in 0..n {
        let y = planck_integral(boundaries.upper(g) * unit_over_kt);
        fractions[g] = y - previous;
        previous = y;
    }
    let total = fractions.sum();
    if total > 0.0 {
        fractions = fractions / total;
    }
    fractions
}

/// 逐群热辐射能量密度 4πB_g/c = a_rad·T⁴·份额_g，带地板值
pub fn thermal_radiation(
    radiation_constant: f64,
    temperature: f64,
    boundaries: &GroupBoundaries,
    energy_unit: f64,
    erad_floor: f64,
) -> GroupVec {
    let fractions = planck_energy_fractions(boundaries, temperature, energy_unit);
    let power = radiation_constant * temperature.powi(4);
    (power * fractions).map(|e| e.max(erad_floor))
}

/// 热辐射对温度的导数 d(4πB/c)/dT = 4·(4πB/c)/T
#[inline]
pub fn thermal_radiation_temp_derivative(emission: &GroupVec, temperature: f64) -> GroupVec {
    *emission * (4.0 / temperature)
}
