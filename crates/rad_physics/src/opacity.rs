// crates/rad_physics/src/opacity.rs

//! 不透明度提供者
//!
//! 交换求解器与通量求解器需要三种群平均不透明度：
//! 普朗克平均 κP（发射/吸收）、能量平均 κE、通量平均 κF。
//! 本模块支持两种提供方式：
//!
//! 1. **用户模型**: 调用方直接给出三种群平均值；
//! 2. **分段幂律模型**: 调用方给出各群下边界处的 κ 与群内幂指数，
//!    群平均由当前辐射谱的局部幂律拟合解析积分得到。
//!
//! 谱指数拟合对相邻群的对数斜率做 minmod 限制，首末群指数取 0。

use crate::groups::{GroupBoundaries, GroupVec};
use std::sync::Arc;

/// 幂指数分母的退化阈值，|α| 小于该值时用对数极限
const ALPHA_DEGENERATE: f64 = 1e-8;

// ============================================================
// 提供者接口
// ============================================================

/// 用户直接给出群平均不透明度 [cm²/g]
pub trait GroupOpacity: Send + Sync {
    /// 普朗克平均 κP
    fn planck_mean(&self, rho: f64, t_gas: f64) -> GroupVec;

    /// 能量平均 κE，默认与 κP 相同
    fn energy_mean(&self, rho: f64, t_gas: f64) -> GroupVec {
        self.planck_mean(rho, t_gas)
    }

    /// 通量平均 κF，默认与 κE 相同
    fn flux_mean(&self, rho: f64, t_gas: f64) -> GroupVec {
        self.energy_mean(rho, t_gas)
    }
}

/// 分段幂律不透明度：κ(ν) = κ_lower · (ν/ν_lower)^expo（群内）
pub trait PowerLawOpacity: Send + Sync {
    /// 各群下边界处的 κ [cm²/g]
    fn lower_values(&self, rho: f64, t_gas: f64) -> GroupVec;

    /// 各群内的幂指数
    fn exponents(&self, rho: f64, t_gas: f64) -> GroupVec;
}

/// 不透明度模型
#[derive(Clone)]
pub enum OpacityModel {
    /// 用户给定群平均
    User(Arc<dyn GroupOpacity>),
    /// 分段幂律 + 谱指数拟合
    PiecewisePowerLaw(Arc<dyn PowerLawOpacity>),
}

/// 一次不透明度求值的全部输出
///
/// `kappa_expo` 与两个谱指数仅幂律模型非零，交换求解器的
/// 动量修正项会用到它们。
#[derive(Debug, Clone, Copy)]
pub struct OpacityEval {
    /// 普朗克平均 κP
    pub planck: GroupVec,
    /// 能量平均 κE
    pub energy: GroupVec,
    /// 通量平均 κF
    pub flux: GroupVec,
    /// 群内不透明度幂指数
    pub kappa_expo: GroupVec,
    /// 发射谱 (4πB) 的拟合指数
    pub alpha_b: GroupVec,
    /// 辐射能谱 (E_r) 的拟合指数
    pub alpha_e: GroupVec,
}

impl OpacityModel {
    /// 求值：给定气体状态与当前辐射谱，返回三种群平均
    pub fn evaluate(
        &self,
        rho: f64,
        t_gas: f64,
        four_pi_b: &GroupVec,
        e_rad: &GroupVec,
        boundaries: &GroupBoundaries,
    ) -> OpacityEval {
        let n = boundaries.n_groups();
        match self {
            Self::User(model) => OpacityEval {
                planck: model.planck_mean(rho, t_gas),
                energy: model.energy_mean(rho, t_gas),
                flux: model.flux_mean(rho, t_gas),
                kappa_expo: GroupVec::zeros(n),
                alpha_b: GroupVec::zeros(n),
                alpha_e: GroupVec::zeros(n),
            },
            Self::PiecewisePowerLaw(model) => {
                let lower = model.lower_values(rho, t_gas);
                let kappa_expo = model.exponents(rho, t_gas);
                let alpha_b = spectrum_exponents(four_pi_b, boundaries);
                let alpha_e = spectrum_exponents(e_rad, boundaries);
                let ratios = boundaries.ratios();
                let planck = group_mean_opacity(&lower, &kappa_expo, &alpha_b, &ratios);
                let energy = group_mean_opacity(&lower, &kappa_expo, &alpha_e, &ratios);
                OpacityEval {
                    planck,
                    energy,
                    // 幂律模型下通量平均沿用能量平均
                    flux: energy,
                    kappa_expo,
                    alpha_b,
                    alpha_e,
                }
            }
        }
    }

    /// 是否为分段幂律模型
    pub fn is_power_law(&self) -> bool {
        matches!(self, Self::PiecewisePowerLaw(_))
    }
}

// ============================================================
// 谱指数拟合
// ============================================================

/// minmod 斜率限制器：同号取绝对值较小者，异号取 0
///
/// 分支形式对 ±∞ 的输入也给出确定结果（异号无穷取 0）。
#[inline]
pub fn minmod(a: f64, b: f64) -> f64 {
    if a * b <= 0.0 {
        0.0
    } else if a.abs() < b.abs() {
        a
    } else {
        b
    }
}

/// 由逐群量拟合局部幂律谱指数
///
/// 每群的谱密度取 `quant / Δν`，在对数坐标下对相邻群的
/// 中心点（几何平均）求斜率，内部群用 minmod 组合左右斜率，
/// 首末群指数为 0。单群情况直接返回零向量。
///
/// 谱密度可以为负（通量分量向左时整段为负），同号对按 |比值|
/// 拟合；变号对的斜率取 ±∞，由 minmod 与另一侧斜率组合。
pub fn spectrum_exponents(quant: &GroupVec, boundaries: &GroupBoundaries) -> GroupVec {
    let n = boundaries.n_groups();
    let mut exponents = GroupVec::zeros(n);
    if n < 3 {
        return exponents;
    }

    let mut centers = GroupVec::zeros(n);
    let mut mean = GroupVec::zeros(n);
    for g in 0..n {
        let lo = boundaries.lower(g);
        let hi = boundaries.upper(g);
        centers[g] = (lo * hi).sqrt();
        mean[g] = quant[g] / (hi - lo);
    }

    // 相邻群中心间的对数斜率
    let mut slope = GroupVec::zeros(n);
    for g in 0..n - 1 {
        slope[g] = if mean[g] == 0.0 && mean[g + 1] == 0.0 {
            0.0
        } else if mean[g] * mean[g + 1] <= 0.0 {
            if mean[g + 1] > mean[g] {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            }
        } else {
            (mean[g + 1] / mean[g]).abs().ln() / (centers[g + 1] / centers[g]).ln()
        };
        debug_assert!(!slope[g].is_nan());
    }

    for g in 1..n - 1 {
        exponents[g] = minmod(slope[g - 1], slope[g]);
    }
    exponents
}

// ============================================================
// 幂律群平均
// ============================================================

/// 幂指数分母 `(r^α − 1)/α`，α → 0 时取对数极限
#[inline]
fn power_law_part(ratio: f64, alpha: f64) -> f64 {
    if alpha.abs() < ALPHA_DEGENERATE {
        ratio.ln()
    } else {
        (ratio.powf(alpha) - 1.0) / alpha
    }
}

/// 对幂律谱 ∝ ν^α_quant 求群平均不透明度
///
/// ```text
/// <κ>_g = κ_lower · part(r, α_quant + α_κ + 1) / part(r, α_quant + 1)
/// ```
///
/// 群边界比值 r 非有限（如首群下边界为 0）时退化为下边界值。
pub fn group_mean_opacity(
    kappa_lower: &GroupVec,
    kappa_expo: &GroupVec,
    spectrum_expo: &GroupVec,
    ratios: &GroupVec,
) -> GroupVec {
    let n = kappa_lower.len();
    let mut out = GroupVec::zeros(n);
    for g in 0..n {
        let r = ratios[g];
        if !r.is_finite() || r <= 1.0 {
            out[g] = kappa_lower[g];
            continue;
        }
        let part1 = power_law_part(r, spectrum_expo[g] + 1.0);
        let part2 = power_law_part(r, spectrum_expo[g] + kappa_expo[g] + 1.0);
        out[g] = kappa_lower[g] / part1 * part2;
    }
    out
}

// ============================================================
// 测试
// ============================================================
