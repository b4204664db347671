// crates/rad_physics/src/config.rs

//! 求解器配置
//!
//! 所有运行期参数集中在 `RadiationConfig`，构造后必须先
//! `validate` 再交给时间积分器。约化光速近似 (ĉ < c) 用于
//! 放宽辐射 CFL 条件，守恒修正由通量缩放与源项中的 c/ĉ
//! 因子承担。

use crate::groups::GroupBoundaries;
use rad_foundation::constants::{C_LIGHT_CGS, EV2ERG, RADIATION_CONSTANT_CGS};
use rad_foundation::{RadError, RadResult};
use serde::{Deserialize, Serialize};

/// IMEX 修正阶段权重的上限（PD-ARS 族要求 a32 ≤ 1/2）
const IMEX_A32_MAX: f64 = 0.5;

/// 辐射求解器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadiationConfig {
    /// 真空光速 c [cm/s]
    pub c_light: f64,
    /// 约化光速 ĉ [cm/s]，要求 0 < ĉ ≤ c
    pub c_hat: f64,
    /// 辐射常数 a_rad [erg/cm³/K⁴]
    pub radiation_constant: f64,
    /// 光子群边界
    pub boundaries: GroupBoundaries,
    /// 群边界的能量单位 [erg]（边界以 eV 给出则为 EV2ERG）
    pub energy_unit: f64,
    /// 辐射能量地板值 [erg/cm³]，按群数均分
    pub erad_floor: f64,
    /// 辐射子循环的 CFL 数
    pub cfl: f64,
    /// IMEX 修正阶段权重 a32 ∈ (0, 1/2]
    pub imex_a32: f64,
    /// 动量交换中速度项的展开阶数（0 忽略 v/c 项）
    pub beta_order: usize,
}

impl RadiationConfig {
    /// 以 CGS 自然常数和灰体单群构造默认配置
    pub fn gray_default() -> Self {
        Self {
            c_light: C_LIGHT_CGS,
            c_hat: C_LIGHT_CGS,
            radiation_constant: RADIATION_CONSTANT_CGS,
            boundaries: GroupBoundaries::gray(),
            energy_unit: EV2ERG,
            erad_floor: 1e-20,
            cfl: 0.8,
            imex_a32: 0.5,
            beta_order: 1,
        }
    }

    /// 校验配置自洽性
    pub fn validate(&self) -> RadResult<()> {
        if !(self.c_light > 0.0 && self.c_light.is_finite()) {
            return Err(RadError::invalid_config(
                "c_light",
                self.c_light,
                "光速必须为正有限值",
            ));
        }
        if !(self.c_hat > 0.0) || self.c_hat > self.c_light {
            return Err(RadError::invalid_config(
                "c_hat",
                self.c_hat,
                "约化光速必须满足 0 < ĉ ≤ c",
            ));
        }
        if !(self.radiation_constant > 0.0) {
            return Err(RadError::invalid_config(
                "radiation_constant",
                self.radiation_constant,
                "辐射常数必须为正",
            ));
        }
        if !(self.energy_unit > 0.0 && self.energy_unit.is_finite()) {
            return Err(RadError::invalid_config(
                "energy_unit",
                self.energy_unit,
                "群边界能量单位必须为正有限值",
            ));
        }
        if !(self.erad_floor > 0.0) {
            return Err(RadError::invalid_config(
                "erad_floor",
                self.erad_floor,
                "辐射能量地板值必须为正，否则闭合关系在真空区退化",
            ));
        }
        RadError::check_range("cfl", self.cfl, f64::MIN_POSITIVE, 1.0)?;
        if !(self.imex_a32 > 0.0 && self.imex_a32 <= IMEX_A32_MAX) {
            return Err(RadError::invalid_config(
                "imex_a32",
                self.imex_a32,
                "IMEX 权重必须位于 (0, 1/2]",
            ));
        }
        if self.beta_order > 3 {
            return Err(RadError::invalid_config(
                "beta_order",
                self.beta_order,
                "速度项展开阶数最高支持 3",
            ));
        }
        Ok(())
    }

    /// 光子群数
    #[inline]
    pub fn n_groups(&self) -> usize {
        self.boundaries.n_groups()
    }

    /// 单群的能量地板值
    #[inline]
    pub fn erad_floor_per_group(&self) -> f64 {
        self.erad_floor / self.n_groups() as f64
    }

    /// 约化光速与真空光速之比
    #[inline]
    pub fn chat_over_c(&self) -> f64 {
        self.c_hat / self.c_light
    }
}
