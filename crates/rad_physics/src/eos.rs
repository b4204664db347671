// crates/rad_physics/src/eos.rs

//! 气体状态方程
//!
//! 交换求解器需要在温度与内能之间来回转换，并取比热容作为
//! 牛顿迭代的雅可比元素。这里以 trait 抽象出接口，默认提供
//! 理想气体实现，调用方也可以注入制表 EOS。

use rad_foundation::constants::{BOLTZMANN_CGS, HYDROGEN_MASS_CGS};
use serde::{Deserialize, Serialize};

/// 状态方程接口
///
/// 所有量均为 CGS 单位。实现必须保证 `temperature` 与
/// `internal_energy` 互为反函数，且 `heat_capacity` 为
/// `internal_energy` 对温度的偏导。
pub trait EquationOfState: Send + Sync {
    /// 由密度与内能密度求温度 [K]
    fn temperature(&self, rho: f64, e_int: f64) -> f64;

    /// 由密度与温度求内能密度 [erg/cm³]
    fn internal_energy(&self, rho: f64, t_gas: f64) -> f64;

    /// 定容比热容 c_v = ∂E_int/∂T [erg/cm³/K]
    fn heat_capacity(&self, rho: f64, t_gas: f64) -> f64;
}

/// 理想气体状态方程
///
/// `E_int = ρ k_B T / (μ m_H (γ−1))`，c_v 与温度无关。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IdealGasEos {
    /// 绝热指数，必须大于 1
    pub gamma: f64,
    /// 平均分子量（以氢原子质量为单位）
    pub mean_molecular_weight: f64,
}

impl IdealGasEos {
    /// 单原子理想气体 (γ = 5/3, μ = 1)
    pub fn monatomic() -> Self {
        Self {
            gamma: 5.0 / 3.0,
            mean_molecular_weight: 1.0,
        }
    }

    #[inline]
    fn cv_per_mass(&self) -> f64 {
        BOLTZMANN_CGS / (self.mean_molecular_weight * HYDROGEN_MASS_CGS * (self.gamma - 1.0))
    }
}

impl EquationOfState for IdealGasEos {
    #[inline]
    fn temperature(&self, rho: f64, e_int: f64) -> f64 {
        e_int / (rho * self.cv_per_mass())
    }

    #[inline]
    fn internal_energy(&self, rho: f64, t_gas: f64) -> f64 {
        rho * self.cv_per_mass() * t_gas
    }

    #[inline]
    fn heat_capacity(&self, rho: f64, _t_gas: f64) -> f64 {
        rho * self.cv_per_mass()
    }
}
