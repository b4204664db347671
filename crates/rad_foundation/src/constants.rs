// crates/rad_foundation/src/constants.rs

//! 物理常数（CGS 单位制）
//!
//! 辐射输运计算统一采用 CGS 单位。自然常数保持 f64，不随计算精度改变。

/// 真空光速 [cm/s]
pub const C_LIGHT_CGS: f64 = 2.997_924_58e10;

/// 辐射常数 a_rad = 4σ/c [erg/cm³/K⁴]
pub const RADIATION_CONSTANT_CGS: f64 = 7.565_731e-15;

/// 玻尔兹曼常数 [erg/K]
pub const BOLTZMANN_CGS: f64 = 1.380_649e-16;

/// 氢原子质量 [g]
pub const HYDROGEN_MASS_CGS: f64 = 1.672_621_924e-24;

/// 电子伏特到尔格的换算 [erg/eV]
pub const EV2ERG: f64 = 1.602_176_634e-12;
