// crates/rad_physics/src/closure.rs

//! M1 闭合引擎
//!
//! 两矩方法只演化辐射能量密度与通量，压力张量需由闭合关系补齐。
//! 本模块实现 Levermore (1984) 的 M1 闭合：由洛伦兹不变性导出的
//! 代数 Eddington 因子
//!
//! ```text
//! χ(f) = (3 + 4f²) / (5 + 2√(4 − 3f²)),  f = |F| / (cE)
//! ```
//!
//! χ 在各向同性极限 (f=0) 取 1/3，在自由流极限 (f=1) 取 1。
//! Eddington 张量由 χ 与通量方向单位向量组装：
//!
//! ```text
//! T_ij = (1−χ)/2 · δ_ij + (3χ−1)/2 · n_i n_j
//! ```

/// 3×3 Eddington 张量
pub type EddingtonTensor = [[f64; 3]; 3];

/// 计算标量 Eddington 因子 χ(f)
///
/// 输入为约化通量模 `f = |F|/(cE)`，内部裁剪到 [0, 1]。
/// 返回值保证位于 [1/3, 1]。
#[inline]
pub fn eddington_factor(f_in: f64) -> f64 {
    let f = f_in.clamp(0.0, 1.0);
    let f_fac = (4.0 - 3.0 * f * f).sqrt();
    (3.0 + 4.0 * f * f) / (5.0 + 2.0 * f_fac)
}

/// 由约化通量分量组装 Eddington 张量
///
/// 通量方向未定义时（f = 0）只保留各向同性项。
pub fn eddington_tensor(fx: f64, fy: f64, fz: f64) -> EddingtonTensor {
    let f = (fx * fx + fy * fy + fz * fz).sqrt();
    let fvec = [fx, fy, fz];

    let mut n = [0.0; 3];
    for (ni, fi) in n.iter_mut().zip(fvec.iter()) {
        *ni = if f > 0.0 { fi / f } else { 0.0 };
    }

    let chi = eddington_factor(f);
    debug_assert!((1.0 / 3.0..=1.0).contains(&chi));

    // 各向同性项与沿通量方向的各向异性项
    let t_diag = (1.0 - chi) / 2.0;
    let t_f = (3.0 * chi - 1.0) / 2.0;

    let mut t = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            let delta_ij = if i == j { 1.0 } else { 0.0 };
            t[i][j] = t_diag * delta_ij + t_f * n[i] * n[j];
        }
    }
    t
}
