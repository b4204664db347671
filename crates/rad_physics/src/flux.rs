// crates/rad_physics/src/flux.rs

//! 界面通量求解器
//!
//! 对每个方向、每个界面、每个光子群求解冻结 Eddington 张量
//! 近似下的 HLL Riemann 问题。波速取自 M1 系统的特征值估计
//! (Skinner & Ostriker 2013)：
//!
//! ```text
//! S_L = −max(0.1, √T_nn)·ĉ,   S_R = +max(0.1, √T_nn)·ĉ
//! ```
//!
//! 重构在原始变量 (E_r, f) 上做 minmod 限制的 PLM；重构态
//! 不可采（E ≤ 0 或 |f| ≥ 1）时逐群退回一阶迎风值。
//! 约化光速修正：能量通量乘 ĉ/c，动量通量乘 ĉ·c。
//!
//! 奇偶失稳抑制（可选）：在坐标和为偶数的单元上，能量分量的
//! HLL 耗散项乘 min(1, 1/τ)，τ 为界面两侧光学厚度的调和平均
//! (Skinner et al. 2019)。

use crate::closure::eddington_tensor;
use crate::config::RadiationConfig;
use crate::eos::EquationOfState;
use crate::grid::{Dir, Grid};
use crate::groups::GroupVec;
use crate::opacity::{minmod, OpacityModel};
use crate::state::RadHydroState;
use rayon::prelude::*;

/// 每群四个守恒分量：能量与三个通量分量
pub const N_RAD_VARS: usize = 4;

/// 单个界面上的逐群通量
///
/// `hll` 是带奇偶修正的工作通量，`diffusive` 是修正系数恒为 1
/// 的参考通量（诊断用）。
#[derive(Debug, Clone, Copy)]
pub struct InterfaceFlux {
    /// HLL 通量，分量顺序 [E, Fx, Fy, Fz]
    pub hll: [GroupVec; N_RAD_VARS],
    /// 无波速修正的 HLL 通量
    pub diffusive: [GroupVec; N_RAD_VARS],
}

impl InterfaceFlux {
    fn zeros(n_groups: usize) -> Self {
        let z = GroupVec::zeros(n_groups);
        Self {
            hll: [z; N_RAD_VARS],
            diffusive: [z; N_RAD_VARS],
        }
    }
}

/// 单方向的界面通量场
///
/// 按单元线性索引存储，`flux[idx]` 是 idx 单元下侧面上的通量。
/// 沿该轴坐标位于 `[w, w+n]` 的条目有效。
pub struct DirFluxes {
    /// 方向
    pub dir: Dir,
    /// 界面通量，长度为含鬼区总单元数
    pub flux: Vec<InterfaceFlux>,
}

/// 一个群在一侧的界面状态
#[derive(Clone, Copy)]
struct SideState {
    erad: f64,
    flux: [f64; 3],
    reduced: [f64; 3],
}

/// 计算一个方向上的全部界面通量
pub fn compute_dir_fluxes(
    state: &RadHydroState,
    grid: &Grid,
    dir: Dir,
    cfg: &RadiationConfig,
    opacity: &OpacityModel,
    eos: &dyn EquationOfState,
    use_wavespeed_correction: bool,
) -> DirFluxes {
    let n_groups = state.n_groups();
    let axis = dir.axis();
    let w = grid.ghost()[axis];
    let n = grid.interior()[axis];
    let total = grid.total();
    debug_assert!(w >= 2, "PLM 重构需要两层鬼区");

    // 收集需要求解的界面（host 单元的线性索引）
    let mut interfaces = Vec::new();
    for k in 0..total[2] {
        for j in 0..total[1] {
            for i in 0..total[0] {
                let pos = [i, j, k][axis];
                if pos >= w && pos <= w + n {
                    interfaces.push(grid.index(i, j, k));
                }
            }
        }
    }

    let solved: Vec<(usize, InterfaceFlux)> = interfaces
        .par_iter()
        .map(|&idx| {
            (
                idx,
                solve_interface(
                    state,
                    grid,
                    dir,
                    idx,
                    cfg,
                    opacity,
                    eos,
                    use_wavespeed_correction,
                ),
            )
        })
        .collect();

    let mut flux = vec![InterfaceFlux::zeros(n_groups); grid.n_cells()];
    for (idx, f) in solved {
        flux[idx] = f;
    }
    DirFluxes { dir, flux }
}

/// 求解单个界面（idx 单元的下侧面）
#[allow(clippy::too_many_arguments)]
fn solve_interface(
    state: &RadHydroState,
    grid: &Grid,
    dir: Dir,
    idx: usize,
    cfg: &RadiationConfig,
    opacity: &OpacityModel,
    eos: &dyn EquationOfState,
    use_wavespeed_correction: bool,
) -> InterfaceFlux {
    let n_groups = state.n_groups();
    let stride = grid.stride(dir);
    let c = cfg.c_light;
    let chat = cfg.c_hat;

    let tau_cell = if use_wavespeed_correction {
        interface_optical_depth(state, grid, dir, idx, cfg, opacity, eos)
    } else {
        GroupVec::fill(1.0, n_groups)
    };

    // 奇偶修正只施加在坐标和为偶数的单元上
    let coords = grid.coords(idx);
    let even_cell = (coords[0] + coords[1] + coords[2]) % 2 == 0;

    let mut out = InterfaceFlux::zeros(n_groups);
    for g in 0..n_groups {
        let (left, right) = reconstruct_states(state, idx, stride, g, c);

        let (f_l, s_l_mag) = pressure_flux(&left, dir);
        let (f_r, s_r_mag) = pressure_flux(&right, dir);

        // 约化光速缩放
        let mut f_l = f_l;
        let mut f_r = f_r;
        f_l[0] *= chat / c;
        f_r[0] *= chat / c;
        for comp in 1..N_RAD_VARS {
            f_l[comp] *= chat * c;
            f_r[comp] *= chat * c;
        }
        let s_l = -s_l_mag * chat;
        let s_r = s_r_mag * chat;

        let u_l = [left.erad, left.flux[0], left.flux[1], left.flux[2]];
        let u_r = [right.erad, right.flux[0], right.flux[1], right.flux[2]];

        let mut epsilon = [1.0; N_RAD_VARS];
        if use_wavespeed_correction && even_cell {
            epsilon[0] = (1.0 / tau_cell[g]).min(1.0);
        }

        let ds = s_r - s_l;
        for comp in 0..N_RAD_VARS {
            let base = (s_r * f_l[comp] - s_l * f_r[comp]) / ds;
            let dissipation = s_r * s_l / ds * (u_r[comp] - u_l[comp]);
            out.hll[comp][g] = base + epsilon[comp] * dissipation;
            out.diffusive[comp][g] = base + dissipation;
            debug_assert!(
                out.hll[comp][g].is_finite(),
                "界面通量非有限: idx={} g={} comp={}",
                idx,
                g,
                comp
            );
        }
    }
    out
}

/// 读取单元 `cell` 第 g 群的原始变量
#[inline]
fn primitive(state: &RadHydroState, g: usize, cell: usize, c: f64) -> (f64, [f64; 3]) {
    let e = state.e_rad[state.rad_idx(g, cell)];
    let f = state.flux_at(g, cell);
    let inv = 1.0 / (c * e);
    (e, [f.x * inv, f.y * inv, f.z * inv])
}

/// 界面两侧的 PLM 重构态，不可采时退回一阶
fn reconstruct_states(
    state: &RadHydroState,
    idx: usize,
    stride: usize,
    g: usize,
    c: f64,
) -> (SideState, SideState) {
    // 界面位于 idx 的下侧，左单元 idx-s，右单元 idx
    let (e_ll, f_ll) = primitive(state, g, idx - 2 * stride, c);
    let (e_l, f_l) = primitive(state, g, idx - stride, c);
    let (e_r, f_r) = primitive(state, g, idx, c);
    let (e_rr, f_rr) = primitive(state, g, idx + stride, c);

    let recon = |qll: f64, ql: f64, qr: f64, qrr: f64| -> (f64, f64) {
        let left = ql + 0.5 * minmod(ql - qll, qr - ql);
        let right = qr - 0.5 * minmod(qr - ql, qrr - qr);
        (left, right)
    };

    let (erad_l, erad_r) = recon(e_ll, e_l, e_r, e_rr);
    let mut red_l = [0.0; 3];
    let mut red_r = [0.0; 3];
    for a in 0..3 {
        let (l, r) = recon(f_ll[a], f_l[a], f_r[a], f_rr[a]);
        red_l[a] = l;
        red_r[a] = r;
    }

    let norm = |v: &[f64; 3]| (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    let make = |e: f64, red: [f64; 3]| SideState {
        erad: e,
        flux: [red[0] * c * e, red[1] * c * e, red[2] * c * e],
        reduced: red,
    };

    if erad_l <= 0.0 || erad_r <= 0.0 || norm(&red_l) >= 1.0 || norm(&red_r) >= 1.0 {
        // 一阶迎风退化
        return (make(e_l, f_l), make(e_r, f_r));
    }
    (make(erad_l, red_l), make(erad_r, red_r))
}

/// 由一侧状态计算物理通量与波速模
///
/// 返回 ([F_n, T_nx·E, T_ny·E, T_nz·E], max(0.1, √T_nn))。
/// 0.1 的下限防止自由流极限下左右波速同时退化为零。
fn pressure_flux(side: &SideState, dir: Dir) -> ([f64; N_RAD_VARS], f64) {
    let t = eddington_tensor(side.reduced[0], side.reduced[1], side.reduced[2]);
    let n = dir.axis();
    let flux = [
        side.flux[n],
        t[n][0] * side.erad,
        t[n][1] * side.erad,
        t[n][2] * side.erad,
    ];
    let speed = t[n][n].sqrt().max(0.1);
    (flux, speed)
}

/// 界面两侧逐群光学厚度的调和平均
fn interface_optical_depth(
    state: &RadHydroState,
    grid: &Grid,
    dir: Dir,
    idx: usize,
    cfg: &RadiationConfig,
    opacity: &OpacityModel,
    eos: &dyn EquationOfState,
) -> GroupVec {
    let stride = grid.stride(dir);
    let dl = grid.dx(dir);

    let tau_of = |cell: usize| -> GroupVec {
        let rho = state.rho[cell];
        let e_int = state.eint_from_etot(cell);
        let t_gas = eos.temperature(rho, e_int);
        let erad = state.erad_at(cell);
        let eval = opacity.evaluate(rho, t_gas, &erad, &erad, &cfg.boundaries);
        eval.flux * (dl * rho)
    };

    let tau_l = tau_of(idx - stride);
    let tau_r = tau_of(idx);
    tau_l.zip_with(&tau_r, |a, b| 2.0 * a * b / (a + b))
}
