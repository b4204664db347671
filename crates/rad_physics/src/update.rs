// crates/rad_physics/src/update.rs

//! 双曲更新器
//!
//! 对辐射子系统做两阶段 SSP-RK2（PD-ARS 族）显式更新：
//!
//! ```text
//! 预测:  U¹ = U⁰ + ΔtDivF(U⁰)
//! 修正:  U^{n+1} = (1−a32)·U⁰ + a32·U¹ + (1/2−a32)·ΔtDivF(U⁰) + 1/2·ΔtDivF(U¹)
//! ```
//!
//! 其中 `ΔtDivF` 取 `dt·(F_下侧 − F_上侧)/dx` 并对活跃方向累加。
//! 每个阶段结束后对内部单元做可采性修复（能量地板、通量限幅）。
//! 气体场不参与双曲辐射更新。

use crate::config::RadiationConfig;
use crate::flux::{DirFluxes, N_RAD_VARS};
use crate::grid::Grid;
use crate::groups::GroupVec;
use crate::state::RadHydroState;
use rayon::prelude::*;

/// 单元处的通量差分增量，分量顺序 [E, Fx, Fy, Fz]
fn dt_div_flux(
    fluxes: &[DirFluxes],
    grid: &Grid,
    dt: f64,
    cell: usize,
    n_groups: usize,
) -> [GroupVec; N_RAD_VARS] {
    let mut out = [GroupVec::zeros(n_groups); N_RAD_VARS];
    for df in fluxes {
        let stride = grid.stride(df.dir);
        let scale = dt / grid.dx(df.dir);
        let lo = &df.flux[cell];
        let hi = &df.flux[cell + stride];
        for comp in 0..N_RAD_VARS {
            out[comp] += (lo.hll[comp] - hi.hll[comp]) * scale;
        }
    }
    out
}

/// 把逐群增量写回状态
fn write_rad_cell(state: &mut RadHydroState, cell: usize, values: &[GroupVec; N_RAD_VARS]) {
    for g in 0..state.n_groups() {
        let idx = state.rad_idx(g, cell);
        state.e_rad[idx] = values[0][g];
        state.flux_x[idx] = values[1][g];
        state.flux_y[idx] = values[2][g];
        state.flux_z[idx] = values[3][g];
    }
}

/// 读出单元的逐群辐射守恒量
fn read_rad_cell(state: &RadHydroState, cell: usize) -> [GroupVec; N_RAD_VARS] {
    let n_groups = state.n_groups();
    let mut out = [GroupVec::zeros(n_groups); N_RAD_VARS];
    for g in 0..n_groups {
        let idx = state.rad_idx(g, cell);
        out[0][g] = state.e_rad[idx];
        out[1][g] = state.flux_x[idx];
        out[2][g] = state.flux_y[idx];
        out[3][g] = state.flux_z[idx];
    }
    out
}

/// 预测阶段：一阶前向 Euler
///
/// 返回以 `state` 为拷贝、内部单元辐射场更新后的新状态。
pub fn predict_step(
    state: &RadHydroState,
    grid: &Grid,
    fluxes: &[DirFluxes],
    dt: f64,
    cfg: &RadiationConfig,
) -> RadHydroState {
    let n_groups = state.n_groups();
    let interior = grid.interior_indices();

    let updated: Vec<(usize, [GroupVec; N_RAD_VARS])> = interior
        .par_iter()
        .map(|&cell| {
            let u0 = read_rad_cell(state, cell);
            let div = dt_div_flux(fluxes, grid, dt, cell, n_groups);
            let mut u1 = u0;
            for comp in 0..N_RAD_VARS {
                u1[comp] += div[comp];
            }
            (cell, u1)
        })
        .collect();

    let mut next = state.clone();
    let floor = cfg.erad_floor_per_group();
    for (cell, u1) in updated {
        write_rad_cell(&mut next, cell, &u1);
        next.amend_rad_cell(cell, cfg.c_light, floor);
        debug_assert!(next.check_cell(cell).is_ok(), "预测态不可采: cell={}", cell);
    }
    next
}

/// 修正阶段：SSP-RK2 组合
///
/// `state0`/`fluxes0` 为步首状态与通量，`state1`/`fluxes1`
/// 为预测态与其通量。RK2 组合只作用于辐射场，气体场
/// （含阶段 1 交换源项的更新）从预测态原样带过。
pub fn correct_step(
    state0: &RadHydroState,
    state1: &RadHydroState,
    grid: &Grid,
    fluxes0: &[DirFluxes],
    fluxes1: &[DirFluxes],
    dt: f64,
    cfg: &RadiationConfig,
) -> RadHydroState {
    let n_groups = state0.n_groups();
    let a32 = cfg.imex_a32;
    let interior = grid.interior_indices();

    let updated: Vec<(usize, [GroupVec; N_RAD_VARS])> = interior
        .par_iter()
        .map(|&cell| {
            let u0 = read_rad_cell(state0, cell);
            let u1 = read_rad_cell(state1, cell);
            let div0 = dt_div_flux(fluxes0, grid, dt, cell, n_groups);
            let div1 = dt_div_flux(fluxes1, grid, dt, cell, n_groups);
            let mut u_new = [GroupVec::zeros(n_groups); N_RAD_VARS];
            for comp in 0..N_RAD_VARS {
                u_new[comp] = u0[comp] * (1.0 - a32)
                    + u1[comp] * a32
                    + div0[comp] * (0.5 - a32)
                    + div1[comp] * 0.5;
            }
            (cell, u_new)
        })
        .collect();

    let mut next = state1.clone();
    let floor = cfg.erad_floor_per_group();
    for (cell, u_new) in updated {
        write_rad_cell(&mut next, cell, &u_new);
        next.amend_rad_cell(cell, cfg.c_light, floor);
        debug_assert!(next.check_cell(cell).is_ok(), "修正态不可采: cell={}", cell);
    }
    next
}
