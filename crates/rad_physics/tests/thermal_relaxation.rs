// crates/rad_physics/tests/thermal_relaxation.rs

//! 物质-辐射热弛豫的端到端测试
//!
//! 单点网格上气体与辐射场从失衡态弛豫到共同温度，
//! 校验总能守恒与平衡温度的自洽性。

use rad_physics::boundary::Boundaries;
use rad_physics::config::RadiationConfig;
use rad_physics::eos::{EquationOfState, IdealGasEos};
use rad_physics::grid::Grid;
use rad_physics::groups::{GroupBoundaries, GroupVec};
use rad_physics::integrator::ImexIntegrator;
use rad_physics::opacity::{GroupOpacity, OpacityModel};
use rad_physics::planck::planck_energy_fractions;
use rad_physics::state::RadHydroState;
use std::sync::Arc;

struct ConstKappa {
    kappa: f64,
    n: usize,
}

impl GroupOpacity for ConstKappa {
    fn planck_mean(&self, _rho: f64, _t: f64) -> GroupVec {
        GroupVec::fill(self.kappa, self.n)
    }
}

fn pointwise_grid() -> Grid {
    Grid::new([1, 1, 1], [1.0, 1.0, 1.0], 2).unwrap()
}

fn gray_integrator(kappa: f64) -> ImexIntegrator {
    let mut cfg = RadiationConfig::gray_default();
    cfg.erad_floor = 1e-30;
    ImexIntegrator::new(
        cfg,
        OpacityModel::User(Arc::new(ConstKappa { kappa, n: 1 })),
        Arc::new(IdealGasEos::monatomic()),
        Boundaries::outflow(),
    )
    .unwrap()
}

fn make_state(rho: f64, t_gas: f64, erad: f64) -> RadHydroState {
    let eos = IdealGasEos::monatomic();
    let mut s = RadHydroState::zeros(1, 1);
    s.rho[0] = rho;
    s.e_int[0] = eos.internal_energy(rho, t_gas);
    s.e_gas[0] = s.e_int[0];
    s.e_rad[0] = erad;
    s
}

#[test]
fn relaxation_conserves_total_energy() {
    let integ = gray_integrator(100.0);
    let grid = pointwise_grid();
    let cfg = integ.config();
    let rho = 1.0e-10;
    // 气体 2e4 K，辐射场对应 1e4 K
    let mut s = make_state(rho, 2.0e4, cfg.radiation_constant * 1.0e16);
    let total_before = s.e_gas[0] + s.e_rad[0];

    // 大步长：隐式交换一步即应到达平衡附近
    integ.advance_substep(&mut s, &grid, None, 1.0e2).unwrap();

    let total_after = s.e_gas[0] + s.e_rad[0];
    assert!(
        (total_after - total_before).abs() / total_before < 1e-8,
        "total energy drifted: {:e} -> {:e}",
        total_before,
        total_after
    );
}

#[test]
fn relaxation_reaches_common_temperature() {
    let integ = gray_integrator(100.0);
    let grid = pointwise_grid();
    let cfg = integ.config();
    let eos = IdealGasEos::monatomic();
    let rho = 1.0e-10;
    let mut s = make_state(rho, 2.0e4, cfg.radiation_constant * 1.0e16);

    // 交换时标 ~1/(ĉρκ) ≈ 3e-3 s，取远大于它的步长
    integ.advance_substep(&mut s, &grid, None, 1.0e2).unwrap();

    let t_gas = eos.temperature(rho, s.e_int[0]);
    let t_rad = (s.e_rad[0] / cfg.radiation_constant).powf(0.25);
    assert!(
        (t_gas - t_rad).abs() / t_gas < 1e-4,
        "T_gas={} T_rad={}",
        t_gas,
        t_rad
    );
    // 平衡温度位于两个初始温度之间
    assert!(t_gas > 1.0e4 && t_gas < 2.0e4);
}

#[test]
fn relaxation_approach_is_monotonic() {
    let integ = gray_integrator(10.0);
    let grid = pointwise_grid();
    let cfg = integ.config();
    let eos = IdealGasEos::monatomic();
    let rho = 1.0e-10;
    let mut s = make_state(rho, 2.0e4, cfg.radiation_constant * 1.0e16);

    // 多个小步：气体温度单调下降，辐射能单调上升
    let mut t_prev = 2.0e4;
    let mut erad_prev = s.e_rad[0];
    for _ in 0..10 {
        integ.advance_substep(&mut s, &grid, None, 1.0e-3).unwrap();
        let t_gas = eos.temperature(rho, s.e_int[0]);
        assert!(t_gas <= t_prev + 1e-6);
        assert!(s.e_rad[0] >= erad_prev - 1e-12);
        t_prev = t_gas;
        erad_prev = s.e_rad[0];
    }
}

#[test]
fn multigroup_equilibrium_matches_planck_spectrum() {
    // 三群：光学厚平衡下逐群能量应按黑体谱份额分布
    let mut cfg = RadiationConfig::gray_default();
    cfg.boundaries = GroupBoundaries::from_edges(&[1.0e-2, 1.0, 3.0, 1.0e2]).unwrap();
    cfg.erad_floor = 3e-30;
    let integ = ImexIntegrator::new(
        cfg.clone(),
        OpacityModel::User(Arc::new(ConstKappa { kappa: 100.0, n: 3 })),
        Arc::new(IdealGasEos::monatomic()),
        Boundaries::outflow(),
    )
    .unwrap();
    let grid = pointwise_grid();
    let eos = IdealGasEos::monatomic();
    let rho = 1.0e-10;

    let mut s = RadHydroState::zeros(1, 3);
    s.rho[0] = rho;
    s.e_int[0] = eos.internal_energy(rho, 2.0e4);
    s.e_gas[0] = s.e_int[0];
    for g in 0..3 {
        s.e_rad[g] = 1.0e-6;
    }

    integ.advance_substep(&mut s, &grid, None, 1.0e2).unwrap();

    let t_gas = eos.temperature(rho, s.e_int[0]);
    let fractions = planck_energy_fractions(&cfg.boundaries, t_gas, cfg.energy_unit);
    let erad = s.erad_at(0);
    let total = erad.sum();
    for g in 0..3 {
        let measured = erad[g] / total;
        assert!(
            (measured - fractions[g]).abs() < 1e-2,
            "group {}: measured={} expected={}",
            g,
            measured,
            fractions[g]
        );
    }
}

#[test]
fn diffuse_gas_equilibrates_with_hot_radiation() {
    // 极稀薄气体（ρ=1e-24, κ=1）被 1000 K 的辐射场加热：
    // 气体热容远小于辐射能，平衡温度 ≈ 初始辐射温度
    let integ = gray_integrator(1.0);
    let grid = pointwise_grid();
    let cfg = integ.config();
    let eos = IdealGasEos::monatomic();
    let rho = 1.0e-24;
    let mut s = make_state(rho, 100.0, cfg.radiation_constant * 1.0e12);

    // 交换时标 1/(cκρ) ≈ 3e13 s，步长取远大于它
    integ.advance_substep(&mut s, &grid, None, 1.0e15).unwrap();

    let t_gas = eos.temperature(rho, s.e_int[0]);
    let t_rad = (s.e_rad[0] / cfg.radiation_constant).powf(0.25);
    assert!(
        (t_gas - t_rad).abs() / t_rad < 1e-6,
        "T_gas={} T_rad={}",
        t_gas,
        t_rad
    );
    assert!((t_rad - 1000.0).abs() / 1000.0 < 1e-6);
}

#[test]
fn zero_opacity_leaves_state_frozen() {
    let integ = gray_integrator(0.0);
    let grid = pointwise_grid();
    let cfg = integ.config();
    let mut s = make_state(1.0e-10, 2.0e4, cfg.radiation_constant * 1.0e16);
    let before = (s.e_gas[0], s.e_rad[0]);
    integ.advance_substep(&mut s, &grid, None, 1.0e3).unwrap();
    assert_eq!(s.e_gas[0], before.0);
    assert_eq!(s.e_rad[0], before.1);
}
