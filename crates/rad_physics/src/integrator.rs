// crates/rad_physics/src/integrator.rs

//! IMEX 时间积分器
//!
//! 把双曲输运（显式 SSP-RK2）与物质-辐射交换（隐式逐单元）
//! 组合为一个辐射子步，并在一个流体步内按辐射 CFL 条件子循环：
//!
//! ```text
//! n_sub = ceil(Δt_hydro / (CFL·Δx_min/ĉ)),  1 ≤ n_sub < 10⁴
//! ```
//!
//! 每个子步的流程：
//!
//! 1. 填鬼区 → 阶段 1 通量 → 预测更新 → 交换源项（气体量按 a32 加权）
//! 2. 填鬼区 → 阶段 2 通量 → RK2 修正 → 交换源项（有效步长 (1−a32)Δt）

use crate::boundary::{fill_ghosts, Boundaries};
use crate::config::RadiationConfig;
use crate::eos::EquationOfState;
use crate::exchange::{add_source_terms, ExchangeStage};
use crate::flux::{compute_dir_fluxes, DirFluxes};
use crate::grid::{Dir, Grid};
use crate::opacity::OpacityModel;
use crate::state::RadHydroState;
use crate::update::{correct_step, predict_step};
use log::debug;
use rad_foundation::{RadError, RadResult};
use std::sync::Arc;

/// 辐射子循环步数上限（不含）
const MAX_SUBSTEPS: usize = 10_000;

/// 辐射 IMEX 积分器
pub struct ImexIntegrator {
    cfg: RadiationConfig,
    opacity: OpacityModel,
    eos: Arc<dyn EquationOfState>,
    bc: Boundaries,
    /// 是否启用奇偶失稳抑制的波速修正
    pub use_wavespeed_correction: bool,
}

impl ImexIntegrator {
    /// 创建积分器，配置在此处校验
    pub fn new(
        cfg: RadiationConfig,
        opacity: OpacityModel,
        eos: Arc<dyn EquationOfState>,
        bc: Boundaries,
    ) -> RadResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            opacity,
            eos,
            bc,
            use_wavespeed_correction: false,
        })
    }

    /// 配置只读访问
    pub fn config(&self) -> &RadiationConfig {
        &self.cfg
    }

    /// 单元处的最大辐射信号速度，供外部流体 CFL 条件使用
    ///
    /// M1 特征速度上界为约化光速 ĉ，与局部状态无关。
    #[inline]
    pub fn max_signal_speed(&self, _state: &RadHydroState, _cell: usize) -> f64 {
        self.cfg.c_hat
    }

    /// 由流体步长求 (子步数, 子步长)
    pub fn num_substeps(&self, grid: &Grid, dt_hydro: f64) -> RadResult<(usize, f64)> {
        if !(dt_hydro > 0.0 && dt_hydro.is_finite()) {
            return Err(RadError::invalid_config(
                "dt_hydro",
                dt_hydro,
                "流体步长必须为正有限值",
            ));
        }
        let dt_rad_max = self.cfg.cfl * grid.min_active_dx() / self.cfg.c_hat;
        let n_sub = (dt_hydro / dt_rad_max).ceil() as usize;
        let n_sub = n_sub.max(1);
        if n_sub >= MAX_SUBSTEPS {
            return Err(RadError::SubstepOutOfBounds {
                substeps: n_sub,
                limit: MAX_SUBSTEPS,
            });
        }
        Ok((n_sub, dt_hydro / n_sub as f64))
    }

    /// 参与双曲更新的方向
    fn active_dirs(&self, grid: &Grid) -> Vec<Dir> {
        Dir::ALL.into_iter().filter(|&d| grid.is_active(d)).collect()
    }

    fn dir_fluxes(&self, state: &RadHydroState, grid: &Grid, dirs: &[Dir]) -> Vec<DirFluxes> {
        dirs.iter()
            .map(|&d| {
                compute_dir_fluxes(
                    state,
                    grid,
                    d,
                    &self.cfg,
                    &self.opacity,
                    self.eos.as_ref(),
                    self.use_wavespeed_correction,
                )
            })
            .collect()
    }

    /// 推进一个辐射子步
    pub fn advance_substep(
        &self,
        state: &mut RadHydroState,
        grid: &Grid,
        rad_source: Option<&[f64]>,
        dt_rad: f64,
    ) -> RadResult<()> {
        let dirs = self.active_dirs(grid);

        // 阶段 1: 预测
        fill_ghosts(state, grid, &self.bc);
        let state0 = state.clone();
        let fluxes0 = self.dir_fluxes(&state0, grid, &dirs);
        let mut stage1 = predict_step(&state0, grid, &fluxes0, dt_rad, &self.cfg);
        add_source_terms(
            &mut stage1,
            grid,
            &self.cfg,
            &self.opacity,
            self.eos.as_ref(),
            rad_source,
            dt_rad,
            ExchangeStage::Stage1,
        )?;

        // 阶段 2: 修正
        fill_ghosts(&mut stage1, grid, &self.bc);
        let fluxes1 = self.dir_fluxes(&stage1, grid, &dirs);
        let mut stage2 = correct_step(&state0, &stage1, grid, &fluxes0, &fluxes1, dt_rad, &self.cfg);
        add_source_terms(
            &mut stage2,
            grid,
            &self.cfg,
            &self.opacity,
            self.eos.as_ref(),
            rad_source,
            dt_rad,
            ExchangeStage::Stage2,
        )?;

        *state = stage2;
        Ok(())
    }

    /// 在一个流体步内完成辐射子循环
    ///
    /// 返回执行的子步数。
    pub fn advance_hydro_step(
        &self,
        state: &mut RadHydroState,
        grid: &Grid,
        rad_source: Option<&[f64]>,
        dt_hydro: f64,
    ) -> RadResult<usize> {
        let (n_sub, dt_rad) = self.num_substeps(grid, dt_hydro)?;
        debug!("辐射子循环: {} 步, dt = {:.3e}", n_sub, dt_rad);
        for _ in 0..n_sub {
            self.advance_substep(state, grid, rad_source, dt_rad)?;
        }
        Ok(n_sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eos::IdealGasEos;
    use crate::groups::GroupVec;
    use crate::opacity::GroupOpacity;

    struct ConstKappa(f64);
    impl GroupOpacity for ConstKappa {
        fn planck_mean(&self, _rho: f64, _t: f64) -> GroupVec {
            GroupVec::fill(self.0, 1)
        }
    }

    fn make_integrator(kappa: f64, c_hat: f64) -> ImexIntegrator {
        let mut cfg = RadiationConfig::gray_default();
        cfg.c_light = c_hat;
        cfg.c_hat = c_hat;
        cfg.erad_floor = 1e-30;
        ImexIntegrator::new(
            cfg,
            OpacityModel::User(Arc::new(ConstKappa(kappa))),
            Arc::new(IdealGasEos::monatomic()),
            Boundaries::periodic(),
        )
        .unwrap()
    }

    #[test]
    fn test_substep_count() {
        let integ = make_integrator(0.0, 10.0);
        let grid = Grid::new([8, 1, 1], [1.0, 1.0, 1.0], 2).unwrap();
        // dt_rad_max = 0.8·1/10 = 0.08
        let (n, dt) = integ.num_substeps(&grid, 1.0).unwrap();
        assert_eq!(n, 13);
        assert!((dt - 1.0 / 13.0).abs() < 1e-15);
        // 恰好整除
        let (n, dt) = integ.num_substeps(&grid, 0.16).unwrap();
        assert_eq!(n, 2);
        assert!((dt - 0.08).abs() < 1e-15);
        // 小于单步上限
        let (n, _) = integ.num_substeps(&grid, 0.01).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_max_signal_speed_is_reduced_light_speed() {
        let c_hat = 10.0;
        let integ = make_integrator(1.0, c_hat);
        let grid = Grid::new([8, 1, 1], [1.0, 1.0, 1.0], 2).unwrap();
        let mut s = RadHydroState::zeros(grid.n_cells(), 1);
        for c in 0..grid.n_cells() {
            s.rho[c] = 1e-10;
            s.e_rad[c] = 1.0;
            s.flux_x[c] = c_hat * 0.9;
        }
        for &cell in &grid.interior_indices() {
            assert_eq!(integ.max_signal_speed(&s, cell), c_hat);
        }
    }

    #[test]
    fn test_substep_limit_enforced() {
        let integ = make_integrator(0.0, 10.0);
        let grid = Grid::new([8, 1, 1], [1.0, 1.0, 1.0], 2).unwrap();
        let out = integ.num_substeps(&grid, 1.0e4);
        assert!(matches!(out, Err(RadError::SubstepOutOfBounds { .. })));
    }

    #[test]
    fn test_invalid_dt_rejected() {
        let integ = make_integrator(0.0, 10.0);
        let grid = Grid::new([8, 1, 1], [1.0, 1.0, 1.0], 2).unwrap();
        assert!(integ.num_substeps(&grid, 0.0).is_err());
        assert!(integ.num_substeps(&grid, f64::NAN).is_err());
    }

    #[test]
    fn test_pointwise_grid_reduces_to_exchange() {
        // 1×1×1 网格没有活跃方向，子步退化为纯交换
        let mut cfg = RadiationConfig::gray_default();
        cfg.erad_floor = 1e-30;
        let integ = ImexIntegrator::new(
            cfg.clone(),
            OpacityModel::User(Arc::new(ConstKappa(10.0))),
            Arc::new(IdealGasEos::monatomic()),
            Boundaries::outflow(),
        )
        .unwrap();
        let grid = Grid::new([1, 1, 1], [1.0, 1.0, 1.0], 2).unwrap();
        let eos = IdealGasEos::monatomic();
        let mut s = RadHydroState::zeros(1, 1);
        s.rho[0] = 1e-10;
        s.e_int[0] = eos.internal_energy(1e-10, 2.0e4);
        s.e_gas[0] = s.e_int[0];
        s.e_rad[0] = cfg.radiation_constant * 1.0e12;
        let total_before = s.e_gas[0] + s.e_rad[0];
        integ.advance_substep(&mut s, &grid, None, 1.0e3).unwrap();
        let total_after = s.e_gas[0] + s.e_rad[0];
        // c = ĉ，两个交换阶段合计守恒
        assert!((total_after - total_before).abs() / total_before < 1e-9);
        // 气体向辐射场弛豫
        assert!(s.e_rad[0] > cfg.radiation_constant * 1.0e12);
    }

    #[test]
    fn test_uniform_equilibrium_is_steady() {
        // 均匀平衡态经过完整流体步保持不变
        let c_hat = 10.0;
        let integ = make_integrator(1.0, c_hat);
        let grid = Grid::new([8, 1, 1], [1.0, 1.0, 1.0], 2).unwrap();
        let eos = IdealGasEos::monatomic();
        let cfg = integ.config().clone();

        let t_eq: f64 = 1.0e4;
        let erad_eq = cfg.radiation_constant * t_eq.powi(4);
        let mut s = RadHydroState::zeros(grid.n_cells(), 1);
        for c in 0..grid.n_cells() {
            s.rho[c] = 1e-10;
            s.e_int[c] = eos.internal_energy(1e-10, t_eq);
            s.e_gas[c] = s.e_int[c];
            s.e_rad[c] = erad_eq;
        }
        let egas0 = s.e_gas[2];
        let n = integ.advance_hydro_step(&mut s, &grid, None, 0.2).unwrap();
        assert!(n >= 1);
        for &cell in &grid.interior_indices() {
            assert!((s.e_rad[cell] - erad_eq).abs() / erad_eq < 1e-8);
            assert!((s.e_gas[cell] - egas0).abs() / egas0 < 1e-8);
            assert!(s.flux_at(0, cell).length() < 1e-8 * c_hat * erad_eq);
        }
    }
}
