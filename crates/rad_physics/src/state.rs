// crates/rad_physics/src/state.rs

//! 辐射流体状态模型
//!
//! 全部场量按 SoA 布局存储，逐群场采用群主序：
//!
//! ```text
//! e_rad[g * n_cells + cell]
//! ```
//!
//! 气体侧同时携带总能 `e_gas`（内能+动能）与辅助内能 `e_int`，
//! 交换求解后两者同步更新；辅助内能避免在高马赫数区域用
//! 总能减动能造成灾难性相消。

use crate::groups::GroupVec;
use glam::DVec3;
use rad_foundation::{RadError, RadResult};

/// 辐射流体守恒量场
#[derive(Debug, Clone)]
pub struct RadHydroState {
    /// 单元总数（含鬼区）
    n_cells: usize,
    /// 光子群数
    n_groups: usize,
    /// 气体密度 [g/cm³]
    pub rho: Vec<f64>,
    /// 气体动量密度 x 分量 [g/cm²/s]
    pub mom_x: Vec<f64>,
    /// 气体动量密度 y 分量
    pub mom_y: Vec<f64>,
    /// 气体动量密度 z 分量
    pub mom_z: Vec<f64>,
    /// 气体总能密度（内能+动能）[erg/cm³]
    pub e_gas: Vec<f64>,
    /// 气体辅助内能密度 [erg/cm³]
    pub e_int: Vec<f64>,
    /// 逐群辐射能量密度，群主序 [erg/cm³]
    pub e_rad: Vec<f64>,
    /// 逐群辐射通量 x 分量，群主序 [erg/cm²/s]
    pub flux_x: Vec<f64>,
    /// 逐群辐射通量 y 分量
    pub flux_y: Vec<f64>,
    /// 逐群辐射通量 z 分量
    pub flux_z: Vec<f64>,
}

impl RadHydroState {
    /// 创建全零状态
    pub fn zeros(n_cells: usize, n_groups: usize) -> Self {
        let ng = n_cells * n_groups;
        Self {
            n_cells,
            n_groups,
            rho: vec![0.0; n_cells],
            mom_x: vec![0.0; n_cells],
            mom_y: vec![0.0; n_cells],
            mom_z: vec![0.0; n_cells],
            e_gas: vec![0.0; n_cells],
            e_int: vec![0.0; n_cells],
            e_rad: vec![0.0; ng],
            flux_x: vec![0.0; ng],
            flux_y: vec![0.0; ng],
            flux_z: vec![0.0; ng],
        }
    }

    /// 单元总数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// 光子群数
    #[inline]
    pub fn n_groups(&self) -> usize {
        self.n_groups
    }

    /// 逐群场的线性索引
    #[inline]
    pub fn rad_idx(&self, g: usize, cell: usize) -> usize {
        debug_assert!(g < self.n_groups && cell < self.n_cells);
        g * self.n_cells + cell
    }

    // --------------------------------------------------------
    // 逐单元读写
    // --------------------------------------------------------

    /// 单元处的逐群辐射能量
    #[inline]
    pub fn erad_at(&self, cell: usize) -> GroupVec {
        let mut out = GroupVec::zeros(self.n_groups);
        for g in 0..self.n_groups {
            out[g] = self.e_rad[self.rad_idx(g, cell)];
        }
        out
    }

    /// 单元处第 g 群的辐射通量向量
    #[inline]
    pub fn flux_at(&self, g: usize, cell: usize) -> DVec3 {
        let idx = self.rad_idx(g, cell);
        DVec3::new(self.flux_x[idx], self.flux_y[idx], self.flux_z[idx])
    }

    /// 写回单元处的逐群辐射能量
    #[inline]
    pub fn set_erad_at(&mut self, cell: usize, values: &GroupVec) {
        for g in 0..self.n_groups {
            let idx = self.rad_idx(g, cell);
            self.e_rad[idx] = values[g];
        }
    }

    /// 写回单元处第 g 群的辐射通量向量
    #[inline]
    pub fn set_flux_at(&mut self, g: usize, cell: usize, f: DVec3) {
        let idx = self.rad_idx(g, cell);
        self.flux_x[idx] = f.x;
        self.flux_y[idx] = f.y;
        self.flux_z[idx] = f.z;
    }

    /// 气体速度
    #[inline]
    pub fn velocity(&self, cell: usize) -> DVec3 {
        let rho = self.rho[cell];
        DVec3::new(self.mom_x[cell], self.mom_y[cell], self.mom_z[cell]) / rho
    }

    /// 气体动能密度
    #[inline]
    pub fn kinetic_energy(&self, cell: usize) -> f64 {
        let m = DVec3::new(self.mom_x[cell], self.mom_y[cell], self.mom_z[cell]);
        0.5 * m.length_squared() / self.rho[cell]
    }

    /// 由总能减动能得到内能（仅诊断用，演化路径使用辅助内能）
    #[inline]
    pub fn eint_from_etot(&self, cell: usize) -> f64 {
        self.e_gas[cell] - self.kinetic_energy(cell)
    }

    // --------------------------------------------------------
    // 可采性修复与检查
    // --------------------------------------------------------

    /// 修复单元处的辐射状态
    ///
    /// 能量低于地板值则抬升到地板值；约化通量超光速则等比缩回
    /// 到 |F| = c·E_r。双曲更新的每个阶段之后都要调用。
    pub fn amend_rad_cell(&mut self, cell: usize, c_light: f64, erad_floor: f64) {
        for g in 0..self.n_groups {
            let idx = self.rad_idx(g, cell);
            if self.e_rad[idx] < erad_floor {
                self.e_rad[idx] = erad_floor;
            }
            let f = DVec3::new(self.flux_x[idx], self.flux_y[idx], self.flux_z[idx]);
            let f_norm = f.length();
            let f_max = c_light * self.e_rad[idx];
            if f_norm > f_max {
                let scale = f_max / f_norm;
                self.flux_x[idx] *= scale;
                self.flux_y[idx] *= scale;
                self.flux_z[idx] *= scale;
            }
        }
    }

    /// 对一批单元批量修复
    pub fn amend_rad_cells(&mut self, cells: &[usize], c_light: f64, erad_floor: f64) {
        for &cell in cells {
            self.amend_rad_cell(cell, c_light, erad_floor);
        }
    }

    /// 检查单元状态是否可采（有限、密度为正、辐射能非负）
    pub fn check_cell(&self, cell: usize) -> RadResult<()> {
        if !(self.rho[cell] > 0.0 && self.rho[cell].is_finite()) {
            return Err(RadError::non_finite("气体密度", cell));
        }
        RadError::check_finite("气体总能", self.e_gas[cell], cell)?;
        RadError::check_finite("气体内能", self.e_int[cell], cell)?;
        for g in 0..self.n_groups {
            let idx = self.rad_idx(g, cell);
            if !self.e_rad[idx].is_finite() || self.e_rad[idx] < 0.0 {
                return Err(RadError::non_finite("辐射能量", cell));
            }
            if !self.flux_at(g, cell).is_finite() {
                return Err(RadError::non_finite("辐射通量", cell));
            }
        }
        Ok(())
    }

    // --------------------------------------------------------
    // 守恒量诊断
    // --------------------------------------------------------

    /// 指定单元集合上的辐射总能
    pub fn total_rad_energy(&self, cells: &[usize]) -> f64 {
        let mut sum = 0.0;
        for &cell in cells {
            for g in 0..self.n_groups {
                sum += self.e_rad[self.rad_idx(g, cell)];
            }
        }
        sum
    }

    /// 指定单元集合上的气体总能
    pub fn total_gas_energy(&self, cells: &[usize]) -> f64 {
        cells.iter().map(|&c| self.e_gas[c]).sum()
    }
}
