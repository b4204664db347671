// crates/rad_physics/src/boundary.rs

//! 鬼区边界填充
//!
//! 双曲更新的模板宽度为 2（PLM 重构需要两层邻居），每个阶段
//! 开始前都要重新填充鬼区。三个方向逐一处理，x→y→z 的顺序
//! 保证角区鬼元被传递填充。

use crate::grid::{Dir, Grid};
use crate::state::RadHydroState;

/// 单方向边界类型（两侧相同）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// 周期边界
    Periodic,
    /// 零梯度外推（流出）
    Outflow,
}

/// 三个方向的边界配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundaries {
    /// 逐方向边界类型
    pub kinds: [BoundaryKind; 3],
}

impl Boundaries {
    /// 全周期
    pub fn periodic() -> Self {
        Self {
            kinds: [BoundaryKind::Periodic; 3],
        }
    }

    /// 全流出
    pub fn outflow() -> Self {
        Self {
            kinds: [BoundaryKind::Outflow; 3],
        }
    }
}

/// 填充全部鬼区单元
pub fn fill_ghosts(state: &mut RadHydroState, grid: &Grid, bc: &Boundaries) {
    for dir in Dir::ALL {
        if grid.ghost()[dir.axis()] == 0 {
            continue;
        }
        let pairs = ghost_pairs(grid, dir, bc.kinds[dir.axis()]);
        apply_pairs(&mut state.rho, &pairs, 0);
        apply_pairs(&mut state.mom_x, &pairs, 0);
        apply_pairs(&mut state.mom_y, &pairs, 0);
        apply_pairs(&mut state.mom_z, &pairs, 0);
        apply_pairs(&mut state.e_gas, &pairs, 0);
        apply_pairs(&mut state.e_int, &pairs, 0);
        let n_cells = state.n_cells();
        for g in 0..state.n_groups() {
            let offset = g * n_cells;
            apply_pairs(&mut state.e_rad, &pairs, offset);
            apply_pairs(&mut state.flux_x, &pairs, offset);
            apply_pairs(&mut state.flux_y, &pairs, offset);
            apply_pairs(&mut state.flux_z, &pairs, offset);
        }
    }
}

/// 单方向的 (目标鬼元, 源单元) 线性索引对
fn ghost_pairs(grid: &Grid, dir: Dir, kind: BoundaryKind) -> Vec<(usize, usize)> {
    let axis = dir.axis();
    let total = grid.total();
    let w = grid.ghost()[axis];
    let n = grid.interior()[axis];

    let src_of = |pos: usize| -> usize {
        if pos < w {
            match kind {
                BoundaryKind::Periodic => pos + n,
                BoundaryKind::Outflow => w,
            }
        } else {
            debug_assert!(pos >= w + n);
            match kind {
                BoundaryKind::Periodic => pos - n,
                BoundaryKind::Outflow => w + n - 1,
            }
        }
    };

    let mut pairs = Vec::with_capacity(2 * w * grid.n_cells() / total[axis]);
    for k in 0..total[2] {
        for j in 0..total[1] {
            for i in 0..total[0] {
                let pos = [i, j, k][axis];
                if pos >= w && pos < w + n {
                    continue;
                }
                let mut src_coord = [i, j, k];
                src_coord[axis] = src_of(pos);
                pairs.push((
                    grid.index(i, j, k),
                    grid.index(src_coord[0], src_coord[1], src_coord[2]),
                ));
            }
        }
    }
    pairs
}

#[inline]
fn apply_pairs(field: &mut [f64], pairs: &[(usize, usize)], offset: usize) {
    for &(dst, src) in pairs {
        field[offset + dst] = field[offset + src];
    }
}
