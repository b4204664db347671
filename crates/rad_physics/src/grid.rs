// crates/rad_physics/src/grid.rs

//! 结构化网格几何
//!
//! 求解器在带鬼区的均匀笛卡尔网格上工作。场数据按 SoA 存储，
//! 本模块只负责几何与索引：
//!
//! ```text
//! 线性索引 idx = (k·ny_tot + j)·nx_tot + i   （x 最快）
//! ```
//!
//! 退化维度（格数为 1）不加鬼区，三个方向的鬼区宽度彼此独立。

use rad_foundation::{RadError, RadResult};
use serde::{Deserialize, Serialize};

/// 坐标方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    X,
    Y,
    Z,
}

impl Dir {
    /// 三个方向的遍历顺序
    pub const ALL: [Dir; 3] = [Dir::X, Dir::Y, Dir::Z];

    /// 方向下标 0/1/2
    #[inline]
    pub fn axis(self) -> usize {
        match self {
            Dir::X => 0,
            Dir::Y => 1,
            Dir::Z => 2,
        }
    }
}

/// 带鬼区的均匀网格
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// 内部（物理）格数
    interior: [usize; 3],
    /// 各方向鬼区宽度，退化维度为 0
    ghost: [usize; 3],
    /// 格距 [cm]
    dx: [f64; 3],
}

impl Grid {
    /// 创建网格
    ///
    /// `nghost` 只施加到格数大于 1 的方向。格数与格距必须为正。
    pub fn new(interior: [usize; 3], dx: [f64; 3], nghost: usize) -> RadResult<Self> {
        for axis in 0..3 {
            if interior[axis] == 0 {
                return Err(RadError::invalid_config(
                    "grid.interior",
                    interior[axis],
                    format!("方向 {} 的格数必须为正", axis),
                ));
            }
            if !(dx[axis] > 0.0 && dx[axis].is_finite()) {
                return Err(RadError::invalid_config(
                    "grid.dx",
                    dx[axis],
                    format!("方向 {} 的格距必须为正有限值", axis),
                ));
            }
        }
        let mut ghost = [0usize; 3];
        for axis in 0..3 {
            if interior[axis] > 1 {
                ghost[axis] = nghost;
            }
        }
        Ok(Self { interior, ghost, dx })
    }

    /// 内部格数
    #[inline]
    pub fn interior(&self) -> [usize; 3] {
        self.interior
    }

    /// 各方向鬼区宽度
    #[inline]
    pub fn ghost(&self) -> [usize; 3] {
        self.ghost
    }

    /// 格距
    #[inline]
    pub fn dx(&self, dir: Dir) -> f64 {
        self.dx[dir.axis()]
    }

    /// 含鬼区的总格数（逐方向）
    #[inline]
    pub fn total(&self) -> [usize; 3] {
        [
            self.interior[0] + 2 * self.ghost[0],
            self.interior[1] + 2 * self.ghost[1],
            self.interior[2] + 2 * self.ghost[2],
        ]
    }

    /// 含鬼区的总单元数（场数组长度）
    #[inline]
    pub fn n_cells(&self) -> usize {
        let t = self.total();
        t[0] * t[1] * t[2]
    }

    /// 内部单元数
    #[inline]
    pub fn n_interior(&self) -> usize {
        self.interior[0] * self.interior[1] * self.interior[2]
    }

    /// 该方向是否参与演化（格数大于 1）
    #[inline]
    pub fn is_active(&self, dir: Dir) -> bool {
        self.interior[dir.axis()] > 1
    }

    /// 活跃方向上的最小格距（子循环步数估计使用）
    pub fn min_active_dx(&self) -> f64 {
        let mut out = f64::INFINITY;
        for dir in Dir::ALL {
            if self.is_active(dir) {
                out = out.min(self.dx(dir));
            }
        }
        if out.is_finite() {
            out
        } else {
            // 全退化（1×1×1）时退化为 x 方向格距
            self.dx[0]
        }
    }

    /// 由含鬼区坐标求线性索引
    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        let t = self.total();
        debug_assert!(i < t[0] && j < t[1] && k < t[2]);
        (k * t[1] + j) * t[0] + i
    }

    /// 相邻单元的线性步长
    #[inline]
    pub fn stride(&self, dir: Dir) -> usize {
        let t = self.total();
        match dir {
            Dir::X => 1,
            Dir::Y => t[0],
            Dir::Z => t[0] * t[1],
        }
    }

    /// 遍历所有内部单元的线性索引
    pub fn interior_indices(&self) -> Vec<usize> {
        let [gx, gy, gz] = self.ghost;
        let [nx, ny, nz] = self.interior;
        let mut out = Vec::with_capacity(self.n_interior());
        for k in gz..gz + nz {
            for j in gy..gy + ny {
                for i in gx..gx + nx {
                    out.push(self.index(i, j, k));
                }
            }
        }
        out
    }

    /// 由线性索引反求含鬼区坐标
    #[inline]
    pub fn coords(&self, idx: usize) -> [usize; 3] {
        let t = self.total();
        let i = idx % t[0];
        let j = (idx / t[0]) % t[1];
        let k = idx / (t[0] * t[1]);
        [i, j, k]
    }
}
