// crates/rad_physics/src/groups.rs

//! 光子群向量与群边界
//!
//! 多群辐射输运把频率空间离散为 `n_groups` 个能量群，大量逐群量
//! （能量密度、不透明度、光学厚度等）需要逐元素算术与归约操作。
//! `GroupVec` 提供固定容量、栈上分配的逐群向量，避免热路径上的堆分配。
//!
//! # 布局设计
//!
//! ```text
//! GroupVec: [x_0, x_1, ..., x_{n-1}, 0, 0, ...]  (容量 MAX_GROUPS)
//! GroupBoundaries: [e_0, e_1, ..., e_n]          (n+1 个边界)
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub};

/// 支持的最大光子群数
pub const MAX_GROUPS: usize = 8;

// ============================================================
// 逐群向量
// ============================================================

/// 固定容量的逐群数值向量
///
/// 所有二元运算要求两侧长度一致（debug 断言保护）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupVec {
    data: [f64; MAX_GROUPS],
    len: usize,
}

impl GroupVec {
    /// 创建全零向量
    #[inline]
    pub fn zeros(len: usize) -> Self {
        debug_assert!(len >= 1 && len <= MAX_GROUPS);
        Self {
            data: [0.0; MAX_GROUPS],
            len,
        }
    }

    /// 创建所有分量等于 `value` 的向量
    #[inline]
    pub fn fill(value: f64, len: usize) -> Self {
        debug_assert!(len >= 1 && len <= MAX_GROUPS);
        let mut data = [0.0; MAX_GROUPS];
        data[..len].fill(value);
        Self { data, len }
    }

    /// 从切片创建
    #[inline]
    pub fn from_slice(values: &[f64]) -> Self {
        debug_assert!(!values.is_empty() && values.len() <= MAX_GROUPS);
        let mut data = [0.0; MAX_GROUPS];
        data[..values.len()].copy_from_slice(values);
        Self {
            data,
            len: values.len(),
        }
    }

    /// 群数
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 是否为空（恒为 false，保留以满足 clippy 约定）
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 有效分量切片
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data[..self.len]
    }

    /// 迭代有效分量
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.data[..self.len].iter()
    }

    /// 所有分量之和
    #[inline]
    pub fn sum(&self) -> f64 {
        self.as_slice().iter().sum()
    }

    /// 最小分量
    #[inline]
    pub fn min(&self) -> f64 {
        self.as_slice().iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// 最大分量
    #[inline]
    pub fn max(&self) -> f64 {
        self.as_slice()
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// 逐元素绝对值
    #[inline]
    pub fn abs(&self) -> Self {
        self.map(f64::abs)
    }

    /// 是否含有 NaN
    #[inline]
    pub fn has_nan(&self) -> bool {
        self.as_slice().iter().any(|x| x.is_nan())
    }

    /// 所有分量是否均为有限值
    #[inline]
    pub fn all_finite(&self) -> bool {
        self.as_slice().iter().all(|x| x.is_finite())
    }

    /// 逐元素映射
    #[inline]
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        let mut out = *self;
        for x in &mut out.data[..out.len] {
            *x = f(*x);
        }
        out
    }

    /// 逐元素二元组合
    #[inline]
    pub fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        debug_assert_eq!(self.len, other.len);
        let mut out = *self;
        for g in 0..out.len {
            out.data[g] = f(self.data[g], other.data[g]);
        }
        out
    }
}

impl Index<usize> for GroupVec {
    type Output = f64;
    #[inline]
    fn index(&self, g: usize) -> &f64 {
        debug_assert!(g < self.len);
        &self.data[g]
    }
}

impl IndexMut<usize> for GroupVec {
    #[inline]
    fn index_mut(&mut self, g: usize) -> &mut f64 {
        debug_assert!(g < self.len);
        &mut self.data[g]
    }
}

impl Add for GroupVec {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.zip_with(&rhs, |a, b| a + b)
    }
}

impl Sub for GroupVec {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.zip_with(&rhs, |a, b| a - b)
    }
}

impl Mul for GroupVec {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        self.zip_with(&rhs, |a, b| a * b)
    }
}

impl Div for GroupVec {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        self.zip_with(&rhs, |a, b| a / b)
    }
}

impl Mul<f64> for GroupVec {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        self.map(|a| a * rhs)
    }
}

impl Mul<GroupVec> for f64 {
    type Output = GroupVec;
    #[inline]
    fn mul(self, rhs: GroupVec) -> GroupVec {
        rhs.map(|a| self * a)
    }
}

impl Div<f64> for GroupVec {
    type Output = Self;
    #[inline]
    fn div(self, rhs: f64) -> Self {
        self.map(|a| a / rhs)
    }
}

impl AddAssign for GroupVec {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Neg for GroupVec {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        self.map(|a| -a)
    }
}

// ============================================================
// 群边界
// ============================================================

/// 光子能量群边界
///
/// `n_groups` 个群由 `n_groups + 1` 个单调递增的能量边界界定。
/// 单群情况退化为 `[0, +inf)`，群份额恒为 1。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupBoundaries {
    edges: [f64; MAX_GROUPS + 1],
    n_groups: usize,
}

impl GroupBoundaries {
    /// 单群（灰体）边界 `[0, +inf)`
    pub fn gray() -> Self {
        let mut edges = [0.0; MAX_GROUPS + 1];
        edges[1] = f64::MAX;
        Self { edges, n_groups: 1 }
    }

    /// 从边界切片创建，要求单调递增
    pub fn from_edges(edges_in: &[f64]) -> Option<Self> {
        let n_groups = edges_in.len().checked_sub(1)?;
        if n_groups == 0 || n_groups > MAX_GROUPS {
            return None;
        }
        if edges_in.windows(2).any(|w| w[0] >= w[1]) {
            return None;
        }
        let mut edges = [0.0; MAX_GROUPS + 1];
        edges[..edges_in.len()].copy_from_slice(edges_in);
        Some(Self { edges, n_groups })
    }

    /// 群数
    #[inline]
    pub fn n_groups(&self) -> usize {
        self.n_groups
    }

    /// 第 `g` 群的下边界
    #[inline]
    pub fn lower(&self, g: usize) -> f64 {
        self.edges[g]
    }

    /// 第 `g` 群的上边界
    #[inline]
    pub fn upper(&self, g: usize) -> f64 {
        self.edges[g + 1]
    }

    /// 边界切片（长度 n_groups + 1）
    #[inline]
    pub fn edges(&self) -> &[f64] {
        &self.edges[..self.n_groups + 1]
    }

    /// 各群上下边界之比（幂律不透明度模型使用）
    pub fn ratios(&self) -> GroupVec {
        let mut out = GroupVec::zeros(self.n_groups);
        for g in 0..self.n_groups {
            out[g] = self.upper(g) / self.lower(g);
        }
        out
    }
}

// ============================================================
// 测试
// ============================================================
