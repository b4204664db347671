// crates/rad_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `RadError` 枚举和 `RadResult` 类型别名，用于整个项目的错误处理。
//!
//! # 设计原则
//!
//! 1. **分类明确**: 可恢复的物理无效状态在现场修复，不产生错误；
//!    只有不可恢复的失败（迭代不收敛、非有限值、配置非法）才构造错误
//! 2. **易用性**: 提供便捷的构造方法
//! 3. **不可重试**: 求解器的不收敛表示耦合系统在当前状态下不适定，
//!    上层不应捕获后重试

use thiserror::Error;

/// 统一结果类型
pub type RadResult<T> = Result<T, RadError>;

/// 辐射求解器错误类型
#[derive(Error, Debug)]
pub enum RadError {
    /// 配置值无效
    #[error("配置值无效: {key}={value}, 原因: {reason}")]
    InvalidConfig {
        /// 配置键名
        key: &'static str,
        /// 配置值
        value: String,
        /// 无效原因说明
        reason: String,
    },

    /// 数据超出范围
    #[error("数据超出范围: {field}={value}, 期望范围=[{min}, {max}]")]
    OutOfRange {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 出现非有限值（NaN/Inf），视为致命缺陷
    #[error("非有限值: {context} (单元 {cell})")]
    NonFinite {
        /// 出错位置描述
        context: &'static str,
        /// 出错单元的线性索引
        cell: usize,
    },

    /// 迭代求解不收敛，致命错误
    #[error("迭代不收敛: {solver} 在 {iterations} 次迭代后残差仍为 {residual:.3e} (单元 {cell})")]
    NonConvergent {
        /// 求解器名称
        solver: &'static str,
        /// 已执行的迭代次数
        iterations: usize,
        /// 终止时的残差
        residual: f64,
        /// 出错单元的线性索引
        cell: usize,
    },

    /// 子循环步数超出允许范围
    #[error("辐射子循环步数非法: {substeps} (允许范围 1..{limit})")]
    SubstepOutOfBounds {
        /// 计算得到的子步数
        substeps: usize,
        /// 上限（不含）
        limit: usize,
    },

    /// 内部错误
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl RadError {
    /// 配置值无效
    pub fn invalid_config(
        key: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// 数据超出范围
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 非有限值
    pub fn non_finite(context: &'static str, cell: usize) -> Self {
        Self::NonFinite { context, cell }
    }

    /// 迭代不收敛
    pub fn non_convergent(
        solver: &'static str,
        iterations: usize,
        residual: f64,
        cell: usize,
    ) -> Self {
        Self::NonConvergent {
            solver,
            iterations,
            residual,
            cell,
        }
    }

    /// 内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl RadError {
    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> RadResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查值是否在范围内
    #[inline]
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> RadResult<()> {
        if value < min || value > max {
            Err(Self::out_of_range(field, value, min, max))
        } else {
            Ok(())
        }
    }

    /// 检查值是否为有限值
    #[inline]
    pub fn check_finite(context: &'static str, value: f64, cell: usize) -> RadResult<()> {
        if !value.is_finite() {
            Err(Self::non_finite(context, cell))
        } else {
            Ok(())
        }
    }
}

// ========================================================================
// 测试
// ========================================================================
