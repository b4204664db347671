// crates/rad_foundation/src/lib.rs

//! 辐射流体求解器基础层
//!
//! 提供与具体物理算法无关的公共设施：
//! - 统一错误类型 (error)
//! - CGS 物理常数 (constants)
//!
//! 物理计算相关的类型在 `rad_physics` 中定义。

pub mod constants;
pub mod error;

pub use error::{RadError, RadResult};
