// crates/rad_physics/src/lib.rs

//! 多群两矩辐射输运求解器
//!
//! 在均匀笛卡尔网格上演化逐群辐射能量密度与通量，用 M1 闭合
//! 补齐压力张量，与气体通过隐式交换源项耦合。时间推进采用
//! IMEX PD-ARS 格式：双曲部分显式 SSP-RK2，刚性源项逐单元隐式。
//!
//! # 模块组织
//!
//! - [`groups`]: 逐群向量与光子群边界
//! - [`closure`]: M1 闭合（Eddington 因子与张量）
//! - [`planck`]: 普朗克积分、黑体谱份额与热发射
//! - [`eos`]: 气体状态方程接口与理想气体实现
//! - [`opacity`]: 不透明度提供者（用户模型 / 分段幂律）
//! - [`grid`]: 带鬼区的结构化网格几何
//! - [`state`]: SoA 辐射流体状态与可采性修复
//! - [`boundary`]: 鬼区填充（周期 / 流出）
//! - [`flux`]: HLL 界面通量与 PLM 重构
//! - [`update`]: 双曲预测 / 修正更新
//! - [`exchange`]: 物质-辐射交换的牛顿求解
//! - [`integrator`]: 子循环 IMEX 驱动
//! - [`config`]: 运行期配置与校验

pub mod boundary;
pub mod closure;
pub mod config;
pub mod eos;
pub mod exchange;
pub mod flux;
pub mod grid;
pub mod groups;
pub mod integrator;
pub mod opacity;
pub mod planck;
pub mod state;
pub mod update;

pub use boundary::{Boundaries, BoundaryKind};
pub use config::RadiationConfig;
pub use eos::{EquationOfState, IdealGasEos};
pub use exchange::{ExchangeStage, ExchangeStats};
pub use grid::{Dir, Grid};
pub use groups::{GroupBoundaries, GroupVec, MAX_GROUPS};
pub use integrator::ImexIntegrator;
pub use opacity::{GroupOpacity, OpacityModel, PowerLawOpacity};
pub use state::RadHydroState;

pub use rad_foundation::{RadError, RadResult};
