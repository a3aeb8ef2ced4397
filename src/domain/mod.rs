// ==========================================
// 疫苗分配优化系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、值对象与基础类型
// 红线: 不含 I/O,不含求解逻辑
// ==========================================

pub mod allocation;
pub mod capacity;
pub mod cost;
pub mod epidemic;
pub mod error;
pub mod policy;
pub mod timing;
pub mod types;

// 重导出核心类型
pub use allocation::{Allocation, CostBreakdown, DoseCounts, Solution};
pub use capacity::{CapacityConstraint, ProductionPool};
pub use cost::{CostParameters, ObjectiveWeights, WEIGHT_SUM_TOLERANCE};
pub use error::{InvalidParameterError, SnapshotError};
pub use epidemic::{CompartmentSizes, EpidemicRow, EpidemicSnapshot, GroupSeries};
pub use policy::AllocationPolicy;
pub use timing::{FixedTiming, GroupTiming, TimingCandidate, TimingGridConfig};
pub use types::{Compartment, Dose, GroupId, SolveStatus, NUM_GROUPS};
