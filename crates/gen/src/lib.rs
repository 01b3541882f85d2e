//! # Souba Gen
//!
//! 确定性 K 线生成引擎：字符串种子哈希、均匀位流、高斯采样、
//! 最终 K 线生成与部分 K 线插值。全部为纯同步内存计算，
//! 同一输入在任何进程、任何机器上产出逐位一致的结果。
//!
//! 这是系统最重要的契约：历史生成方与任何独立校验方都必须
//! 从同一种子推出完全相同的数值。这里只有唯一一条确定性代码
//! 路径，绝不回退到环境随机源。

pub mod generator;
pub mod interpolate;
pub mod rng;
