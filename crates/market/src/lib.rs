//! # Souba Market
//!
//! 市场域实现：每序列一个边界检测/自动提交循环、收盘事件广播器、
//! 以及 API 层依赖的查询服务。所有最终 K 线都经由这里唯一的
//! 幂等提交路径入库。

pub mod monitor;
pub mod publisher;
pub mod service;
