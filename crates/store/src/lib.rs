//! # Souba Store
//!
//! `CandleStore` 端口的 SQLite 实现。幂等性由表级唯一约束保证——
//! 这是全系统唯一的同步原语。

pub mod candle;
pub mod config;
