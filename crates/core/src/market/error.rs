use crate::store::error::StoreError;
use thiserror::Error;

/// # Summary
/// 市场域错误枚举，处理参数校验与存储透传问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 重复提交不是错误：它以 `inserted=false` 的正常结果返回。
#[derive(Error, Debug)]
pub enum MarketError {
    // 参数或 OHLC 不变量校验失败，同步拒绝，绝不触达存储
    #[error("Validation error: {0}")]
    Validation(String),
    // 存储层瞬态失败：查询侧视为请求失败，提交侧由检测器下一拍重试
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    // 未知或未分类的错误
    #[error("Unknown error: {0}")]
    Unknown(String),
}
