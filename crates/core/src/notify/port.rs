use crate::market::entity::CandleEvent;
use futures::Stream;
use std::pin::Pin;

/// # Summary
/// 收盘事件流别名，使用动态分发的异步流。
pub type CandleEventStream = Pin<Box<dyn Stream<Item = CandleEvent> + Send>>;

/// # Summary
/// 收盘事件扇出接口定义。
///
/// # Invariants
/// - `publish` 必须是同步、即发即忘的：投递绝不阻塞提交路径，
///   也绝不向调用方返回失败。
/// - 尽力而为、至多一次；扇出永远不是事实来源，迟到订阅者
///   必须通过查询服务补齐错过的事件。
pub trait CandlePublisher: Send + Sync {
    /// # Summary
    /// 向所有在线订阅者广播一条收盘事件。
    ///
    /// # Logic
    /// 投入内部广播通道；无人订阅或接收端滞后导致的丢失均被忽略。
    ///
    /// # Arguments
    /// * `event`: 收盘事件。
    fn publish(&self, event: CandleEvent);

    /// # Summary
    /// 订阅事件流。
    ///
    /// # Logic
    /// 挂载到广播通道，持续产出订阅之后发生的事件。
    ///
    /// # Returns
    /// 异步事件流。
    fn subscribe(&self) -> CandleEventStream;
}
