use souba_core::market::entity::CandleEvent;
use souba_core::notify::port::{CandleEventStream, CandlePublisher};
use tokio::sync::broadcast;
use tracing::trace;

/// # Summary
/// 基于 tokio broadcast 通道的收盘事件扇出器。
///
/// # Invariants
/// - `publish` 即发即忘：无订阅者或接收端滞后造成的丢失一律忽略，
///   绝不阻塞或拖垮提交路径。
/// - 至多一次投递；迟到订阅者只能看到订阅之后的事件。
pub struct BroadcastPublisher {
    tx: broadcast::Sender<CandleEvent>,
}

impl BroadcastPublisher {
    /// # Summary
    /// 以指定通道容量创建扇出器。
    ///
    /// # Arguments
    /// * `capacity`: 广播通道容量，滞后超过容量的订阅者丢失旧事件。
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl CandlePublisher for BroadcastPublisher {
    /// # Summary
    /// 广播一条收盘事件。
    ///
    /// # Logic
    /// 投入广播通道；`send` 仅在零订阅者时返回 Err，属正常情况。
    fn publish(&self, event: CandleEvent) {
        if self.tx.send(event).is_err() {
            trace!("candle event dropped: no active subscribers");
        }
    }

    /// # Summary
    /// 订阅事件流。
    ///
    /// # Logic
    /// 挂载新的广播接收端并包装为异步流；接收端滞后 (Lagged) 时
    /// 跳过丢失的事件继续消费——补齐历史是查询服务的职责。
    fn subscribe(&self) -> CandleEventStream {
        let mut rx = self.tx.subscribe();
        let stream = async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        trace!("subscriber lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        Box::pin(stream)
    }
}
