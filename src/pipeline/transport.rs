//! Bounded frame transport between the producer and HTTP consumers.

use std::time::Duration;

use crate::capture::FrameHandle;
use crate::error::CameraError;

/// One transport slot. `None` is the upstream capture-failure signal;
/// consumers treat it like a timeout (there is nothing to release).
pub type FrameSlot = Option<FrameHandle>;

/// Fixed-capacity FIFO connecting the single producer to all consumers.
///
/// Delivery is unicast: each successful pop removes the slot for
/// exactly one caller. A capture and a stream consumer running at the
/// same time compete for the same sequence of frames and may starve
/// each other depending on scheduling; that contention is the intended
/// design, not broadcast.
#[derive(Clone)]
pub struct FrameTransport {
    tx: flume::Sender<FrameSlot>,
    rx: flume::Receiver<FrameSlot>,
}

impl FrameTransport {
    pub fn new(depth: usize) -> Self {
        let (tx, rx) = flume::bounded(depth);
        Self { tx, rx }
    }

    /// Enqueue a slot, waiting for space. A full transport stalls the
    /// producer rather than dropping frames.
    pub async fn push(&self, slot: FrameSlot) -> Result<(), CameraError> {
        self.tx
            .send_async(slot)
            .await
            .map_err(|_| CameraError::TransportClosed)
    }

    /// Dequeue the next slot, waiting up to `timeout`.
    pub async fn pop(&self, timeout: Duration) -> Result<FrameSlot, CameraError> {
        match tokio::time::timeout(timeout, self.rx.recv_async()).await {
            Ok(Ok(slot)) => Ok(slot),
            Ok(Err(_)) => Err(CameraError::TransportClosed),
            Err(_) => Err(CameraError::FrameTimeout),
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.rx.capacity().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use super::*;
    use crate::capture::{FramePool, SyntheticSensor};

    fn test_pool(buffers: usize) -> FramePool {
        FramePool::new(
            Box::new(SyntheticSensor::with_payload_len(320, 240, 64)),
            buffers,
            128,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn preserves_fifo_order() {
        let mut pool = test_pool(4);
        let transport = FrameTransport::new(2);

        for _ in 0..2 {
            transport
                .push(Some(pool.capture_frame().unwrap()))
                .await
                .unwrap();
        }

        let first = transport.pop(Duration::from_millis(10)).await.unwrap();
        let second = transport.pop(Duration::from_millis(10)).await.unwrap();
        assert_eq!(first.unwrap().meta().sequence, 1);
        assert_eq!(second.unwrap().meta().sequence, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn push_blocks_at_capacity() {
        let mut pool = test_pool(4);
        let transport = FrameTransport::new(2);

        transport
            .push(Some(pool.capture_frame().unwrap()))
            .await
            .unwrap();
        transport
            .push(Some(pool.capture_frame().unwrap()))
            .await
            .unwrap();
        assert_eq!(transport.len(), 2);

        // Third push cannot complete while the queue is full.
        let blocked = transport.push(Some(pool.capture_frame().unwrap()));
        assert!(tokio::time::timeout(Duration::from_millis(500), blocked)
            .await
            .is_err());
        assert_eq!(transport.len(), transport.capacity());
    }

    #[tokio::test(start_paused = true)]
    async fn pop_times_out_on_empty_queue() {
        let transport = FrameTransport::new(2);
        let err = transport
            .pop(Duration::from_millis(1000))
            .await
            .unwrap_err();
        assert!(matches!(err, CameraError::FrameTimeout));
    }

    #[tokio::test(start_paused = true)]
    async fn null_slot_passes_through() {
        let transport = FrameTransport::new(2);
        transport.push(None).await.unwrap();
        let slot = transport.pop(Duration::from_millis(10)).await.unwrap();
        assert!(slot.is_none());
    }

    // Two concurrent consumers together see every frame exactly once,
    // partitioned between them in pop order.
    #[tokio::test]
    async fn concurrent_consumers_partition_frames() {
        let mut pool = test_pool(8);
        let transport = FrameTransport::new(2);

        let consumer = |t: FrameTransport| async move {
            let mut seen = Vec::new();
            while let Ok(slot) = t.pop(Duration::from_millis(200)).await {
                if let Some(frame) = slot {
                    seen.push(frame.meta().sequence);
                }
            }
            seen
        };
        let a = tokio::spawn(consumer(transport.clone()));
        let b = tokio::spawn(consumer(transport.clone()));

        for _ in 0..6 {
            transport
                .push(Some(pool.capture_frame().unwrap()))
                .await
                .unwrap();
        }

        let seen_a = a.await.unwrap();
        let seen_b = b.await.unwrap();

        let mut union = BTreeSet::new();
        for seq in seen_a.iter().chain(seen_b.iter()) {
            // no frame delivered to both consumers
            assert!(union.insert(*seq));
        }
        assert_eq!(union, (1..=6).collect::<BTreeSet<u64>>());
        // every buffer went back to the pool
        assert_eq!(pool.available(), 8);
    }
}
