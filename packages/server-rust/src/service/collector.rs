//! Reassembly of multi-part replies.
//!
//! A service may answer one request with several messages. Each carries its
//! position in `index` and the last one is marked complete. Parts can arrive
//! out of order when a service answers from several tasks, so they are
//! buffered by index until every index up to the final one is present.

use std::collections::BTreeMap;

use cimom_core::{Message, QueueId};
use tokio::sync::mpsc;
use tracing::warn;

use super::operation::DispatchError;

#[derive(Debug)]
pub struct ResponseCollector {
    own_id: QueueId,
    parts: BTreeMap<u32, Message>,
    final_index: Option<u32>,
}

impl ResponseCollector {
    /// Collector for replies to requests that `own_id` forwarded.
    #[must_use]
    pub fn new(own_id: QueueId) -> Self {
        Self {
            own_id,
            parts: BTreeMap::new(),
            final_index: None,
        }
    }

    /// Accepts one reply part. Returns `true` once every part up to the final
    /// one has arrived.
    ///
    /// The forwarding queue's own id is popped from the part's return path,
    /// so the part is addressed to whoever sent the request to it.
    ///
    /// # Errors
    ///
    /// Fails on a repeated index, on a part past the final index, or on a
    /// second final part.
    pub fn accept(&mut self, mut part: Message) -> Result<bool, DispatchError> {
        if part.queue_ids.top().ok() == Some(self.own_id) {
            part.queue_ids.pop()?;
            part.dest = part.queue_ids.top().unwrap_or(QueueId::NONE);
        } else {
            warn!(
                own_id = %self.own_id,
                message_type = %part.message_type(),
                "reply does not carry the forwarding queue on its return path"
            );
        }

        let index = part.index();
        if self.parts.contains_key(&index) {
            return Err(DispatchError::DuplicatePart(index));
        }
        if let Some(final_index) = self.final_index {
            if index > final_index || part.is_complete() {
                return Err(DispatchError::PartAfterFinal { index, final_index });
            }
        } else if part.is_complete() {
            if let Some((&last, _)) = self.parts.last_key_value() {
                if last > index {
                    return Err(DispatchError::PartAfterFinal {
                        index: last,
                        final_index: index,
                    });
                }
            }
            self.final_index = Some(index);
        }

        self.parts.insert(index, part);
        Ok(self.is_done())
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.final_index
            .is_some_and(|last| self.parts.len() == last as usize + 1)
    }

    #[must_use]
    pub fn received(&self) -> usize {
        self.parts.len()
    }

    /// Buffered parts in index order.
    #[must_use]
    pub fn into_parts(self) -> Vec<Message> {
        self.parts.into_values().collect()
    }

    /// Reads parts from `rx` until the reply is complete.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Incomplete` if the stream closes first, or any
    /// error from `accept`.
    pub async fn collect(mut self, mut rx: mpsc::Receiver<Message>) -> Result<Vec<Message>, DispatchError> {
        while let Some(part) = rx.recv().await {
            if self.accept(part)? {
                return Ok(self.into_parts());
            }
        }
        Err(DispatchError::Incomplete {
            received: self.received(),
        })
    }
}

#[cfg(test)]
mod tests {
    use cimom_core::{MessageMask, MessageType, QueueIdStack};
    use proptest::prelude::*;

    use super::*;

    const OWN: QueueId = QueueId(9);
    const CALLER: QueueId = QueueId(3);

    fn part(index: u32, complete: bool) -> Message {
        let mut msg = Message::new(
            MessageType::EnumerateInstancesResponse,
            OWN,
            MessageMask::HA_REPLY,
        );
        msg.queue_ids = QueueIdStack::with_two(CALLER, OWN);
        msg.set_index(index);
        msg.set_complete(complete);
        msg
    }

    #[test]
    fn single_part_completes() {
        let mut c = ResponseCollector::new(OWN);
        assert!(c.accept(part(0, true)).unwrap());

        let parts = c.into_parts();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].dest, CALLER);
        assert_eq!(parts[0].queue_ids.as_slice(), &[CALLER]);
    }

    #[test]
    fn out_of_order_parts_are_reordered() {
        let mut c = ResponseCollector::new(OWN);
        assert!(!c.accept(part(2, true)).unwrap());
        assert!(!c.accept(part(0, false)).unwrap());
        assert!(c.accept(part(1, false)).unwrap());

        let indexes: Vec<u32> = c.into_parts().iter().map(Message::index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let mut c = ResponseCollector::new(OWN);
        c.accept(part(0, false)).unwrap();
        assert!(matches!(
            c.accept(part(0, false)),
            Err(DispatchError::DuplicatePart(0))
        ));
    }

    #[test]
    fn part_past_final_is_rejected() {
        let mut c = ResponseCollector::new(OWN);
        c.accept(part(1, true)).unwrap();
        assert!(matches!(
            c.accept(part(2, false)),
            Err(DispatchError::PartAfterFinal {
                index: 2,
                final_index: 1
            })
        ));
    }

    #[test]
    fn final_before_buffered_higher_index_is_rejected() {
        let mut c = ResponseCollector::new(OWN);
        c.accept(part(3, false)).unwrap();
        assert!(matches!(
            c.accept(part(1, true)),
            Err(DispatchError::PartAfterFinal {
                index: 3,
                final_index: 1
            })
        ));
    }

    #[tokio::test]
    async fn closed_stream_is_incomplete() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(part(0, false)).await.unwrap();
        drop(tx);

        let err = ResponseCollector::new(OWN).collect(rx).await.unwrap_err();
        assert!(matches!(err, DispatchError::Incomplete { received: 1 }));
    }

    #[tokio::test]
    async fn collect_stops_at_final_part() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(part(0, false)).await.unwrap();
        tx.send(part(1, true)).await.unwrap();

        // The sender stays open; collection must not wait for it to close.
        let parts = ResponseCollector::new(OWN).collect(rx).await.unwrap();
        assert_eq!(parts.len(), 2);
        drop(tx);
    }

    proptest! {
        #[test]
        fn any_arrival_order_reassembles(
            order in (1u32..12).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
        ) {
            let last = order.len() as u32 - 1;
            let mut c = ResponseCollector::new(OWN);
            for (seen, &index) in order.iter().enumerate() {
                let done = c.accept(part(index, index == last)).unwrap();
                prop_assert_eq!(done, seen == order.len() - 1);
            }
            let indexes: Vec<u32> = c.into_parts().iter().map(Message::index).collect();
            prop_assert_eq!(indexes, (0..=last).collect::<Vec<_>>());
        }
    }
}
