use std::fmt;

use tokio::sync::broadcast;

use crate::orchestration::events::{JobEvent, JobEventPublisher};

/// Lightweight in-process event bus that fans job notifications out to
/// observers inside the runtime. Events published without subscribers are
/// dropped.
pub struct InProcJobEventBus {
    sender: broadcast::Sender<JobEvent>,
    channel_capacity: usize,
}

impl fmt::Debug for InProcJobEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcJobEventBus")
            .field("channel_capacity", &self.channel_capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl InProcJobEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            channel_capacity: capacity,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

impl JobEventPublisher for InProcJobEventBus {
    fn publish(&self, event: JobEvent) {
        let _ = self.sender.send(event);
    }
}
