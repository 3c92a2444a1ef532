//! Fire-and-forget supplier of inbound global-chat lines.
//!
//! The real network backend lives outside this crate; it hands lines over a
//! channel and this task moves them into the global-chat queue as producer
//! pushes. The join handle is owned so tests can run a synchronous stub to
//! completion instead of detaching.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;

use crate::queues::{ChatQueues, QueueKind};

/// Handle for the background line-supplier thread. Dropping it detaches the
/// thread; the channel disconnecting ends it.
#[derive(Debug)]
pub struct BackendTask {
    handle: Option<JoinHandle<()>>,
}

impl BackendTask {
    pub fn spawn(queues: Arc<ChatQueues>, inbound: Receiver<String>) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("dewterm-backend".into())
            .spawn(move || {
                for line in inbound.iter() {
                    queues.push_from_producer(QueueKind::GlobalChat, line);
                }
            })
            .context("spawning backend supplier thread")?;
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the supplier to finish. Only meaningful once the sending side
    /// has been dropped.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverlayConfig;
    use crossbeam_channel::unbounded;

    #[test]
    fn supplier_moves_lines_into_global_chat() {
        let queues = ChatQueues::new(&OverlayConfig::default());
        let (tx, rx) = unbounded();
        let task = BackendTask::spawn(Arc::clone(&queues), rx).expect("spawn backend");

        tx.send("<user> hello".to_string()).expect("send");
        tx.send("<user> second".to_string()).expect("send");
        drop(tx);
        task.join();

        let snapshot = queues.snapshot(QueueKind::GlobalChat);
        let texts: Vec<&str> = snapshot.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["<user> hello", "<user> second"]);
    }

    #[test]
    fn supplier_ends_when_channel_disconnects() {
        let queues = ChatQueues::new(&OverlayConfig::default());
        let (tx, rx) = unbounded();
        let task = BackendTask::spawn(queues, rx).expect("spawn backend");
        drop(tx);
        // join returns promptly because the iterator terminates on disconnect.
        task.join();
    }
}
