//! Event dispatch boundary.
//!
//! The interceptor hands every [`InterceptedNotification`] to an
//! [`EventDispatcher`]. How the event reaches the automation layer is up to
//! the implementation; dispatch failures are logged by the caller and never
//! reach the notification callback.

use crate::types::InterceptedNotification;
use std::io::Write;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Event channel is full")]
    ChannelFull,

    #[error("Event channel is closed")]
    ChannelClosed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives intercepted notifications
pub trait EventDispatcher {
    fn dispatch(&mut self, event: &InterceptedNotification) -> Result<(), DispatchError>;
}

/// Forwards events into a tokio channel
pub struct ChannelDispatcher {
    tx: mpsc::Sender<InterceptedNotification>,
    /// Wait for capacity instead of failing with `ChannelFull`.
    /// Only valid outside an async context.
    block_when_full: bool,
}

impl ChannelDispatcher {
    /// Dispatcher that never blocks the caller
    pub fn new(tx: mpsc::Sender<InterceptedNotification>) -> Self {
        Self {
            tx,
            block_when_full: false,
        }
    }

    /// Dispatcher for a dedicated blocking thread
    pub fn blocking(tx: mpsc::Sender<InterceptedNotification>) -> Self {
        Self {
            tx,
            block_when_full: true,
        }
    }
}

impl EventDispatcher for ChannelDispatcher {
    fn dispatch(&mut self, event: &InterceptedNotification) -> Result<(), DispatchError> {
        if self.block_when_full {
            return self
                .tx
                .blocking_send(event.clone())
                .map_err(|_| DispatchError::ChannelClosed);
        }

        self.tx.try_send(event.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::ChannelClosed,
        })
    }
}

/// Writes one JSON object per line
pub struct JsonLinesDispatcher<W> {
    writer: W,
}

impl<W: Write> JsonLinesDispatcher<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventDispatcher for JsonLinesDispatcher<W> {
    fn dispatch(&mut self, event: &InterceptedNotification) -> Result<(), DispatchError> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl EventDispatcher for Vec<InterceptedNotification> {
    fn dispatch(&mut self, event: &InterceptedNotification) -> Result<(), DispatchError> {
        self.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(key: &str) -> InterceptedNotification {
        InterceptedNotification {
            title: "Doorbell".to_string(),
            text: "Someone is at the door".to_string(),
            image_path: "/tmp/a.jpg".to_string(),
            app_package: "com.example.doorbell".to_string(),
            app_name: "Doorbell".to_string(),
            notification_key: key.to_string(),
        }
    }

    #[test]
    fn test_json_lines_output() {
        let mut dispatcher = JsonLinesDispatcher::new(Vec::new());
        dispatcher.dispatch(&event("a")).unwrap();
        dispatcher.dispatch(&event("b")).unwrap();

        let output = String::from_utf8(dispatcher.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: InterceptedNotification = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, event("b"));
    }

    #[test]
    fn test_channel_dispatcher_reports_full_and_closed() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut dispatcher = ChannelDispatcher::new(tx);

        dispatcher.dispatch(&event("a")).unwrap();
        assert!(matches!(
            dispatcher.dispatch(&event("b")),
            Err(DispatchError::ChannelFull)
        ));

        assert_eq!(rx.try_recv().unwrap(), event("a"));
        drop(rx);
        assert!(matches!(
            dispatcher.dispatch(&event("c")),
            Err(DispatchError::ChannelClosed)
        ));
    }

    #[test]
    fn test_blocking_dispatcher_waits_for_capacity() {
        let (tx, mut rx) = mpsc::channel(1);
        let producer = std::thread::spawn(move || {
            let mut dispatcher = ChannelDispatcher::blocking(tx);
            for key in ["a", "b", "c"] {
                dispatcher.dispatch(&event(key)).unwrap();
            }
        });

        let mut received = Vec::new();
        while let Some(event) = rx.blocking_recv() {
            received.push(event.notification_key);
        }
        producer.join().unwrap();

        assert_eq!(received, vec!["a", "b", "c"]);
    }
}
