//! Live push channel consumer.
//!
//! The scale pushes one JSON object per WebSocket text message:
//!
//! ```json
//! {"timestamp": 1718000000123, "weight": 4213.5}
//! ```
//!
//! [`LiveFeed`] turns the socket into a stream of [`LiveEvent`]s, reconnecting when
//! configured to. [`LiveMonitor`] folds those events into a [`LiveBuffer`] and the current
//! [`ConnectionState`]. The buffer has no paused state: while disconnected it simply
//! receives nothing and keeps what it already holds.

use super::buffer::{LiveBuffer, LiveSample};
use crate::config::LiveConfig;
use crate::error::AppResult;
use futures::{Stream, StreamExt};
use std::time::Duration;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Transport lifecycle of the push channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake in progress
    Connecting,
    /// Receiving samples
    Open,
    /// Close frame received
    Closing,
    /// Not connected
    #[default]
    Closed,
}

/// Events produced by [`LiveFeed::subscribe`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// A connection attempt started
    Connecting {
        /// Endpoint being dialed
        url: String,
    },
    /// Connection established
    Connected,
    /// Decoded sample
    Sample(LiveSample),
    /// Message that did not decode as a sample
    Rejected {
        /// Decoder error
        reason: String,
    },
    /// The server sent a close frame
    Closing,
    /// Connection lost or closed
    Disconnected {
        /// Close reason or transport error
        reason: String,
    },
    /// Connection failed or reconnect budget exhausted
    Error {
        /// What went wrong
        message: String,
    },
}

/// Decode one push message.
pub fn parse_message(text: &str) -> AppResult<LiveSample> {
    Ok(serde_json::from_str(text)?)
}

/// WebSocket consumer for the live push channel.
pub struct LiveFeed {
    config: LiveConfig,
    reconnect_count: u32,
}

impl LiveFeed {
    /// Consumer for the channel described by `config`.
    pub fn new(config: LiveConfig) -> Self {
        Self {
            config,
            reconnect_count: 0,
        }
    }

    fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.config.reconnect_delay_ms)
    }

    /// Connect and yield events until the channel closes for good.
    pub fn subscribe(&mut self) -> impl Stream<Item = LiveEvent> + '_ {
        async_stream::stream! {
            loop {
                let url = self.config.url.clone();
                info!(url = %url, "Connecting to live stream");
                yield LiveEvent::Connecting { url: url.clone() };

                match connect_async(url.as_str()).await {
                    Ok((ws_stream, _)) => {
                        self.reconnect_count = 0;
                        yield LiveEvent::Connected;

                        let (_write, mut read) = ws_stream.split();

                        while let Some(msg_result) = read.next().await {
                            match msg_result {
                                Ok(Message::Text(text)) => match parse_message(&text) {
                                    Ok(sample) => yield LiveEvent::Sample(sample),
                                    Err(e) => {
                                        warn!(error = %e, "Ignoring undecodable live message");
                                        yield LiveEvent::Rejected { reason: e.to_string() };
                                    }
                                },
                                Ok(Message::Ping(_)) => {
                                    debug!("Received ping");
                                }
                                Ok(Message::Close(frame)) => {
                                    let reason = frame
                                        .map(|f| f.reason.to_string())
                                        .unwrap_or_else(|| "closed by device".to_string());
                                    yield LiveEvent::Closing;
                                    yield LiveEvent::Disconnected { reason };
                                    break;
                                }
                                Err(e) => {
                                    error!(error = %e, "Live stream error");
                                    yield LiveEvent::Disconnected { reason: e.to_string() };
                                    break;
                                }
                                _ => {}
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to connect to live stream");
                        yield LiveEvent::Error {
                            message: format!("Connection failed: {e}"),
                        };
                    }
                }

                if !self.config.auto_reconnect {
                    break;
                }

                self.reconnect_count += 1;
                if self.config.max_reconnect_attempts > 0
                    && self.reconnect_count > self.config.max_reconnect_attempts
                {
                    yield LiveEvent::Error {
                        message: format!(
                            "Max reconnect attempts ({}) reached",
                            self.config.max_reconnect_attempts
                        ),
                    };
                    break;
                }

                info!(
                    attempt = self.reconnect_count,
                    delay_ms = self.config.reconnect_delay_ms,
                    "Reconnecting to live stream"
                );
                sleep(self.reconnect_delay()).await;
            }
        }
    }
}

/// Live buffer plus connection state, updated one event at a time.
#[derive(Debug, Clone, Default)]
pub struct LiveMonitor {
    buffer: LiveBuffer,
    state: ConnectionState,
    rejected: u64,
}

impl LiveMonitor {
    /// Monitor with a buffer of `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: LiveBuffer::with_capacity(capacity),
            state: ConnectionState::Closed,
            rejected: 0,
        }
    }

    /// Samples received so far.
    pub fn buffer(&self) -> &LiveBuffer {
        &self.buffer
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Messages dropped because they did not decode.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Fold one event into the buffer and the connection state.
    pub fn apply(&mut self, event: LiveEvent) {
        match event {
            LiveEvent::Connecting { .. } => self.state = ConnectionState::Connecting,
            LiveEvent::Connected => self.state = ConnectionState::Open,
            LiveEvent::Sample(sample) => {
                self.buffer.push(sample);
            }
            LiveEvent::Rejected { reason } => {
                self.rejected += 1;
                debug!(%reason, total = self.rejected, "Dropped live message");
            }
            LiveEvent::Closing => self.state = ConnectionState::Closing,
            LiveEvent::Disconnected { .. } | LiveEvent::Error { .. } => {
                self.state = ConnectionState::Closed
            }
        }
    }

    /// Consume `events` until it ends or `max_samples` samples have been buffered.
    pub async fn drive<S>(&mut self, events: S, max_samples: Option<usize>)
    where
        S: Stream<Item = LiveEvent>,
    {
        futures::pin_mut!(events);
        let mut received = 0usize;
        while let Some(event) = events.next().await {
            let is_sample = matches!(event, LiveEvent::Sample(_));
            self.apply(event);
            if is_sample {
                received += 1;
                if max_samples.is_some_and(|max| received >= max) {
                    break;
                }
            }
        }
        self.state = ConnectionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn parses_push_message() {
        let sample = parse_message(r#"{"timestamp": 1500, "weight": 4213.5}"#).unwrap();
        assert_eq!(
            sample,
            LiveSample {
                timestamp: 1500,
                weight: 4213.5
            }
        );
    }

    #[test]
    fn rejects_message_without_weight() {
        assert!(parse_message(r#"{"timestamp": 1500}"#).is_err());
    }

    #[test]
    fn monitor_tracks_connection_lifecycle() {
        let mut monitor = LiveMonitor::new(10);
        assert_eq!(monitor.state(), ConnectionState::Closed);

        monitor.apply(LiveEvent::Connecting {
            url: "ws://scale/ws".into(),
        });
        assert_eq!(monitor.state(), ConnectionState::Connecting);

        monitor.apply(LiveEvent::Connected);
        assert_eq!(monitor.state(), ConnectionState::Open);

        monitor.apply(LiveEvent::Closing);
        assert_eq!(monitor.state(), ConnectionState::Closing);

        monitor.apply(LiveEvent::Disconnected {
            reason: "bye".into(),
        });
        assert_eq!(monitor.state(), ConnectionState::Closed);
    }

    #[test]
    fn disconnect_keeps_buffered_samples() {
        let mut monitor = LiveMonitor::new(10);
        monitor.apply(LiveEvent::Connected);
        monitor.apply(LiveEvent::Sample(LiveSample {
            timestamp: 1,
            weight: 2.0,
        }));
        monitor.apply(LiveEvent::Disconnected {
            reason: "wifi".into(),
        });

        assert_eq!(monitor.buffer().len(), 1);
    }

    #[test]
    #[traced_test]
    fn rejected_messages_are_counted_not_buffered() {
        let mut monitor = LiveMonitor::new(10);
        monitor.apply(LiveEvent::Rejected {
            reason: "bad json".into(),
        });
        assert_eq!(monitor.rejected(), 1);
        assert!(monitor.buffer().is_empty());
        assert!(logs_contain("Dropped live message"));
    }
}
