//! Periodic `keeplive` heartbeat.
//!
//! Sends `type@=keeplive/tick@=<unix seconds>/` as soon as it starts and
//! then once per interval until the session's shutdown signal fires. A failed
//! write is recorded on the shutdown signal so the watch loop can report it.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::DanmuError;
use crate::message::Message;
use crate::shutdown::Shutdown;
use crate::writer::WriterHandle;

/// Current unix time in seconds.
pub(crate) fn unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Spawn the heartbeat task.
pub(crate) fn spawn_heartbeat(
    writer: WriterHandle,
    interval: Duration,
    shutdown: Shutdown,
) -> JoinHandle<()> {
    tokio::spawn(heartbeat_loop(writer, interval, shutdown))
}

async fn heartbeat_loop(writer: WriterHandle, interval: Duration, shutdown: Shutdown) {
    // tokio::time::interval panics on a zero period
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.triggered() => {
                tracing::debug!("Heartbeat stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        let tick = unix_seconds();
        let keeplive = Message::keeplive(tick);
        let sent = tokio::select! {
            biased;
            _ = shutdown.triggered() => {
                tracing::debug!("Heartbeat stopped while sending");
                return;
            }
            sent = writer.write_message(&keeplive) => sent,
        };
        if let Err(e) = sent {
            tracing::error!("Heartbeat failed: {}", e);
            let reason = match e {
                DanmuError::Write(reason) => reason,
                other => other.to_string(),
            };
            shutdown.fail(format!("heartbeat failed: {}", reason));
            return;
        }
        tracing::debug!(tick, "Heartbeat sent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_HEARTBEAT_INTERVAL;
    use crate::protocol::FrameReader;
    use crate::writer::{spawn_writer_task, spawn_writer_task_default, WriterConfig};
    use tokio::io::duplex;
    use tokio::time::Instant;

    async fn next_tick<R>(reader: &mut FrameReader<R>) -> i64
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let frame = reader.read_frame().await.unwrap();
        let message = Message::decode(&frame).unwrap();
        assert_eq!(message.field_str("type"), Some("keeplive"));
        message.field_i64("tick").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_heartbeat_per_interval() {
        let (client, server) = duplex(4096);
        let (writer, _writer_task) = spawn_writer_task_default(client);
        let shutdown = Shutdown::new();
        let _heartbeat = spawn_heartbeat(writer, DEFAULT_HEARTBEAT_INTERVAL, shutdown.clone());

        let mut reader = FrameReader::new(server);

        // First heartbeat goes out immediately
        let start = Instant::now();
        next_tick(&mut reader).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        for period in 1..=3u32 {
            // Nothing arrives before the interval is up
            let early = tokio::time::timeout(Duration::from_secs(44), reader.read_frame()).await;
            assert!(early.is_err(), "heartbeat sent early in period {}", period);

            next_tick(&mut reader).await;
            assert_eq!(start.elapsed(), DEFAULT_HEARTBEAT_INTERVAL * period);
        }

        shutdown.trigger();
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_is_unix_seconds() {
        let (client, server) = duplex(4096);
        let (writer, _writer_task) = spawn_writer_task_default(client);
        let shutdown = Shutdown::new();
        let _heartbeat = spawn_heartbeat(writer, DEFAULT_HEARTBEAT_INTERVAL, shutdown.clone());

        let before = unix_seconds();
        let tick = next_tick(&mut FrameReader::new(server)).await;
        assert!(tick >= before);
        assert!(tick <= unix_seconds());

        shutdown.trigger();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_shutdown() {
        let (client, server) = duplex(4096);
        let (writer, writer_task) = spawn_writer_task_default(client);
        let shutdown = Shutdown::new();
        let heartbeat = spawn_heartbeat(writer, DEFAULT_HEARTBEAT_INTERVAL, shutdown.clone());

        let mut reader = FrameReader::new(server);
        next_tick(&mut reader).await;

        shutdown.trigger();
        heartbeat.await.unwrap();

        // The heartbeat held the last writer handle: the writer shuts down
        assert!(writer_task.await.unwrap().is_ok());
        assert!(reader.read_frame().await.is_err());
        assert!(shutdown.cause().is_none());
    }

    #[tokio::test]
    async fn test_stops_while_write_is_stalled() {
        // Peer never reads and writes never time out
        let (client, _server) = duplex(8);
        let config = WriterConfig {
            write_timeout: None,
            ..WriterConfig::default()
        };
        let (writer, _writer_task) = spawn_writer_task(client, config);
        let shutdown = Shutdown::new();
        let heartbeat = spawn_heartbeat(writer, DEFAULT_HEARTBEAT_INTERVAL, shutdown.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!heartbeat.is_finished());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), heartbeat)
            .await
            .expect("heartbeat stopped")
            .unwrap();
        assert!(shutdown.cause().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_recorded() {
        let (client, server) = duplex(4096);
        drop(server);
        let (writer, _writer_task) = spawn_writer_task_default(client);
        let shutdown = Shutdown::new();

        let heartbeat = spawn_heartbeat(writer, DEFAULT_HEARTBEAT_INTERVAL, shutdown.clone());
        heartbeat.await.unwrap();

        assert!(shutdown.is_triggered());
        assert!(shutdown.cause().unwrap().contains("heartbeat failed"));
    }
}
