// Ingress adapter — newline-delimited JSON post events.
//
// One event per line. Lines that aren't valid JSON are dropped with a debug
// record. When the reader hits EOF the channel closes, which the runtime
// treats as the source disconnecting.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::models::PostEvent;

/// Default channel capacity between the reader and the pipeline.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

pub fn parse_event_line(line: &str) -> Result<PostEvent> {
    serde_json::from_str(line).context("Invalid post event JSON")
}

/// Read events from `reader` into a channel until EOF or the receiver goes
/// away. The task yields the number of events forwarded.
pub fn spawn_reader<R>(
    reader: R,
    capacity: usize,
) -> (mpsc::Receiver<PostEvent>, JoinHandle<Result<u64>>)
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity);

    let handle = tokio::spawn(async move {
        let mut lines = reader.lines();
        let mut forwarded = 0u64;
        let mut line_no = 0u64;

        while let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read event stream")?
        {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let event = match parse_event_line(line) {
                Ok(event) => event,
                Err(e) => {
                    debug!(line = line_no, error = %e, "Dropping unparseable event line");
                    continue;
                }
            };

            if tx.send(event).await.is_err() {
                debug!("Pipeline stopped receiving, closing reader");
                break;
            }
            forwarded += 1;
        }

        info!(events = forwarded, "Event source closed");
        Ok(forwarded)
    });

    (rx, handle)
}
