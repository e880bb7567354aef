//! Line-oriented push transport.
//!
//! The server writes one event frame per line (see
//! [`PushEvent::from_frame`]). Frames are decoded and handed to the channel's
//! [`PushSender`]; bad frames are logged and skipped.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

use crate::error::Result;
use crate::push::{PushEvent, PushSender};

/// Counters for one transport run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub delivered: usize,
    pub skipped: usize,
}

/// Read frames from `reader` until EOF or until the channel is closed.
pub async fn pump<R>(mut reader: R, sender: &PushSender) -> Result<PumpReport>
where
    R: AsyncBufRead + Unpin,
{
    let mut report = PumpReport::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        if sender.is_closed() {
            break;
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, bytes = buf.len(), "skipping non-utf8 push frame");
                report.skipped += 1;
                continue;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match PushEvent::from_frame(trimmed) {
            Ok(event) => {
                sender.send(event);
                report.delivered += 1;
            }
            Err(err) => {
                tracing::warn!(error = %err, frame = trimmed, "skipping push frame");
                report.skipped += 1;
            }
        }
    }
    Ok(report)
}

/// Connect to the push endpoint at `addr` (`host:port`) and pump it.
pub async fn run_tcp(addr: &str, sender: PushSender) -> Result<PumpReport> {
    let stream = TcpStream::connect(addr).await?;
    tracing::info!(addr, "push transport connected");
    let report = pump(BufReader::new(stream), &sender).await?;
    tracing::info!(
        addr,
        delivered = report.delivered,
        skipped = report.skipped,
        "push transport finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::{PushChannel, PushEventKind};

    #[tokio::test]
    async fn pump_decodes_lines_and_skips_garbage() {
        let (handle, sender) = PushChannel::connect("s1");
        let mut sub = handle.subscribe().expect("subscribe");
        let input = concat!(
            "[\"taskCreated\",{\"_id\":\"a\",\"title\":\"A\"}]\n",
            "\n",
            "garbage\n",
            "[\"taskDeleted\",\"a\"]\n",
        );

        let report = pump(input.as_bytes(), &sender).await.expect("pump");
        assert_eq!(
            report,
            PumpReport {
                delivered: 2,
                skipped: 1
            }
        );
        assert_eq!(sub.recv().await.map(|e| e.kind()), Some(PushEventKind::TaskCreated));
        assert_eq!(sub.recv().await.map(|e| e.kind()), Some(PushEventKind::TaskDeleted));
    }

    #[tokio::test]
    async fn pump_skips_invalid_utf8_and_keeps_reading() {
        let (handle, sender) = PushChannel::connect("s1");
        let mut sub = handle.subscribe().expect("subscribe");
        let mut input = b"[\"taskDeleted\",\"a\"]\n".to_vec();
        input.extend_from_slice(&[0xff, 0xfe, b'\n']);
        input.extend_from_slice(b"[\"taskDeleted\",\"b\"]");

        let report = pump(input.as_slice(), &sender).await.expect("pump");
        assert_eq!(
            report,
            PumpReport {
                delivered: 2,
                skipped: 1
            }
        );
        let ids: Vec<String> = [sub.recv().await, sub.recv().await]
            .into_iter()
            .flatten()
            .filter_map(|event| match event {
                PushEvent::TaskDeleted { task_id, .. } => Some(task_id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn pump_stops_after_close() {
        let (handle, sender) = PushChannel::connect("s1");
        handle.close();
        let input = "[\"taskDeleted\",\"a\"]\n";
        let report = pump(input.as_bytes(), &sender).await.expect("pump");
        assert_eq!(report, PumpReport::default());
    }
}
