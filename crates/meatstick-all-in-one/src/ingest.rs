use anyhow::{Context, Result};
use meatstick_ble::{BroadcastEvent, CallbackRegistry, StateSink, StateUpdate};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Writes state changes to the log.
pub struct LogStateSink;

impl StateSink for LogStateSink {
    fn write_state(&self, update: &StateUpdate) {
        info!(
            entity = %update.unique_id,
            name = %update.name,
            address = %update.address,
            celsius = update.celsius,
            rssi = ?update.rssi,
            "Temperature state changed"
        );
    }
}

/// Counters for one ingestion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: usize,
    pub malformed: usize,
    pub delivered: usize,
}

/// Read JSON-lines broadcast events until EOF or cancellation and dispatch
/// each through `registry`. Malformed lines are logged and skipped.
pub async fn ingest<R>(
    reader: R,
    registry: &CallbackRegistry,
    ctx: CancellationToken,
) -> Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = IngestStats::default();

    loop {
        let line = tokio::select! {
            _ = ctx.cancelled() => {
                info!("Received shutdown signal, stopping ingestion");
                break;
            }
            line = lines.next_line() => line.context("failed to read broadcast event")?,
        };

        let Some(line) = line else {
            debug!("End of broadcast input");
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.lines += 1;

        match BroadcastEvent::from_json(line) {
            Ok(event) => {
                let delivered = registry.dispatch(&event);
                debug!(address = %event.address, delivered, "Dispatched broadcast");
                stats.delivered += delivered;
            }
            Err(e) => {
                warn!(line = stats.lines, error = %e, "Skipping malformed broadcast event");
                stats.malformed += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meatstick_ble::{ProbeConfig, TemperatureSensor};
    use meatstick_payload::ProbeDecoder;
    use std::sync::Arc;

    fn sensor() -> Arc<TemperatureSensor> {
        Arc::new(TemperatureSensor::new(
            ProbeConfig::new("40:51:6C:09:A2:00".parse().unwrap()),
            Arc::new(ProbeDecoder::default()),
            Arc::new(LogStateSink),
        ))
    }

    #[tokio::test]
    async fn test_ingest_dispatches_and_skips_malformed() {
        let input = concat!(
            r#"{"address": "40:51:6c:09:a2:00", "rssi": -60, "manufacturer_data": {"2641": "0000029e"}}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"address": "11:22:33:44:55:66", "manufacturer_data": {"2641": "000000fa"}}"#,
            "\n",
            r#"{"address": "40:51:6c:09:a2:00", "manufacturer_data": {"2641": "zz"}}"#,
            "\n",
        );

        let registry = CallbackRegistry::new();
        let sensor = sensor();
        let handle = sensor.attach(&registry);

        let stats = ingest(input.as_bytes(), &registry, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            stats,
            IngestStats {
                lines: 4,
                malformed: 2,
                delivered: 1,
            }
        );
        assert_eq!(sensor.native_value(), Some(67.0));
        assert!(handle.cancel());
    }

    #[tokio::test]
    async fn test_ingest_stops_when_cancelled() {
        let (reader, _writer) = tokio::io::duplex(64);
        let registry = CallbackRegistry::new();
        let ctx = CancellationToken::new();
        ctx.cancel();

        let stats = ingest(tokio::io::BufReader::new(reader), &registry, ctx)
            .await
            .unwrap();
        assert_eq!(stats, IngestStats::default());
    }
}
