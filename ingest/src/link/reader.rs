use crate::link::source;
use crate::workflow::config::LinkSource;
use crate::workflow::runner::Ingestor;
use log::{info, warn};
use radarcore::prelude::LinkError;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Longest sensor line kept; anything past it up to the next newline is dropped.
pub const MAX_LINE: u64 = 256;

/// Reads lines until EOF, feeding each to the ingestor in arrival order.
/// Bytes are decoded lossily so line noise cannot end the stream. Returns the
/// number of non-blank lines seen.
pub async fn pump<R>(reader: R, ingestor: &Ingestor) -> Result<u64, LinkError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::with_capacity(64);
    let mut lines = 0;
    let mut overflowing = false;
    loop {
        buffer.clear();
        let read = (&mut reader)
            .take(MAX_LINE)
            .read_until(b'\n', &mut buffer)
            .await
            .map_err(|err| LinkError::Transport(format!("reading sensor link: {}", err)))?;
        if read == 0 {
            return Ok(lines);
        }
        let terminated = buffer.last() == Some(&b'\n');
        if overflowing || (!terminated && read as u64 == MAX_LINE) {
            if !overflowing {
                warn!("dropping sensor line longer than {} bytes", MAX_LINE);
            }
            overflowing = !terminated;
            continue;
        }
        let text = String::from_utf8_lossy(&buffer);
        let line = text.trim();
        if line.is_empty() {
            continue;
        }
        lines += 1;
        // Failures are logged and counted by the ingestor.
        ingestor.ingest_line(line).ok();
    }
}

/// Keeps the sensor link running: open, pump, report, and optionally reopen
/// after `reconnect`. Without a reconnect delay the task ends once the link
/// goes down; viewers stay connected either way.
pub async fn run(source: LinkSource, reconnect: Option<Duration>, ingestor: Ingestor) {
    loop {
        match source::open(&source).await {
            Ok(stream) => {
                ingestor.link_opened(&source);
                match pump(stream, &ingestor).await {
                    Ok(lines) => ingestor.link_closed(&format!("end of stream after {} lines", lines)),
                    Err(err) => {
                        ingestor.link_failed(&err);
                        ingestor.link_closed("read failure");
                    }
                }
            }
            Err(err) => {
                ingestor.link_failed(&err);
                ingestor.link_closed("open failure");
            }
        }

        match reconnect {
            Some(delay) => {
                info!("reopening {} in {:?}", source.label(), delay);
                tokio::time::sleep(delay).await;
            }
            None => {
                info!("sensor link {} will not be reopened", source.label());
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::sweep::GeneratorConfig;
    use radarcore::bus::{ConnectionState, SampleBus};
    use radarcore::prelude::RadarConfig;
    use radarcore::wire::BusEvent;

    #[tokio::test]
    async fn pump_processes_lines_in_order_and_skips_noise() {
        let bus = SampleBus::new();
        let mut sub = bus.subscribe();
        let ingestor = Ingestor::new(&RadarConfig::default(), bus);
        let input: &[u8] = b"10,5\r\n\r\n20,6\r\nbroken\r\n\xff\xfe,7\r\n30,8";

        let lines = pump(input, &ingestor).await.unwrap();
        assert_eq!(lines, 5);

        let seen: Vec<(f64, f64)> = std::iter::from_fn(|| sub.try_recv())
            .filter_map(|event| match event {
                BusEvent::SerialData(data) => Some((data.first, data.second)),
                _ => None,
            })
            .collect();
        assert_eq!(seen, vec![(10.0, 5.0), (20.0, 6.0), (0.0, 7.0), (30.0, 8.0)]);
        assert_eq!(ingestor.metrics().rejected, 1);
    }

    #[tokio::test]
    async fn synthetic_link_reports_open_and_close() {
        let bus = SampleBus::new();
        let mut sub = bus.subscribe();
        let ingestor = Ingestor::new(&RadarConfig::default(), bus);
        let source = LinkSource::Synthetic(GeneratorConfig {
            interval_ms: 1,
            limit: Some(3),
            ..Default::default()
        });

        run(source, None, ingestor.clone()).await;

        let names: Vec<&str> = std::iter::from_fn(|| sub.try_recv())
            .map(|event| event.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "serial-status",
                "serial-data",
                "serial-data",
                "serial-data",
                "serial-status"
            ]
        );
        assert_eq!(ingestor.link_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn unopenable_source_reports_error_then_disconnect() {
        let bus = SampleBus::new();
        let mut sub = bus.subscribe();
        let ingestor = Ingestor::new(&RadarConfig::default(), bus);
        let source = LinkSource::Tcp {
            address: "127.0.0.1:1".into(),
        };

        run(source, None, ingestor.clone()).await;

        let names: Vec<&str> = std::iter::from_fn(|| sub.try_recv())
            .map(|event| event.name())
            .collect();
        assert_eq!(names, vec!["serial-error", "serial-status"]);
        assert_eq!(ingestor.link_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn overlong_lines_are_dropped_whole() {
        let bus = SampleBus::new();
        let mut sub = bus.subscribe();
        let ingestor = Ingestor::new(&RadarConfig::default(), bus);
        let mut input = b"10,5\n".to_vec();
        input.extend(std::iter::repeat(b'9').take(MAX_LINE as usize * 3));
        input.extend_from_slice(b",1\n20,6\n");

        let lines = pump(input.as_slice(), &ingestor).await.unwrap();
        assert_eq!(lines, 2);

        let seen: Vec<(f64, f64)> = std::iter::from_fn(|| sub.try_recv())
            .filter_map(|event| match event {
                BusEvent::SerialData(data) => Some((data.first, data.second)),
                _ => None,
            })
            .collect();
        assert_eq!(seen, vec![(10.0, 5.0), (20.0, 6.0)]);
    }
}
