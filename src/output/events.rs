//! Event log writers.
//!
//! One record per classified detection, plus one for a tick without
//! detections whose gate decision was anything other than a plain off.

use crate::error::{Error, Result};
use crate::pipeline::TickReport;
use crate::safety::Decision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Supported event log formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventFormat {
    /// Comma-separated values with a header row.
    Csv,
    /// One JSON object per line.
    Json,
}

impl std::fmt::Display for EventFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for EventFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" | "jsonl" | "ndjson" => Ok(Self::Json),
            other => Err(format!("unknown event format: {other}")),
        }
    }
}

/// A single logged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Wall-clock time the record was written.
    pub recorded_at: DateTime<Utc>,
    /// Frame sequence number.
    pub sequence: u64,
    /// Frame timestamp.
    pub frame_ms: u64,
    /// Track the detection belongs to.
    pub track_id: Option<u32>,
    /// Centroid column.
    pub centroid_x: Option<u16>,
    /// Centroid row.
    pub centroid_y: Option<u16>,
    /// Bounding box width.
    pub width: Option<u16>,
    /// Bounding box height.
    pub height: Option<u16>,
    /// Size class name.
    pub size_class: Option<String>,
    /// Confidence tier name.
    pub confidence: Option<String>,
    /// Hovering verdict.
    pub hovering: bool,
    /// How long the track has been hovering.
    pub hover_ms: u64,
    /// Set when this detection is the selected target.
    pub pan_deg: Option<f32>,
    /// Set when this detection is the selected target.
    pub tilt_deg: Option<f32>,
    /// Gate decision for the tick.
    pub decision: String,
    /// Gate state after the tick.
    pub gate_state: String,
    /// Whether the actuator was on after the tick.
    pub actuator_on: bool,
}

impl EventRecord {
    /// Records for one control tick; empty when nothing happened.
    #[must_use]
    pub fn from_tick(tick: &TickReport, recorded_at: DateTime<Utc>) -> Vec<Self> {
        let base = Self {
            recorded_at,
            sequence: tick.frame.sequence,
            frame_ms: tick.frame.timestamp_ms,
            track_id: None,
            centroid_x: None,
            centroid_y: None,
            width: None,
            height: None,
            size_class: None,
            confidence: None,
            hovering: false,
            hover_ms: 0,
            pan_deg: None,
            tilt_deg: None,
            decision: tick.decision.to_string(),
            gate_state: tick.gate_state.to_string(),
            actuator_on: tick.actuator_on,
        };

        if tick.frame.detections.is_empty() {
            return if tick.decision == Decision::Off {
                Vec::new()
            } else {
                vec![base]
            };
        }

        tick.frame
            .detections
            .iter()
            .map(|d| {
                let target = tick
                    .engagement
                    .filter(|e| e.detection.track_id == d.track_id)
                    .map(|e| e.angles);
                Self {
                    track_id: Some(d.track_id),
                    centroid_x: Some(d.region.centroid_x),
                    centroid_y: Some(d.region.centroid_y),
                    width: Some(d.region.w),
                    height: Some(d.region.h),
                    size_class: Some(d.size_class.to_string()),
                    confidence: Some(d.confidence.to_string()),
                    hovering: d.hovering,
                    hover_ms: d.hover_duration_ms,
                    pan_deg: target.map(|a| a.pan_deg),
                    tilt_deg: target.map(|a| a.tilt_deg),
                    ..base.clone()
                }
            })
            .collect()
    }
}

/// Sink for event records.
pub trait EventWriter {
    /// Write one record.
    fn write_event(&mut self, record: &EventRecord) -> Result<()>;

    /// Flush buffered output.
    fn finalize(&mut self) -> Result<()>;
}

/// CSV event writer. The header row is written with the first record.
pub struct CsvEventWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvEventWriter<File> {
    /// Create (or truncate) `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let writer = csv::Writer::from_path(path).map_err(|source| Error::EventWrite { source })?;
        Ok(Self { writer })
    }
}

impl<W: Write> CsvEventWriter<W> {
    /// Write to an arbitrary sink.
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
        }
    }

    /// Flush and return the sink.
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| Error::Io(e.into_error()))
    }
}

impl<W: Write> EventWriter for CsvEventWriter<W> {
    fn write_event(&mut self, record: &EventRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .map_err(|source| Error::EventWrite { source })
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    host: &'a str,
    #[serde(flatten)]
    record: &'a EventRecord,
}

/// JSON lines event writer. Each line also carries the host name.
pub struct JsonLinesEventWriter<W: Write> {
    writer: W,
    host: String,
}

impl JsonLinesEventWriter<BufWriter<File>> {
    /// Create (or truncate) `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesEventWriter<W> {
    /// Write to an arbitrary sink.
    pub fn from_writer(writer: W) -> Self {
        let host = hostname::get().map_or_else(
            |_| "unknown".to_string(),
            |h| h.to_string_lossy().into_owned(),
        );
        Self { writer, host }
    }

    /// Return the sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventWriter for JsonLinesEventWriter<W> {
    fn write_event(&mut self, record: &EventRecord) -> Result<()> {
        let event = JsonEvent {
            host: &self.host,
            record,
        };
        serde_json::to_writer(&mut self.writer, &event)
            .map_err(|source| Error::EventSerialize { source })?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Open an event writer for `path` in the given format.
pub fn create_event_writer(format: EventFormat, path: &Path) -> Result<Box<dyn EventWriter>> {
    Ok(match format {
        EventFormat::Csv => Box::new(CsvEventWriter::create(path)?),
        EventFormat::Json => Box::new(JsonLinesEventWriter::create(path)?),
    })
}
