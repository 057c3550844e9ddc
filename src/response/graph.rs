// Graph payload reshaping into time-indexed frames
// Author: Gabriel Demetrios Lafis

use chrono::{DateTime, Duration, FixedOffset};
use log::debug;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::{FieldType, Frame, FrameField, ResponseError, Row, Value};

/// One curve of a web API graph
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Curve {
    pub title: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub rrddata: Vec<Option<f64>>,
}

/// `result` of a successful `get_graph` call
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebGraphResult {
    pub start_time: i64,
    #[serde(default)]
    pub end_time: Option<i64>,
    pub step: i64,
    #[serde(default)]
    pub curves: Vec<Curve>,
}

impl WebGraphResult {
    /// Reshape into a frame with one row per sample index.
    ///
    /// Curves are expected to share the sample count; missing trailing
    /// samples of a shorter curve become null cells.
    pub fn into_frame(self) -> Result<Frame, ResponseError> {
        let mut fields = vec![FrameField::time()];
        fields.extend(
            self.curves
                .iter()
                .map(|curve| FrameField::new(curve.title.clone(), FieldType::Number)),
        );
        let mut frame = Frame::new(fields);

        let samples = self.curves.iter().map(|c| c.rrddata.len()).max().unwrap_or(0);
        for i in 0..samples {
            let mut values = Vec::with_capacity(self.curves.len() + 1);
            values.push(Value::Time((self.start_time + i as i64 * self.step) * 1000));
            values.extend(
                self.curves
                    .iter()
                    .map(|curve| Value::from(curve.rrddata.get(i).copied().flatten())),
            );
            frame.add_row(Row::new(values))?;
        }

        debug!("Reshaped {} curves into {} rows", self.curves.len(), frame.len());
        Ok(frame)
    }
}

/// Turn the `result` of a web API graph call into a frame
pub fn normalize_graph(result: JsonValue) -> Result<Frame, ResponseError> {
    let graph: WebGraphResult =
        serde_json::from_value(result).map_err(|e| ResponseError::Shape(e.to_string()))?;
    graph.into_frame()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RestTimeWindow {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RestMetric {
    pub title: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub line_type: Option<String>,
    #[serde(default)]
    pub data_points: Vec<Option<f64>>,
}

/// Body of the REST metric `get` and `filter` responses
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RestGraphResponse {
    pub time_range: RestTimeWindow,
    pub step: i64,
    #[serde(default)]
    pub metrics: Vec<RestMetric>,
}

fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, ResponseError> {
    DateTime::parse_from_rfc3339(value)
        .map_err(|e| ResponseError::Shape(format!("Invalid timestamp '{}': {}", value, e)))
}

impl RestGraphResponse {
    /// Sample times from start to end inclusive, in milliseconds
    fn timestamps(&self) -> Result<Vec<i64>, ResponseError> {
        if self.step <= 0 {
            return Err(ResponseError::Shape(format!("Invalid step {}", self.step)));
        }

        let start = parse_timestamp(&self.time_range.start)?;
        let end = parse_timestamp(&self.time_range.end)?;
        let step = Duration::seconds(self.step);

        let mut times = Vec::new();
        let mut current = start;
        while current <= end {
            times.push(current.timestamp_millis());
            current = current + step;
        }
        Ok(times)
    }

    /// Reshape into a frame; a response without metrics gives an empty frame
    pub fn into_frame(self) -> Result<Frame, ResponseError> {
        if self.metrics.is_empty() {
            // Metric ids addressed as graph templates come back empty
            return Ok(Frame::empty());
        }

        let times = self.timestamps()?;
        let mut fields = vec![FrameField::time()];
        for metric in &self.metrics {
            let field = FrameField::new(metric.title.clone(), FieldType::Number);
            fields.push(match &metric.color {
                Some(color) => field.with_color(color.clone()),
                None => field,
            });
        }
        let mut frame = Frame::new(fields);

        for (i, time) in times.iter().enumerate() {
            let mut values = vec![Value::Time(*time)];
            values.extend(
                self.metrics
                    .iter()
                    .map(|metric| Value::from(metric.data_points.get(i).copied().flatten())),
            );
            frame.add_row(Row::new(values))?;
        }

        Ok(frame)
    }
}

/// Turn a REST graph response body into a frame
pub fn normalize_rest_graph(body: JsonValue) -> Result<Frame, ResponseError> {
    let graph: RestGraphResponse =
        serde_json::from_value(body).map_err(|e| ResponseError::Shape(e.to_string()))?;
    graph.into_frame()
}
