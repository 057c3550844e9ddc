// Time-indexed table handed to the dashboard
// Author: Gabriel Demetrios Lafis

use std::io::Write;

use serde::{Deserialize, Serialize};

use super::ResponseError;

/// Type of a frame column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Time,
    Number,
    String,
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Fixed display colour reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl FrameField {
    pub fn new<S: Into<String>>(name: S, field_type: FieldType) -> Self {
        FrameField {
            name: name.into(),
            field_type,
            color: None,
        }
    }

    pub fn time() -> Self {
        Self::new("Time", FieldType::Time)
    }

    pub fn with_color<S: Into<String>>(mut self, color: S) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// A single cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Time(i64),
    Number(f64),
    String(String),
}

impl Value {
    fn to_csv_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Time(t) => t.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
        }
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map(Value::Number).unwrap_or(Value::Null)
    }
}

/// One row, values ordered like the frame fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Row { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// Table of samples: a `Time` column followed by one column per curve
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "refId", default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    pub fields: Vec<FrameField>,
    pub rows: Vec<Row>,
}

impl Frame {
    /// Create an empty frame with the given columns
    pub fn new(fields: Vec<FrameField>) -> Self {
        Frame {
            ref_id: None,
            fields,
            rows: Vec::new(),
        }
    }

    /// Frame without columns, rendered as "no data"
    pub fn empty() -> Self {
        Frame::default()
    }

    pub fn with_ref_id<S: Into<String>>(mut self, ref_id: S) -> Self {
        self.ref_id = Some(ref_id.into());
        self
    }

    /// Append a row; it must have one value per field
    pub fn add_row(&mut self, row: Row) -> Result<(), ResponseError> {
        if row.values.len() != self.fields.len() {
            return Err(ResponseError::Shape(format!(
                "Row has {} values, frame has {} fields",
                row.values.len(),
                self.fields.len()
            )));
        }

        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// All values of one column, by name
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.fields.iter().position(|f| f.name == name)?;
        Some(self.rows.iter().filter_map(|r| r.get(index)).collect())
    }

    /// Write the frame as CSV with a header row
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ResponseError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer
            .write_record(self.fields.iter().map(|f| f.name.as_str()))
            .map_err(|e| ResponseError::Export(e.to_string()))?;

        for row in &self.rows {
            csv_writer
                .write_record(row.values.iter().map(Value::to_csv_field))
                .map_err(|e| ResponseError::Export(e.to_string()))?;
        }

        csv_writer
            .flush()
            .map_err(|e| ResponseError::Export(e.to_string()))?;
        Ok(())
    }
}
