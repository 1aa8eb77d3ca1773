//! Chart payloads for the analytics endpoints
//!
//! Only the envelope the charting frontend expects. No data series are wired
//! in yet; `elements` stays empty until real aggregation lands.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Chart {
    pub title: Title,
    pub elements: Vec<Element>,
}

#[derive(Debug, Serialize)]
pub struct Title {
    pub text: String,
}

/// One renderable series.
#[derive(Debug, Serialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub kind: String,
    pub values: Vec<serde_json::Value>,
}

impl Chart {
    pub fn new() -> Self {
        Chart {
            title: Title {
                text: String::new(),
            },
            elements: Vec::new(),
        }
    }

    pub fn title(mut self, text: &str) -> Self {
        self.title.text = text.to_string();
        self
    }
}

impl Default for Chart {
    fn default() -> Self {
        Self::new()
    }
}
