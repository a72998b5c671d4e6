//! In-memory PI Web API used by unit tests.
//!
//! Attributes live at `https://mock/streams/{index}/interpolated`. The
//! interpolated endpoint lays a grid from `startTime` to `endTime`
//! (inclusive) at the requested interval; grid points inside an attribute's
//! data window carry the epoch second as value, the others a "No Data"
//! marker object.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use url::Url;

use crate::{
    interval::Interval,
    time_range::format_wire_time,
    transport::{Transport, TransportError},
};

#[derive(Debug, Clone)]
struct MockAttribute {
    path: String,
    name: String,
    unit: String,
    data_from: DateTime<Utc>,
    data_to: DateTime<Utc>,
    metadata_errors: bool,
    data_errors: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct MockPiServer {
    now: DateTime<Utc>,
    attributes: Vec<MockAttribute>,
    fail_data_from: Option<DateTime<Utc>>,
    log: Arc<Mutex<Vec<Url>>>,
}

impl MockPiServer {
    /// Server whose `*` resolves to `now`.
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            attributes: Vec::new(),
            fail_data_from: None,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn with_attribute(
        mut self,
        path: &str,
        name: &str,
        unit: &str,
        data_from: DateTime<Utc>,
        data_to: DateTime<Utc>,
    ) -> Self {
        self.attributes.push(MockAttribute {
            path: path.to_string(),
            name: name.to_string(),
            unit: unit.to_string(),
            data_from,
            data_to,
            metadata_errors: false,
            data_errors: false,
        });
        self
    }

    pub(crate) fn with_metadata_errors(mut self, path: &str) -> Self {
        for attr in self.attributes.iter_mut().filter(|a| a.path == path) {
            attr.metadata_errors = true;
        }
        self
    }

    pub(crate) fn with_data_errors(mut self, path: &str) -> Self {
        for attr in self.attributes.iter_mut().filter(|a| a.path == path) {
            attr.data_errors = true;
        }
        self
    }

    /// Interpolated requests starting at or after `from` answer HTTP 502.
    pub(crate) fn failing_data_from(mut self, from: DateTime<Utc>) -> Self {
        self.fail_data_from = Some(from);
        self
    }

    pub(crate) fn requests(&self) -> Vec<Url> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn data_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|u| u.path().ends_with("/interpolated"))
            .count()
    }

    pub(crate) fn metadata_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|u| u.path().ends_with("/attributes"))
            .count()
    }

    /// `(startTime, endTime)` of every data request for the attribute named
    /// `name`.
    pub(crate) fn data_windows_for(&self, name: &str) -> Vec<(String, String)> {
        let Some(index) = self.attributes.iter().position(|a| a.name == name) else {
            return Vec::new();
        };
        let prefix = format!("/streams/{index}/");
        self.requests()
            .iter()
            .filter(|u| u.path().starts_with(&prefix))
            .map(|u| (query(u, "startTime"), query(u, "endTime")))
            .collect()
    }

    fn resolve_time(&self, text: &str) -> DateTime<Utc> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
            return ts.with_timezone(&Utc);
        }
        let offset = text.trim_start_matches('*');
        if offset.is_empty() {
            return self.now;
        }
        let (sign, spec) = offset.split_at(1);
        let delta = Interval::parse(spec).unwrap().duration();
        if sign == "-" {
            self.now - delta
        } else {
            self.now + delta
        }
    }

    fn attributes_response(&self, url: &Url) -> Result<Value, TransportError> {
        let path = query(url, "path");
        let Some((index, attr)) = self
            .attributes
            .iter()
            .enumerate()
            .find(|(_, a)| a.path == path)
        else {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: 404,
                body: json!({"Errors": [format!("Path '{path}' was not found.")]}),
            });
        };

        if attr.metadata_errors {
            return Ok(json!({"Errors": ["Attribute not found (mock)"]}));
        }

        Ok(json!({
            "WebId": format!("W{index}"),
            "Name": attr.name,
            "DefaultUnitsNameAbbreviation": attr.unit,
            "Links": {
                "Self": format!("https://mock/attributes/W{index}"),
                "InterpolatedData": format!("https://mock/streams/{index}/interpolated"),
            }
        }))
    }

    fn interpolated_response(&self, url: &Url, index: usize) -> Result<Value, TransportError> {
        let attr = &self.attributes[index];
        let start = self.resolve_time(&query(url, "startTime"));
        let end = self.resolve_time(&query(url, "endTime"));
        let step = Interval::parse(&query(url, "interval")).unwrap().duration();
        assert_eq!(query(url, "selectedFields"), "Items.Timestamp;Items.Value");

        if self.fail_data_from.is_some_and(|from| start >= from) {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: 502,
                body: Value::String("Bad Gateway".to_string()),
            });
        }
        if attr.data_errors {
            return Ok(json!({"Errors": ["mock failure"]}));
        }

        let mut items = Vec::new();
        let mut ts = start;
        while ts <= end {
            let value = if ts >= attr.data_from && ts <= attr.data_to {
                json!(ts.timestamp() as f64)
            } else {
                json!({"Name": "No Data", "Value": 248, "IsSystem": true})
            };
            items.push(json!({"Timestamp": format_wire_time(ts), "Value": value}));
            ts += step;
        }
        Ok(json!({ "Items": items }))
    }
}

fn query(url: &Url, key: &str) -> String {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl Transport for MockPiServer {
    async fn get_json(&self, url: &Url) -> Result<Value, TransportError> {
        self.log.lock().unwrap().push(url.clone());

        let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
        match segments.as_slice() {
            [.., "attributes"] => self.attributes_response(url),
            ["streams", index, "interpolated"] => {
                let index: usize = index.parse().unwrap();
                self.interpolated_response(url, index)
            }
            _ => Err(TransportError::Status {
                url: url.to_string(),
                status: 404,
                body: Value::Null,
            }),
        }
    }
}
