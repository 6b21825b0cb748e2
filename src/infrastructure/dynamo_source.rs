// DynamoDB scan source implementation
use crate::application::reading_source::{ContinuationToken, ReadingSource, ScanPage, SourceError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

const SCAN_TARGET: &str = "DynamoDB_20120810.Scan";
const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// Reads the sensor table through the DynamoDB JSON `Scan` API.
///
/// Requests are not SigV4-signed; point `endpoint` at DynamoDB Local or at a
/// gateway that signs on our behalf.
#[derive(Debug, Clone)]
pub struct DynamoScanSource {
    client: reqwest::Client,
    endpoint: String,
    table: String,
    api_token: Option<String>,
    page_limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ScanResponse {
    #[serde(rename = "Items", default)]
    items: Vec<Map<String, Value>>,
    #[serde(rename = "LastEvaluatedKey", default)]
    last_evaluated_key: Option<Value>,
}

impl DynamoScanSource {
    pub fn new(
        endpoint: String,
        table: String,
        api_token: Option<String>,
        page_limit: Option<u32>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            table,
            api_token,
            page_limit,
        })
    }

    fn scan_body(&self, resume: Option<ContinuationToken>) -> Value {
        let mut body = json!({ "TableName": self.table });
        if let Some(ContinuationToken(key)) = resume {
            body["ExclusiveStartKey"] = key;
        }
        if let Some(limit) = self.page_limit {
            body["Limit"] = json!(limit);
        }
        body
    }
}

#[async_trait]
impl ReadingSource for DynamoScanSource {
    async fn scan_page(&self, resume: Option<ContinuationToken>) -> Result<ScanPage, SourceError> {
        let body = self.scan_body(resume);
        tracing::debug!("Scanning {} at {}", self.table, self.endpoint);

        let mut request = self
            .client
            .post(format!("{}/", self.endpoint))
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", SCAN_TARGET)
            .body(body.to_string());
        if let Some(token) = &self.api_token {
            request = request.header("Authorization", format!("Token {}", token));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        let scan: ScanResponse =
            serde_json::from_slice(&bytes).map_err(|e| SourceError::Decode(e.to_string()))?;
        scan.into_page()
    }
}

impl ScanResponse {
    fn into_page(self) -> Result<ScanPage, SourceError> {
        let records = self
            .items
            .into_iter()
            .map(unmarshal_item)
            .collect::<Result<Vec<_>, _>>()?;
        let next = self
            .last_evaluated_key
            .filter(|key| !key.is_null())
            .map(ContinuationToken);
        Ok(ScanPage { records, next })
    }
}

/// Flatten a DynamoDB item (attribute name → typed attribute value) into
/// plain JSON.
fn unmarshal_item(item: Map<String, Value>) -> Result<Value, SourceError> {
    item.into_iter()
        .map(|(name, attr)| unmarshal_attribute(&attr).map(|v| (name, v)))
        .collect::<Result<Map<_, _>, _>>()
        .map(Value::Object)
}

fn unmarshal_attribute(attr: &Value) -> Result<Value, SourceError> {
    let Some((kind, inner)) = attr.as_object().and_then(|o| o.iter().next()) else {
        return Err(SourceError::Decode(format!("not an attribute value: {}", attr)));
    };

    match (kind.as_str(), inner) {
        ("S", Value::String(_)) | ("BOOL", Value::Bool(_)) => Ok(inner.clone()),
        ("NULL", _) => Ok(Value::Null),
        ("N", Value::String(n)) => Ok(number_value(n)),
        ("M", Value::Object(map)) => map
            .iter()
            .map(|(k, v)| unmarshal_attribute(v).map(|v| (k.clone(), v)))
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        ("L", Value::Array(list)) => list
            .iter()
            .map(unmarshal_attribute)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        _ => Err(SourceError::Decode(format!("unsupported attribute value: {}", attr))),
    }
}

/// DynamoDB numbers travel as strings; keep integers exact.
fn number_value(n: &str) -> Value {
    if let Ok(i) = n.parse::<i64>() {
        return json!(i);
    }
    n.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(n.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reading::Reading;

    fn source(limit: Option<u32>) -> DynamoScanSource {
        DynamoScanSource::new(
            "http://localhost:8000/".to_string(),
            "water_tank_sensor".to_string(),
            None,
            limit,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_scan_body() {
        let first = source(None).scan_body(None);
        assert_eq!(first, json!({ "TableName": "water_tank_sensor" }));

        let key = json!({ "sample_time": { "N": "1704096000000" } });
        let next = source(Some(500)).scan_body(Some(ContinuationToken(key.clone())));
        assert_eq!(next["ExclusiveStartKey"], key);
        assert_eq!(next["Limit"], json!(500));
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        assert_eq!(source(None).endpoint, "http://localhost:8000");
    }

    #[test]
    fn test_response_into_page() {
        let body = json!({
            "Count": 1,
            "Items": [{
                "sample_time": { "N": "1704096000000" },
                "device_id": { "S": "tank-1" },
                "device_data": { "M": {
                    "sensor_depth_in": { "N": "42.75" },
                    "battery_ok": { "BOOL": true },
                    "flags": { "L": [{ "NULL": true }] }
                }}
            }],
            "LastEvaluatedKey": { "sample_time": { "N": "1704096000000" } }
        });
        let scan: ScanResponse = serde_json::from_value(body).unwrap();
        let page = scan.into_page().unwrap();

        assert_eq!(
            page.records,
            vec![json!({
                "sample_time": 1_704_096_000_000i64,
                "device_id": "tank-1",
                "device_data": {
                    "sensor_depth_in": 42.75,
                    "battery_ok": true,
                    "flags": [null]
                }
            })]
        );
        assert!(page.next.is_some());
        assert_eq!(Reading::from_record(&page.records[0]).unwrap().depth, 42.75);
    }

    #[test]
    fn test_last_page_has_no_token() {
        let scan: ScanResponse = serde_json::from_value(json!({ "Items": [] })).unwrap();
        let page = scan.into_page().unwrap();
        assert!(page.records.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn test_rejects_unknown_attribute_type() {
        let scan: ScanResponse =
            serde_json::from_value(json!({ "Items": [{ "blob": { "B": "AAEC" } }] })).unwrap();
        assert!(matches!(scan.into_page(), Err(SourceError::Decode(_))));
    }
}
