//! In-memory `EntityApi` used by the store integration tests.
//!
//! Behaves like the lab-data API closely enough for cache tests: numbered
//! entities get the next free number in their project, antigens are
//! created through `local_antigen` / `uniprot_antigen` and answered with
//! their key only, and plate updates recompute the `functional` flag of
//! the plate's wells.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use antigenapp_client::{ApiRejection, ClientError, EntityApi};
use antigenapp_store::Stores;

pub const CREATION_TIME: &str = "2022-09-01T08:38:16.555199Z";
pub const GENERATED_NAME: &str = "5a0f1822";

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
}

#[derive(Default)]
pub struct FakeApi {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    calls: Mutex<Vec<Call>>,
    rejections: Mutex<HashMap<String, ApiRejection>>,
    hold: AtomicBool,
    /// Notified when a held request has started.
    pub entered: Notify,
    /// Notify once to let one held request finish.
    pub release: Notify,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Project `test` with antigen 1, nanobody 1, plate 1 (threshold 0.5)
    /// and two wells on that plate.
    pub fn seeded() -> Arc<Self> {
        let api = Self::new();
        api.seed("project", project("test"));
        api.seed("project", project("other"));
        api.seed("antigen", antigen("test", 1));
        api.seed("antigen", antigen("other", 1));
        api.seed("nanobody", nanobody("test", 1));
        api.seed("elisa_plate", plate("test", 1, 0.5));
        api.seed("elisa_well", well("test", 1, 1, 0.3, false));
        api.seed("elisa_well", well("test", 1, 2, 0.7, true));
        api
    }

    pub fn seed(&self, endpoint: &str, record: Value) {
        self.tables
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push(record);
    }

    /// Answer every request to `endpoint` with this rejection.
    pub fn reject(&self, endpoint: &str, status: u16, status_text: &str, payload: Option<Value>) {
        self.rejections.lock().unwrap().insert(
            endpoint.to_string(),
            ApiRejection {
                status,
                status_text: status_text.to_string(),
                payload,
            },
        );
    }

    pub fn accept(&self, endpoint: &str) {
        self.rejections.lock().unwrap().remove(endpoint);
    }

    /// While set, list and get requests wait for [`FakeApi::release`].
    pub fn hold_requests(&self, hold: bool) {
        self.hold.store(hold, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `method` requests to `endpoint`, its list query or one of
    /// its resources.
    pub fn count(&self, method: &str, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| {
                call.method == method
                    && (call.path == endpoint
                        || call.path.starts_with(&format!("{endpoint}/"))
                        || call.path.starts_with(&format!("{endpoint}?")))
            })
            .count()
    }

    // ---- private helpers ----

    fn record_call(&self, method: &'static str, path: String) {
        self.calls.lock().unwrap().push(Call { method, path });
    }

    async fn wait_if_held(&self) {
        if self.hold.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }

    fn check_rejection(&self, endpoint: &str) -> Result<(), ClientError> {
        match self.rejections.lock().unwrap().get(endpoint) {
            Some(rejection) => Err(ClientError::Rejected(rejection.clone())),
            None => Ok(()),
        }
    }

    fn next_number(&self, endpoint: &str, project: &Value) -> u64 {
        let tables = self.tables.lock().unwrap();
        tables
            .get(endpoint)
            .map(|rows| {
                rows.iter()
                    .filter(|row| &row["project"] == project)
                    .filter_map(|row| row["number"].as_u64())
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0)
            + 1
    }

    fn plate_threshold(&self, project: &Value, plate: &Value) -> f64 {
        let tables = self.tables.lock().unwrap();
        tables
            .get("elisa_plate")
            .and_then(|rows| {
                rows.iter()
                    .find(|row| &row["project"] == project && &row["number"] == plate)
            })
            .and_then(|row| row["threshold"].as_f64())
            .unwrap_or(0.0)
    }

    fn create_one(&self, endpoint: &str, body: &Value) -> Value {
        let mut record = body.clone();
        match endpoint {
            "nanobody" | "elisa_plate" => {
                let number = self.next_number(endpoint, &body["project"]);
                record["number"] = json!(number);
                record["elisawell_set"] = json!([]);
                record["creation_time"] = json!(CREATION_TIME);
                if endpoint == "nanobody" {
                    record["name"] = json!(format!("nb{number:06}"));
                }
            }
            "elisa_well" => {
                let threshold = self.plate_threshold(&body["project"], &body["plate"]);
                let od = body["optical_density"].as_f64().unwrap_or(0.0);
                record["functional"] = json!(od >= threshold);
            }
            _ => {}
        }
        self.seed(endpoint, record.clone());
        record
    }

    /// Antigen creation: store the full record, answer with the key only.
    fn create_antigen(&self, body: &Value) -> Value {
        let number = self.next_number("antigen", &body["project"]);
        let record = json!({
            "project": body["project"],
            "number": number,
            "name": GENERATED_NAME,
            "sequence": body.get("sequence").cloned().unwrap_or(Value::Null),
            "molecular_mass": body.get("molecular_mass").cloned().unwrap_or(Value::Null),
            "uniprot_accession_number": body
                .get("uniprot_accession_number")
                .cloned()
                .unwrap_or(Value::Null),
            "elisawell_set": [],
            "creation_time": CREATION_TIME,
        });
        self.seed("antigen", record);
        let mut response = body.clone();
        response["number"] = json!(number);
        response
    }
}

pub fn reference_of(endpoint: &str, record: &Value) -> String {
    match endpoint {
        "project" => field_text(&record["short_title"]),
        "elisa_well" => format!(
            "{}:{}:{}",
            field_text(&record["project"]),
            record["plate"],
            record["location"]
        ),
        _ => format!("{}:{}", field_text(&record["project"]), record["number"]),
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn not_found() -> ClientError {
    ClientError::Rejected(ApiRejection {
        status: 404,
        status_text: "Not Found".to_string(),
        payload: Some(json!({ "detail": "Not found." })),
    })
}

#[async_trait]
impl EntityApi for FakeApi {
    async fn list(&self, endpoint: &str, query: &[(String, String)]) -> Result<Value, ClientError> {
        let rendered: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        self.record_call("GET", format!("{endpoint}?{}", rendered.join("&")));
        self.wait_if_held().await;
        self.check_rejection(endpoint)?;

        let tables = self.tables.lock().unwrap();
        let rows = tables.get(endpoint).cloned().unwrap_or_default();
        let matching: Vec<Value> = rows
            .into_iter()
            .filter(|row| {
                query
                    .iter()
                    .filter(|(name, _)| name != "format")
                    .all(|(name, value)| field_text(&row[name.as_str()]) == *value)
            })
            .collect();
        Ok(Value::Array(matching))
    }

    async fn get(&self, endpoint: &str, reference: &str) -> Result<Value, ClientError> {
        self.record_call("GET", format!("{endpoint}/{reference}"));
        self.wait_if_held().await;
        self.check_rejection(endpoint)?;

        let tables = self.tables.lock().unwrap();
        tables
            .get(endpoint)
            .and_then(|rows| {
                rows.iter()
                    .find(|row| reference_of(endpoint, row) == reference)
                    .cloned()
            })
            .ok_or_else(not_found)
    }

    async fn create(&self, endpoint: &str, body: &Value) -> Result<Value, ClientError> {
        self.record_call("POST", endpoint.to_string());
        self.check_rejection(endpoint)?;

        match (endpoint, body) {
            ("local_antigen" | "uniprot_antigen", _) => Ok(self.create_antigen(body)),
            (_, Value::Array(items)) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| self.create_one(endpoint, item))
                    .collect(),
            )),
            _ => Ok(self.create_one(endpoint, body)),
        }
    }

    async fn update(
        &self,
        endpoint: &str,
        reference: &str,
        body: &Value,
    ) -> Result<Value, ClientError> {
        self.record_call("PUT", format!("{endpoint}/{reference}"));
        self.check_rejection(endpoint)?;

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.get_mut(endpoint).ok_or_else(not_found)?;
        let row = rows
            .iter_mut()
            .find(|row| reference_of(endpoint, row) == reference)
            .ok_or_else(not_found)?;
        if let (Value::Object(target), Value::Object(fields)) = (&mut *row, body) {
            for (name, value) in fields {
                target.insert(name.clone(), value.clone());
            }
        }
        let updated = row.clone();

        if endpoint == "elisa_plate" {
            let threshold = updated["threshold"].as_f64().unwrap_or(0.0);
            if let Some(wells) = tables.get_mut("elisa_well") {
                for well in wells.iter_mut().filter(|well| {
                    well["project"] == updated["project"] && well["plate"] == updated["number"]
                }) {
                    let od = well["optical_density"].as_f64().unwrap_or(0.0);
                    well["functional"] = json!(od >= threshold);
                }
            }
        }
        Ok(updated)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn stores(api: &Arc<FakeApi>) -> Stores {
    let api: Arc<dyn EntityApi> = api.clone();
    Stores::new(api)
}

pub fn project(short_title: &str) -> Value {
    json!({ "short_title": short_title, "title": short_title, "description": short_title })
}

pub fn antigen(project: &str, number: u32) -> Value {
    json!({
        "project": project,
        "number": number,
        "name": GENERATED_NAME,
        "sequence": "AAAAAAAAAAAA",
        "molecular_mass": 1,
        "uniprot_accession_number": null,
        "elisawell_set": [],
        "creation_time": "2022-09-06T12:18:41.090398Z",
    })
}

pub fn nanobody(project: &str, number: u32) -> Value {
    json!({
        "project": project,
        "number": number,
        "name": format!("nb{number:06}"),
        "elisawell_set": [],
        "creation_time": CREATION_TIME,
    })
}

pub fn plate(project: &str, number: u32, threshold: f64) -> Value {
    json!({
        "project": project,
        "number": number,
        "threshold": threshold,
        "elisawell_set": [],
        "creation_time": CREATION_TIME,
    })
}

pub fn well(project: &str, plate: u32, location: u32, optical_density: f64, functional: bool) -> Value {
    json!({
        "project": project,
        "plate": plate,
        "location": location,
        "antigen": 1,
        "nanobody": 1,
        "optical_density": optical_density,
        "functional": functional,
    })
}
