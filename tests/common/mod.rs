#![allow(dead_code)]

use anyhow::{Result, anyhow};
use asset_grader::config::Config;
use asset_grader::grade::{DefectBank, DefectRule};
use asset_grader::remote::{ApiRequest, ApiResponse, Transport};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

/// Replays canned responses keyed by `"METHOD path"` and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<HashMap<String, VecDeque<Result<ApiResponse, String>>>>,
    pub requests: RefCell<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, method: &str, path: &str, status: u16, body: Value) -> Self {
        self.responses
            .borrow_mut()
            .entry(format!("{method} {path}"))
            .or_default()
            .push_back(Ok(ApiResponse::new(status, body)));
        self
    }

    pub fn fail(self, method: &str, path: &str, message: &str) -> Self {
        self.responses
            .borrow_mut()
            .entry(format!("{method} {path}"))
            .or_default()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn sent(&self, method: &str, path: &str) -> Vec<ApiRequest> {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.method.as_str() == method && r.path() == path)
            .cloned()
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, req: &ApiRequest) -> Result<ApiResponse> {
        self.requests.borrow_mut().push(req.clone());
        let key = format!("{} {}", req.method.as_str(), req.path());
        match self
            .responses
            .borrow_mut()
            .get_mut(&key)
            .and_then(|q| q.pop_front())
        {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(msg)) => Err(anyhow!(msg)),
            None => Err(anyhow!("no scripted response for {key}")),
        }
    }
}

pub fn bank() -> DefectBank {
    DefectBank {
        cosmetic: vec![
            DefectRule {
                defect: "Scratched lid".into(),
                weight: 0.15,
            },
            DefectRule {
                defect: "Cracked bezel".into(),
                weight: 0.5,
            },
        ],
        functional: vec![DefectRule {
            defect: "Dead pixels".into(),
            weight: 0.2,
        }],
    }
}

pub fn config() -> Config {
    let mut cfg = Config::default();
    cfg.remote.base_url = "https://inventory.test/api".into();
    cfg
}

/// Remote asset body with the given attribute list.
pub fn asset(manufacturer: &str, model: &str, attributes: Value) -> Value {
    json!({
        "id": 4411,
        "uid": "AB12CD",
        "manufacturer": manufacturer,
        "model": model,
        "location": "Bay 3",
        "attributes": attributes,
    })
}

/// Attributes of a pushed asset body as `(typeName, value)` pairs.
pub fn pushed_attributes(req: &ApiRequest) -> Vec<(String, Value)> {
    req.body
        .as_ref()
        .and_then(|b| b.get("attributes"))
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .map(|a| {
                    (
                        a["typeName"].as_str().unwrap_or_default().to_string(),
                        a["value"].clone(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn attribute(req: &ApiRequest, name: &str) -> Option<Value> {
    pushed_attributes(req)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
}
