pub mod asset;
pub mod http;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

pub use asset::{AssetRecord, AttributeMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiRequest {
    pub method: Method,
    /// Path segments below the inventory base URL, e.g. `["Asset", "AB12CD"]`.
    /// Each one is percent-encoded on its own when the URL is built.
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Response as seen by the reconciler. Successful bodies are parsed JSON;
/// failures keep the server's text as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    Ok,
    NotFound,
    BadRequest,
    Other(u16),
}

impl ApiRequest {
    pub fn new(method: Method, segments: &[&str], body: Option<Value>) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| s.to_string()).collect(),
            query: Vec::new(),
            body,
        }
    }

    /// Unencoded path for logs.
    pub fn path(&self) -> String {
        self.segments.join("/")
    }
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn kind(&self) -> ApiStatus {
        match self.status {
            200 => ApiStatus::Ok,
            404 => ApiStatus::NotFound,
            400 => ApiStatus::BadRequest,
            other => ApiStatus::Other(other),
        }
    }

    /// Server message for logs.
    pub fn message(&self) -> String {
        match &self.body {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// One blocking request/response exchange with the inventory service.
pub trait Transport {
    fn send(&self, req: &ApiRequest) -> Result<ApiResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, req: &ApiRequest) -> Result<ApiResponse> {
        (**self).send(req)
    }
}

/// Typed access to the three inventory resources the grader touches.
pub struct InventoryClient<T: Transport> {
    transport: T,
}

impl<T: Transport> InventoryClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn get_asset(&self, uid: &str) -> Result<ApiResponse> {
        self.transport
            .send(&ApiRequest::new(Method::Get, &["Asset", uid], None))
    }

    pub fn put_asset(&self, uid: &str, asset: &Value) -> Result<ApiResponse> {
        self.transport
            .send(&ApiRequest::new(Method::Put, &["Asset", uid], Some(asset.clone())))
    }

    pub fn find_manufacturer(&self, search_phrase: &str) -> Result<ApiResponse> {
        let mut req = ApiRequest::new(Method::Get, &["Manufacturer"], None);
        req.query.push((
            "SearchOptions.SearchPhrase".to_string(),
            search_phrase.to_string(),
        ));
        self.transport.send(&req)
    }

    pub fn create_manufacturer(&self, name: &str) -> Result<ApiResponse> {
        let body = serde_json::json!({
            "description": "This manufacturer was created by asset-grader.",
            "name": name,
        });
        self.transport
            .send(&ApiRequest::new(Method::Post, &["Manufacturer"], Some(body)))
    }

    pub fn create_item_master(&self, item: &Value) -> Result<ApiResponse> {
        self.transport
            .send(&ApiRequest::new(Method::Post, &["ItemMaster"], Some(item.clone())))
    }
}
