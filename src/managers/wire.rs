//! Wire DTO shared by the `storage-disk` and `storage-moka` backends.
//!
//! `CacheEntry` doesn't derive `Serialize`/`Deserialize` itself (`Resource`
//! is a reference-counted handle, not a value type), so each durable
//! backend converts through this struct instead, the same split the
//! teacher's managers draw between their wire `Store` and `HttpResponse`.

use std::time::SystemTime;

use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::entry::CacheEntry;
use crate::error::Result;
use crate::headers::{format_http_date, parse_http_date};
use crate::resource::ResourceFactory;

#[derive(Debug, Deserialize, Serialize)]
pub(super) struct StoredEntry {
    request_method: String,
    request_uri: String,
    status: u16,
    response_headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    request_date: String,
    response_date: String,
    vary_fields: Vec<String>,
    variant_map: Vec<(String, String)>,
}

impl StoredEntry {
    pub(super) fn from_entry(entry: &CacheEntry) -> Result<Self> {
        let body = match &entry.resource {
            Some(r) => Some(r.read_to_bytes()?.to_vec()),
            None => None,
        };
        Ok(Self {
            request_method: entry.request_method.as_str().to_string(),
            request_uri: entry.request_uri.clone(),
            status: entry.status.as_u16(),
            response_headers: entry.response_headers.clone(),
            body,
            request_date: format_http_date(entry.request_date),
            response_date: format_http_date(entry.response_date),
            vary_fields: entry.vary_fields.iter().map(|s| s.to_string()).collect(),
            variant_map: entry.variant_map.clone(),
        })
    }

    pub(super) fn into_entry(self, factory: &dyn ResourceFactory, key: &str) -> Result<CacheEntry> {
        let resource = match self.body {
            Some(bytes) => Some(factory.create(key, &bytes, u64::MAX)?),
            None => None,
        };
        Ok(CacheEntry {
            request_method: Method::from_bytes(self.request_method.as_bytes())?,
            request_uri: self.request_uri,
            status: StatusCode::from_u16(self.status)?,
            response_headers: self.response_headers,
            resource,
            request_date: parse_http_date(&self.request_date).unwrap_or_else(SystemTime::now),
            response_date: parse_http_date(&self.response_date).unwrap_or_else(SystemTime::now),
            vary_fields: self.vary_fields.into_iter().map(String::into_boxed_str).collect(),
            variant_map: self.variant_map,
        })
    }
}
