//! Replayable request descriptions.
//!
//! A `reqwest::Request` with a multipart body cannot be cloned, so the
//! interceptor keeps an [`ApiRequest`] instead and builds a fresh
//! `reqwest::Request` for every attempt.

use reqwest::Method;
use serde::Serialize;

use crate::error::ApiError;

/// A file attached to a multipart form.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone)]
enum FormField {
    Text(String, String),
    File(String, FilePart),
}

/// Multipart body that can be rebuilt any number of times.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    fields: Vec<FormField>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField::Text(name.into(), value.into()));
        self
    }

    pub fn file(mut self, name: impl Into<String>, part: FilePart) -> Self {
        self.fields.push(FormField::File(name.into(), part));
        self
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            FormField::Text(n, v) if n == name => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.fields
            .iter()
            .any(|f| matches!(f, FormField::File(n, _) if n == name))
    }

    pub(crate) fn to_reqwest(&self) -> Result<reqwest::multipart::Form, ApiError> {
        let mut form = reqwest::multipart::Form::new();
        for field in &self.fields {
            form = match field {
                FormField::Text(name, value) => form.text(name.clone(), value.clone()),
                FormField::File(name, part) => {
                    let p = reqwest::multipart::Part::bytes(part.bytes.clone())
                        .file_name(part.file_name.clone())
                        .mime_str(&part.mime)
                        .map_err(|e| {
                            ApiError::InvalidRequest(format!(
                                "invalid mime type '{}': {}",
                                part.mime, e
                            ))
                        })?;
                    form.part(name.clone(), p)
                }
            };
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, with a leading `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// `false` for login/refresh: no bearer header and no refresh-on-401.
    pub authenticated: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            authenticated: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("cannot serialize body: {}", e)))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn without_auth(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_compose() {
        let req = ApiRequest::get("/subgroups/4/subgroups")
            .query("page", 1)
            .query("limit", 100);
        assert_eq!(req.method, Method::GET);
        assert!(req.authenticated);
        assert_eq!(
            req.query,
            vec![("page".to_string(), "1".to_string()), ("limit".to_string(), "100".to_string())]
        );

        let login = ApiRequest::post("/users/login")
            .json(&serde_json::json!({"email": "a@b.c"}))
            .unwrap()
            .without_auth();
        assert!(!login.authenticated);
        assert!(matches!(login.body, RequestBody::Json(_)));
    }

    #[test]
    fn multipart_form_is_rebuildable() {
        let form = MultipartForm::new()
            .text("amount", "1500")
            .file("receipt", FilePart::new("r.pdf", "application/pdf", vec![1, 2, 3]));

        assert_eq!(form.text_value("amount"), Some("1500"));
        assert!(form.has_file("receipt"));
        assert!(!form.has_file("other"));

        // every attempt gets its own reqwest form
        assert!(form.to_reqwest().is_ok());
        assert!(form.to_reqwest().is_ok());
    }

    #[test]
    fn bad_mime_is_reported() {
        let form = MultipartForm::new().file("receipt", FilePart::new("x", "not a mime\n", vec![]));
        assert!(matches!(form.to_reqwest(), Err(ApiError::InvalidRequest(_))));
    }
}
