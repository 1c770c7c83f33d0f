use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::event::Event;
use crate::model::{ImageFile, ImageId, ItemId, SearchFilters};
use crate::session::Session;
use crate::{server_message, AppError, ErrorKind};

use super::AppHttp;

pub const MAX_REQUEST_BODY_SIZE: usize = 50 * 1024 * 1024;
pub const UPLOAD_FIELD_NAME: &str = "images";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn has_request_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Json,
    Multipart { boundary: String },
}

impl ContentType {
    pub fn header_value(&self) -> String {
        match self {
            ContentType::Json => "application/json".to_string(),
            ContentType::Multipart { boundary } => {
                format!("multipart/form-data; boundary={boundary}")
            }
        }
    }
}

/// Every backend call the client makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiOperation {
    SearchItems,
    ItemDetail,
    MyItems,
    CreateItem,
    UpdateItem,
    DeleteItem,
    UploadImages,
    AttachImages,
    DeleteImage,
    SignIn,
    SignUp,
}

impl ApiOperation {
    pub fn method(self) -> HttpMethod {
        match self {
            Self::SearchItems | Self::ItemDetail | Self::MyItems => HttpMethod::Get,
            Self::CreateItem | Self::UploadImages | Self::AttachImages => HttpMethod::Post,
            Self::SignIn | Self::SignUp => HttpMethod::Post,
            Self::UpdateItem => HttpMethod::Put,
            Self::DeleteItem | Self::DeleteImage => HttpMethod::Delete,
        }
    }

    pub fn requires_auth(self) -> bool {
        !matches!(self, Self::SearchItems | Self::SignIn | Self::SignUp)
    }

    /// Mutations only count as done when the reply carries `status: true`.
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Self::CreateItem
                | Self::UpdateItem
                | Self::DeleteItem
                | Self::UploadImages
                | Self::AttachImages
                | Self::DeleteImage
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SearchItems => "search_items",
            Self::ItemDetail => "item_detail",
            Self::MyItems => "my_items",
            Self::CreateItem => "create_item",
            Self::UpdateItem => "update_item",
            Self::DeleteItem => "delete_item",
            Self::UploadImages => "upload_images",
            Self::AttachImages => "attach_images",
            Self::DeleteImage => "delete_image",
            Self::SignIn => "sign_in",
            Self::SignUp => "sign_up",
        }
    }

    fn fallback_message(self) -> &'static str {
        match self {
            Self::SearchItems => "Failed to load items",
            Self::ItemDetail => "Failed to load item details",
            Self::MyItems => "Failed to load your items",
            Self::CreateItem => "Failed to create item",
            Self::UpdateItem => "Failed to update item",
            Self::DeleteItem => "Failed to delete item",
            Self::UploadImages => "Failed to upload images",
            Self::AttachImages => "Failed to add images to item",
            Self::DeleteImage => "Failed to delete image",
            Self::SignIn => "Invalid email or password",
            Self::SignUp => "Registration failed",
        }
    }

    fn forbidden_message(self) -> &'static str {
        match self {
            Self::UpdateItem => "Forbidden: You can only update items that you own",
            Self::DeleteItem => "Forbidden: You can only delete items that you own",
            Self::AttachImages | Self::UploadImages => {
                "Forbidden: You can only add images to items that you own"
            }
            Self::DeleteImage => "Forbidden: You can only delete images from items that you own",
            _ => "Forbidden: You do not have access to this resource",
        }
    }

    fn not_found_message(self) -> &'static str {
        match self {
            Self::DeleteImage => "Image not found",
            _ => "Item not found",
        }
    }

    /// Map a failed reply onto the error taxonomy with a message written for
    /// this operation.
    pub fn classify(self, status: u16, body: &[u8]) -> AppError {
        let server = server_message(body);
        let base = AppError::from_http_status(status, Some(body));
        let message = match base.kind {
            ErrorKind::Authentication => match self {
                Self::SignIn => server.unwrap_or_else(|| self.fallback_message().to_string()),
                _ => "Unauthorized: Please log in again".to_string(),
            },
            ErrorKind::Authorization => self.forbidden_message().to_string(),
            ErrorKind::NotFound => self.not_found_message().to_string(),
            ErrorKind::Validation => match server {
                Some(msg) => format!("Invalid data: {msg}"),
                None => format!("Invalid data: {}", self.fallback_message()),
            },
            _ => server.unwrap_or_else(|| self.fallback_message().to_string()),
        };

        AppError {
            message,
            ..base
        }
        .with_context("operation", self.name())
    }
}

/// Raw transport result handed back to the core.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiReply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, value: &Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for ApiReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiReply")
            .field("status", &self.status)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// `Err` means the request never produced an HTTP status.
pub type ApiOutcome = Result<ApiReply, AppError>;

/// A 2xx reply whose envelope was accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct Acknowledged {
    pub message: Option<String>,
    pub data: Value,
    pub root: Value,
}

/// Check status, parse JSON, and honor the `{status, message, data}`
/// envelope. Mutations without an explicit `status: true` are failures.
pub fn acknowledge(operation: ApiOperation, outcome: ApiOutcome) -> Result<Acknowledged, AppError> {
    let reply = outcome?;

    if !reply.is_success() {
        let err = operation.classify(reply.status, &reply.body);
        warn!(
            operation = operation.name(),
            status = reply.status,
            code = err.code(),
            "request rejected"
        );
        return Err(err);
    }

    let root: Value = serde_json::from_slice(&reply.body).map_err(|e| {
        AppError::new(ErrorKind::Deserialization, operation.fallback_message())
            .with_internal(e.to_string())
            .with_context("operation", operation.name())
    })?;

    let flag = root.get("status").and_then(Value::as_bool);
    let message = root
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string);

    let accepted = match flag {
        Some(flag) => flag,
        None => !operation.is_mutation(),
    };

    if !accepted {
        let text = message
            .clone()
            .unwrap_or_else(|| operation.fallback_message().to_string());
        debug!(operation = operation.name(), "server reported failure");
        return Err(AppError::new(ErrorKind::ServerLogic, text)
            .with_context("operation", operation.name()));
    }

    let data = root.get("data").cloned().unwrap_or(Value::Null);
    Ok(Acknowledged {
        message,
        data,
        root,
    })
}

/// The single record inside a detail reply. `data` may wrap the record once
/// more; anything that is not an object is malformed.
pub fn extract_record(ack: &Acknowledged) -> Option<&Value> {
    let mut current = &ack.data;
    for _ in 0..2 {
        match current.get("data") {
            Some(inner) if inner.is_object() => current = inner,
            _ => break,
        }
    }
    current.is_object().then_some(current)
}

/// List payload: `data` as an array, `data.data` as an array, or a bare
/// top-level array.
pub fn extract_list(ack: &Acknowledged) -> Option<&Value> {
    if ack.data.is_array() {
        return Some(&ack.data);
    }
    if let Some(inner) = ack.data.get("data").filter(|v| v.is_array()) {
        return Some(inner);
    }
    ack.root.is_array().then_some(&ack.root)
}

pub fn decode<T: serde::de::DeserializeOwned>(
    operation: ApiOperation,
    value: &Value,
) -> Result<T, AppError> {
    T::deserialize(value).map_err(|e| {
        AppError::new(ErrorKind::Deserialization, operation.fallback_message())
            .with_internal(e.to_string())
            .with_context("operation", operation.name())
    })
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("{operation} needs a signed-in session")]
    Unauthenticated { operation: &'static str },

    #[error("request body too large: {size} bytes exceeds maximum of {max} bytes")]
    BodyTooLarge { size: usize, max: usize },

    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl From<RequestError> for AppError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Unauthenticated { .. } => {
                AppError::new(ErrorKind::Authentication, "Please sign in to continue.")
                    .with_internal(err.to_string())
            }
            RequestError::BodyTooLarge { .. } => {
                AppError::new(ErrorKind::Validation, "The selected images are too large.")
                    .with_internal(err.to_string())
            }
            RequestError::Serialization { .. } => {
                AppError::new(ErrorKind::Internal, err.to_string())
            }
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct RequestBody {
    pub content_type: ContentType,
    pub bytes: Vec<u8>,
}

/// An outgoing backend call, fully resolved against the base URL.
#[derive(Clone)]
pub struct ApiRequest {
    pub operation: ApiOperation,
    pub method: HttpMethod,
    pub url: String,
    authorization: Option<String>,
    pub body: Option<RequestBody>,
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("operation", &self.operation)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("authorized", &self.authorization.is_some())
            .field("body_len", &self.body.as_ref().map(|b| b.bytes.len()))
            .finish()
    }
}

impl ApiRequest {
    fn new(operation: ApiOperation, url: url::Url) -> Self {
        Self {
            operation,
            method: operation.method(),
            url: url.to_string(),
            authorization: None,
            body: None,
        }
    }

    pub fn search(config: &ApiConfig, filters: &SearchFilters) -> Self {
        let mut url = config.endpoint(&["items", "search"]);
        let pairs = filters.query_pairs();
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }
        Self::new(ApiOperation::SearchItems, url)
    }

    pub fn item_detail(config: &ApiConfig, id: ItemId) -> Self {
        Self::new(
            ApiOperation::ItemDetail,
            config.endpoint(&["items", &id.to_string()]),
        )
    }

    pub fn my_items(config: &ApiConfig) -> Self {
        Self::new(ApiOperation::MyItems, config.endpoint(&["items", "my-items"]))
    }

    pub fn create_item(config: &ApiConfig) -> Self {
        Self::new(ApiOperation::CreateItem, config.endpoint(&["items", "create"]))
    }

    pub fn update_item(config: &ApiConfig, id: ItemId) -> Self {
        Self::new(
            ApiOperation::UpdateItem,
            config.endpoint(&["items", "update", &id.to_string()]),
        )
    }

    pub fn delete_item(config: &ApiConfig, id: ItemId) -> Self {
        Self::new(
            ApiOperation::DeleteItem,
            config.endpoint(&["items", &id.to_string()]),
        )
    }

    pub fn upload_images(config: &ApiConfig) -> Self {
        Self::new(
            ApiOperation::UploadImages,
            config.endpoint(&["items", "upload"]),
        )
    }

    pub fn attach_images(config: &ApiConfig) -> Self {
        Self::new(
            ApiOperation::AttachImages,
            config.endpoint(&["items", "add-images"]),
        )
    }

    pub fn delete_image(config: &ApiConfig, id: ImageId) -> Self {
        Self::new(
            ApiOperation::DeleteImage,
            config.endpoint(&["items", "images", &id.to_string()]),
        )
    }

    pub fn sign_in(config: &ApiConfig) -> Self {
        Self::new(ApiOperation::SignIn, config.endpoint(&["auth", "login"]))
    }

    pub fn sign_up(config: &ApiConfig) -> Self {
        Self::new(ApiOperation::SignUp, config.endpoint(&["auth", "register"]))
    }

    /// Attach the bearer token. Fails for protected operations when no
    /// session exists, so no unauthenticated request is ever emitted.
    pub fn authorized(mut self, session: &Session) -> Result<Self, RequestError> {
        match session.bearer() {
            Some(header) => {
                self.authorization = Some(header);
                Ok(self)
            }
            None if self.operation.requires_auth() => Err(RequestError::Unauthenticated {
                operation: self.operation.name(),
            }),
            None => Ok(self),
        }
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, RequestError> {
        let bytes = serde_json::to_vec(value).map_err(|e| RequestError::Serialization {
            message: e.to_string(),
        })?;
        self.body = Some(RequestBody {
            content_type: ContentType::Json,
            bytes,
        });
        Ok(self)
    }

    pub fn with_multipart(mut self, form: Multipart) -> Result<Self, RequestError> {
        let body = form.finish();
        if body.bytes.len() > MAX_REQUEST_BODY_SIZE {
            return Err(RequestError::BodyTooLarge {
                size: body.bytes.len(),
                max: MAX_REQUEST_BODY_SIZE,
            });
        }
        self.body = Some(body);
        Ok(self)
    }

    pub fn header_value(&self, name: &str) -> Option<String> {
        if name.eq_ignore_ascii_case("authorization") {
            return self.authorization.clone();
        }
        if name.eq_ignore_ascii_case("content-type") {
            return self.body.as_ref().map(|b| b.content_type.header_value());
        }
        None
    }

    /// Hand the request to the shell. `make_event` receives the transport
    /// outcome converted into an [`ApiOutcome`].
    pub fn send<F>(self, http: &AppHttp, make_event: F)
    where
        F: FnOnce(ApiOutcome) -> Event + Send + 'static,
    {
        debug!(
            operation = self.operation.name(),
            method = self.method.as_str(),
            url = %self.url,
            "dispatching request"
        );

        let mut builder = match self.method {
            HttpMethod::Get => http.get(&self.url),
            HttpMethod::Post => http.post(&self.url),
            HttpMethod::Put => http.put(&self.url),
            HttpMethod::Delete => http.delete(&self.url),
        }
        .header("Accept", "application/json");

        if let Some(authorization) = &self.authorization {
            builder = builder.header("Authorization", authorization.as_str());
        }

        if let Some(RequestBody {
            content_type,
            bytes,
        }) = self.body
        {
            builder = builder
                .header("Content-Type", content_type.header_value().as_str())
                .body_bytes(bytes);
        }

        builder.send(move |result| make_event(into_outcome(result)));
    }
}

fn into_outcome(result: crux_http::Result<crux_http::Response<Vec<u8>>>) -> ApiOutcome {
    match result {
        Ok(mut response) => {
            let status = u16::from(response.status());
            let body = response.take_body().unwrap_or_default();
            Ok(ApiReply { status, body })
        }
        // 4xx and 5xx arrive as errors; keep the server's body so its
        // message reaches the user.
        Err(crux_http::Error::Http(e)) => {
            Ok(ApiReply::new(u16::from(e.code), e.body.unwrap_or_default()))
        }
        Err(e) => Err(AppError::new(ErrorKind::Network, "Network error")
            .with_internal(e.to_string())),
    }
}

/// `multipart/form-data` body with a random boundary.
#[derive(Debug, Clone)]
pub struct Multipart {
    boundary: String,
    body: Vec<u8>,
}

impl Default for Multipart {
    fn default() -> Self {
        Self::new()
    }
}

impl Multipart {
    pub fn new() -> Self {
        Self {
            boundary: format!("----unifind-{}", Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn add_file(mut self, field: &str, file: &ImageFile) -> Self {
        let file_name = file.file_name.replace('"', "");
        let content_type = if file.content_type.trim().is_empty() {
            "application/octet-stream"
        } else {
            file.content_type.as_str()
        };
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        self.body
            .extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        self.body.extend_from_slice(&file.bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn images(files: &[ImageFile]) -> Self {
        files
            .iter()
            .fold(Self::new(), |form, file| form.add_file(UPLOAD_FIELD_NAME, file))
    }

    pub fn finish(mut self) -> RequestBody {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        RequestBody {
            content_type: ContentType::Multipart {
                boundary: self.boundary,
            },
            bytes: self.body,
        }
    }
}
