//! Compiled request validator.

use std::collections::HashMap;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonschema::{draft202012, Validator};
use serde_json::{json, Value};

const OPERATION_KEYS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch", "trace"];

fn operation_method(key: &str) -> Option<Method> {
    match key {
        "get" => Some(Method::GET),
        "put" => Some(Method::PUT),
        "post" => Some(Method::POST),
        "delete" => Some(Method::DELETE),
        "options" => Some(Method::OPTIONS),
        "head" => Some(Method::HEAD),
        "patch" => Some(Method::PATCH),
        "trace" => Some(Method::TRACE),
        _ => None,
    }
}

/// The API document could not be compiled.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("API document is invalid: {0}")]
    InvalidDocument(String),

    #[error("schema at {location} is invalid: {message}")]
    InvalidSchema { location: String, message: String },

    #[error("schema compilation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A request that does not conform to the API document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestRejection {
    #[error("not found")]
    NotFound,

    #[error("{method} method not allowed")]
    MethodNotAllowed { method: Method, allowed: Vec<Method> },

    #[error("request parameters are invalid")]
    InvalidParameters(Vec<String>),

    #[error("request body is required")]
    MissingBody,

    #[error("request body is invalid")]
    InvalidBody(Vec<String>),

    #[error("unsupported media type {0:?}, expected application/json")]
    UnsupportedMediaType(String),
}

impl RequestRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestRejection::NotFound => StatusCode::NOT_FOUND,
            RequestRejection::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RequestRejection::InvalidParameters(_)
            | RequestRejection::MissingBody
            | RequestRejection::InvalidBody(_) => StatusCode::BAD_REQUEST,
            RequestRejection::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }

    /// Individual violations behind this rejection.
    pub fn errors(&self) -> &[String] {
        match self {
            RequestRejection::InvalidParameters(errors) | RequestRejection::InvalidBody(errors) => {
                errors
            }
            _ => &[],
        }
    }
}

impl IntoResponse for RequestRejection {
    fn into_response(self) -> Response {
        let body = json!({ "message": self.to_string(), "errors": self.errors() });
        let mut response = (self.status(), Json(body)).into_response();
        if let RequestRejection::MethodNotAllowed { allowed, .. } = &self {
            let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }
        response
    }
}

/// What the validator needs to know about a request.
#[derive(Debug, Clone, Copy)]
pub struct RequestView<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: &'a HashMap<String, String>,
    /// Parsed JSON body, when the request carried one.
    pub json_body: Option<&'a Value>,
    pub content_type: Option<&'a str>,
    /// Whether the request carried a non-empty body of any type.
    pub has_body: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    fn parse(raw: &str) -> Self {
        let segments = raw
            .trim_start_matches('/')
            .split('/')
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Path parameters captured from `path`, or `None` if it does not match.
    fn captures<'p>(&self, path: &'p str) -> Option<HashMap<&str, &'p str>> {
        let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => {
                    params.insert(name.as_str(), part);
                }
            }
        }
        Some(params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Path,
    Query,
}

struct ParameterRule {
    name: String,
    location: Location,
    required: bool,
    schema: Option<Value>,
    validator: Option<Validator>,
}

struct BodyRule {
    required: bool,
    validator: Option<Validator>,
}

struct Operation {
    method: Method,
    parameters: Vec<ParameterRule>,
    body: Option<BodyRule>,
}

struct PathEntry {
    template: PathTemplate,
    operations: Vec<Operation>,
}

/// Request validator compiled from an OpenAPI 3.1 document.
pub struct RequestValidator {
    paths: Vec<PathEntry>,
}

impl std::fmt::Debug for RequestValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestValidator")
            .field("paths", &self.templates())
            .finish()
    }
}

impl RequestValidator {
    /// Compile `document` on a blocking task.
    pub async fn install(document: Value) -> Result<Self, SchemaError> {
        let validator = tokio::task::spawn_blocking(move || Self::compile(&document)).await??;
        tracing::info!(
            paths = validator.paths.len(),
            "Request validation enabled, response validation disabled"
        );
        Ok(validator)
    }

    /// Compile `document` synchronously.
    pub fn compile(document: &Value) -> Result<Self, SchemaError> {
        let paths = document
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| SchemaError::InvalidDocument("missing \"paths\" object".into()))?;
        let components = document.get("components");

        let mut entries = Vec::with_capacity(paths.len());
        for (raw, item) in paths {
            let item = item.as_object().ok_or_else(|| {
                SchemaError::InvalidDocument(format!("path item {raw:?} is not an object"))
            })?;
            let shared = item.get("parameters");

            let mut operations = Vec::new();
            for key in OPERATION_KEYS {
                let (Some(op), Some(method)) = (item.get(*key), operation_method(key)) else {
                    continue;
                };
                let location = format!("{key} {raw}");
                operations.push(Operation {
                    method,
                    parameters: compile_parameters(document, components, shared, op.get("parameters"), &location)?,
                    body: compile_body(document, components, op.get("requestBody"), &location)?,
                });
            }

            entries.push(PathEntry {
                template: PathTemplate::parse(raw),
                operations,
            });
        }

        // Literal segments beat parameters when templates overlap.
        entries.sort_by_key(|e| std::cmp::Reverse(e.template.literal_count()));
        Ok(Self { paths: entries })
    }

    /// Declared path templates, most specific first.
    pub fn templates(&self) -> Vec<&str> {
        self.paths.iter().map(|e| e.template.raw.as_str()).collect()
    }

    /// Check one request against the document.
    pub fn validate(&self, request: &RequestView<'_>) -> Result<(), RequestRejection> {
        let (entry, captures) = self
            .paths
            .iter()
            .find_map(|e| e.template.captures(request.path).map(|c| (e, c)))
            .ok_or(RequestRejection::NotFound)?;

        let operation = entry
            .operations
            .iter()
            .find(|op| &op.method == request.method)
            .ok_or_else(|| RequestRejection::MethodNotAllowed {
                method: request.method.clone(),
                allowed: entry.operations.iter().map(|op| op.method.clone()).collect(),
            })?;

        let mut errors = Vec::new();
        for rule in &operation.parameters {
            let raw = match rule.location {
                Location::Path => captures.get(rule.name.as_str()).copied(),
                Location::Query => request.query.get(&rule.name).map(String::as_str),
            };
            let Some(raw) = raw else {
                if rule.required {
                    errors.push(format!("{} parameter {:?} is required", rule.location_name(), rule.name));
                }
                continue;
            };
            if let Some(validator) = &rule.validator {
                let value = coerce(raw, rule.schema.as_ref());
                errors.extend(validator.iter_errors(&value).map(|e| {
                    format!("{} parameter {:?}: {}", rule.location_name(), rule.name, e)
                }));
            }
        }
        if !errors.is_empty() {
            return Err(RequestRejection::InvalidParameters(errors));
        }

        let Some(body) = &operation.body else {
            return Ok(());
        };
        match request.json_body {
            Some(value) => {
                if let Some(validator) = &body.validator {
                    let errors: Vec<String> = validator.iter_errors(value).map(|e| e.to_string()).collect();
                    if !errors.is_empty() {
                        return Err(RequestRejection::InvalidBody(errors));
                    }
                }
                Ok(())
            }
            // An empty JSON body reaches here without a parsed value.
            None if request.has_body && !request.content_type.is_some_and(is_json_media_type) => {
                Err(RequestRejection::UnsupportedMediaType(
                    request.content_type.unwrap_or("none").to_string(),
                ))
            }
            None if body.required => Err(RequestRejection::MissingBody),
            None => Ok(()),
        }
    }
}

impl ParameterRule {
    fn location_name(&self) -> &'static str {
        match self.location {
            Location::Path => "path",
            Location::Query => "query",
        }
    }
}

/// Follow a local `$ref` (`#/components/...`) inside the document.
fn resolve<'a>(document: &'a Value, value: &'a Value) -> Result<&'a Value, SchemaError> {
    match value.get("$ref").and_then(Value::as_str) {
        Some(reference) => {
            let pointer = reference.strip_prefix('#').ok_or_else(|| {
                SchemaError::InvalidDocument(format!("only local references are supported: {reference}"))
            })?;
            document
                .pointer(pointer)
                .ok_or_else(|| SchemaError::InvalidDocument(format!("unresolved reference {reference}")))
        }
        None => Ok(value),
    }
}

fn compile_schema(schema: &Value, components: Option<&Value>, location: &str) -> Result<Validator, SchemaError> {
    // Component references resolve against the schema's own root.
    let mut root = schema.clone();
    if let (Value::Object(map), Some(components)) = (&mut root, components) {
        map.entry("components").or_insert_with(|| components.clone());
    }
    draft202012::new(&root).map_err(|e| SchemaError::InvalidSchema {
        location: location.to_string(),
        message: e.to_string(),
    })
}

fn compile_parameters(
    document: &Value,
    components: Option<&Value>,
    shared: Option<&Value>,
    own: Option<&Value>,
    location: &str,
) -> Result<Vec<ParameterRule>, SchemaError> {
    let mut rules: Vec<ParameterRule> = Vec::new();
    let declared = shared
        .and_then(Value::as_array)
        .into_iter()
        .chain(own.and_then(Value::as_array))
        .flatten();

    for param in declared {
        let param = resolve(document, param)?;
        let name = param.get("name").and_then(Value::as_str).ok_or_else(|| {
            SchemaError::InvalidDocument(format!("parameter without a name in {location}"))
        })?;
        let location_kind = match param.get("in").and_then(Value::as_str) {
            Some("path") => Location::Path,
            Some("query") => Location::Query,
            // Header and cookie parameters are not checked.
            _ => continue,
        };
        let required = location_kind == Location::Path
            || param.get("required").and_then(Value::as_bool).unwrap_or(false);
        let schema = param.get("schema").cloned();
        let validator = match &schema {
            Some(schema) => Some(compile_schema(schema, components, &format!("{location} parameter {name}"))?),
            None => None,
        };

        // Operation-level parameters override path-level ones.
        rules.retain(|r| !(r.name == name && r.location == location_kind));
        rules.push(ParameterRule {
            name: name.to_string(),
            location: location_kind,
            required,
            schema,
            validator,
        });
    }
    Ok(rules)
}

fn compile_body(
    document: &Value,
    components: Option<&Value>,
    request_body: Option<&Value>,
    location: &str,
) -> Result<Option<BodyRule>, SchemaError> {
    let Some(request_body) = request_body else {
        return Ok(None);
    };
    let request_body = resolve(document, request_body)?;
    let required = request_body.get("required").and_then(Value::as_bool).unwrap_or(false);

    let json_media = request_body
        .get("content")
        .and_then(Value::as_object)
        .and_then(|content| {
            content
                .iter()
                .find(|(media, _)| is_json_media_type(media))
                .map(|(_, media)| media)
        });
    let Some(media) = json_media else {
        return Ok(None);
    };

    let validator = match media.get("schema") {
        Some(schema) => Some(compile_schema(schema, components, &format!("{location} requestBody"))?),
        None => None,
    };
    Ok(Some(BodyRule { required, validator }))
}

/// `application/json` or any `+json` media type.
pub fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Interpret a raw path or query value according to its schema's type.
fn coerce(raw: &str, schema: Option<&Value>) -> Value {
    let types: Vec<&str> = match schema.and_then(|s| s.get("type")) {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    for t in types {
        match t {
            "integer" => {
                if let Ok(n) = raw.parse::<i64>() {
                    return json!(n);
                }
            }
            "number" => {
                if let Some(n) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                    return Value::Number(n);
                }
            }
            "boolean" => match raw {
                "true" => return Value::Bool(true),
                "false" => return Value::Bool(false),
                _ => {}
            },
            _ => {}
        }
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> Value {
        json!({
            "openapi": "3.1.0",
            "paths": {
                "/items": {
                    "get": {
                        "parameters": [
                            { "name": "limit", "in": "query", "schema": { "type": "integer", "minimum": 1 } },
                            { "name": "cursor", "in": "query", "required": true, "schema": { "type": "string" } }
                        ]
                    },
                    "post": {
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": { "schema": { "$ref": "#/components/schemas/Item" } }
                            }
                        }
                    }
                },
                "/items/{itemId}": {
                    "get": {
                        "parameters": [
                            { "name": "itemId", "in": "path", "required": true, "schema": { "type": "integer" } }
                        ]
                    }
                },
                "/items/latest": { "get": {} },
                "/notes": {
                    "put": {
                        "requestBody": {
                            "content": { "application/json": { "schema": { "type": "object" } } }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Item": {
                        "type": "object",
                        "required": ["name"],
                        "additionalProperties": false,
                        "properties": { "name": { "type": "string", "minLength": 1 } }
                    }
                }
            }
        })
    }

    struct Req {
        method: Method,
        path: &'static str,
        query: HashMap<String, String>,
        body: Option<Value>,
        content_type: Option<&'static str>,
        has_body: bool,
    }

    impl Req {
        fn new(method: Method, path: &'static str) -> Self {
            Self {
                method,
                path,
                query: HashMap::new(),
                body: None,
                content_type: None,
                has_body: false,
            }
        }

        fn query(mut self, k: &str, v: &str) -> Self {
            self.query.insert(k.into(), v.into());
            self
        }

        fn json(mut self, body: Value) -> Self {
            self.body = Some(body);
            self.content_type = Some("application/json");
            self.has_body = true;
            self
        }

        fn check(&self, validator: &RequestValidator) -> Result<(), RequestRejection> {
            validator.validate(&RequestView {
                method: &self.method,
                path: self.path,
                query: &self.query,
                json_body: self.body.as_ref(),
                content_type: self.content_type,
                has_body: self.has_body,
            })
        }
    }

    fn validator() -> RequestValidator {
        RequestValidator::compile(&document()).unwrap()
    }

    #[test]
    fn undeclared_path_is_not_found() {
        let v = validator();
        assert_eq!(Req::new(Method::GET, "/nope").check(&v), Err(RequestRejection::NotFound));
        assert_eq!(Req::new(Method::GET, "/items/").check(&v), Err(RequestRejection::NotFound));
    }

    #[test]
    fn undeclared_method_lists_allowed_methods() {
        let v = validator();
        match Req::new(Method::DELETE, "/items").check(&v) {
            Err(RequestRejection::MethodNotAllowed { allowed, .. }) => {
                assert_eq!(allowed, vec![Method::GET, Method::POST]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn literal_templates_win_over_parameters() {
        let v = validator();
        assert_eq!(v.templates()[0], "/items/latest");
        assert!(Req::new(Method::GET, "/items/latest").check(&v).is_ok());
    }

    #[test]
    fn path_parameters_are_typed() {
        let v = validator();
        assert!(Req::new(Method::GET, "/items/42").check(&v).is_ok());
        let err = Req::new(Method::GET, "/items/abc").check(&v).unwrap_err();
        assert!(matches!(err, RequestRejection::InvalidParameters(_)));
    }

    #[test]
    fn query_parameters_are_required_and_typed() {
        let v = validator();
        assert!(Req::new(Method::GET, "/items").query("cursor", "c").check(&v).is_ok());
        assert!(Req::new(Method::GET, "/items")
            .query("cursor", "c")
            .query("limit", "5")
            .check(&v)
            .is_ok());

        let missing = Req::new(Method::GET, "/items").check(&v).unwrap_err();
        assert_eq!(missing.errors(), &["query parameter \"cursor\" is required".to_string()]);

        let err = Req::new(Method::GET, "/items")
            .query("cursor", "c")
            .query("limit", "0")
            .check(&v)
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn body_is_checked_against_referenced_schema() {
        let v = validator();
        assert!(Req::new(Method::POST, "/items").json(json!({"name": "x"})).check(&v).is_ok());

        let err = Req::new(Method::POST, "/items")
            .json(json!({"name": "", "extra": 1}))
            .check(&v)
            .unwrap_err();
        match err {
            RequestRejection::InvalidBody(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn body_presence_and_media_type() {
        let v = validator();
        assert_eq!(Req::new(Method::POST, "/items").check(&v), Err(RequestRejection::MissingBody));

        let mut text = Req::new(Method::POST, "/items");
        text.content_type = Some("text/plain");
        text.has_body = true;
        assert_eq!(
            text.check(&v),
            Err(RequestRejection::UnsupportedMediaType("text/plain".into()))
        );

        // Optional bodies may be omitted.
        assert!(Req::new(Method::PUT, "/notes").check(&v).is_ok());
    }

    #[test]
    fn empty_json_body_counts_as_missing() {
        let v = validator();
        let mut empty = Req::new(Method::POST, "/items");
        empty.content_type = Some("application/json");
        empty.has_body = true;
        assert_eq!(empty.check(&v), Err(RequestRejection::MissingBody));

        let mut optional = Req::new(Method::PUT, "/notes");
        optional.content_type = Some("application/json");
        optional.has_body = true;
        assert!(optional.check(&v).is_ok());
    }

    #[test]
    fn missing_paths_is_an_invalid_document() {
        let err = RequestValidator::compile(&json!({"openapi": "3.1.0"})).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDocument(_)));
    }

    #[test]
    fn broken_schema_is_reported_with_location() {
        let doc = json!({
            "paths": { "/x": { "post": { "requestBody": { "content": {
                "application/json": { "schema": { "type": 12 } }
            } } } } }
        });
        match RequestValidator::compile(&doc).unwrap_err() {
            SchemaError::InvalidSchema { location, .. } => assert_eq!(location, "post /x requestBody"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn json_media_types() {
        assert!(is_json_media_type("application/json"));
        assert!(is_json_media_type("Application/JSON; charset=utf-8"));
        assert!(is_json_media_type("application/merge-patch+json"));
        assert!(!is_json_media_type("text/json-ish"));
    }

    #[tokio::test]
    async fn install_compiles_off_the_runtime() {
        let v = RequestValidator::install(document()).await.unwrap();
        assert_eq!(v.templates().len(), 4);
    }
}
