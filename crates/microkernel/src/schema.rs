use std::collections::BTreeMap;

use jsonschema::JSONSchema;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use crate::registry::{Capability, ServiceKind};

pub const COOK_COUNTY_EXHIBIT: &str = "cook-county-exhibit";
pub const FINANCIAL_DOCUMENT: &str = "financial-document";

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown schema: {0}")]
    Unknown(String),
    #[error("schema {0} failed to compile: {1}")]
    Compile(String, String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
}

struct NamedSchema {
    compiled: JSONSchema,
}

/// Named JSON Schemas, compiled once at registration.
pub struct SchemaService {
    domain: String,
    schemas: RwLock<BTreeMap<String, NamedSchema>>,
}

impl SchemaService {
    pub fn new(domain: &str) -> Self {
        let service = Self {
            domain: domain.to_string(),
            schemas: RwLock::new(BTreeMap::new()),
        };
        for (id, source) in builtin_schemas() {
            if let Err(err) = service.register(id, source) {
                warn!(schema = %id, error = %err, "builtin schema not registered");
            }
        }
        service
    }

    pub fn register(&self, id: &str, source: Value) -> Result<(), SchemaError> {
        let compiled = JSONSchema::compile(&source)
            .map_err(|err| SchemaError::Compile(id.to_string(), err.to_string()))?;
        self.schemas
            .write()
            .insert(id.to_string(), NamedSchema { compiled });
        Ok(())
    }

    pub fn schema_ids(&self) -> Vec<String> {
        self.schemas.read().keys().cloned().collect()
    }

    pub fn validate_schema(&self, id: &str, data: &Value) -> Result<ValidationOutcome, SchemaError> {
        let schemas = self.schemas.read();
        let named = schemas
            .get(id)
            .ok_or_else(|| SchemaError::Unknown(id.to_string()))?;
        let errors: Vec<String> = match named.compiled.validate(data) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|err| {
                    let path = err.instance_path.to_string();
                    if path.is_empty() {
                        err.to_string()
                    } else {
                        format!("{path}: {err}")
                    }
                })
                .collect(),
        };
        Ok(ValidationOutcome {
            valid: errors.is_empty(),
            errors,
        })
    }
}

impl Capability for SchemaService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Schema
    }

    fn domain(&self) -> &str {
        &self.domain
    }

    fn healthy(&self) -> bool {
        let schemas = self.schemas.read();
        builtin_ids().iter().all(|id| schemas.contains_key(*id))
    }
}

fn builtin_ids() -> [&'static str; 2] {
    [COOK_COUNTY_EXHIBIT, FINANCIAL_DOCUMENT]
}

fn builtin_schemas() -> Vec<(&'static str, Value)> {
    vec![
        (
            COOK_COUNTY_EXHIBIT,
            json!({
                "type": "object",
                "required": ["case_number", "caption", "exhibits", "authentication"],
                "properties": {
                    "case_number": { "type": "string" },
                    "caption": { "type": "string" },
                    "exhibits": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["number", "description", "document_path"],
                            "properties": {
                                "number": { "type": ["string", "integer"] },
                                "description": { "type": "string" },
                                "document_path": { "type": "string" }
                            }
                        }
                    },
                    "authentication": { "type": "object" }
                }
            }),
        ),
        (
            FINANCIAL_DOCUMENT,
            json!({
                "type": "object",
                "required": ["account_number", "date_range", "transactions"],
                "properties": {
                    "account_number": { "type": "string" },
                    "date_range": { "type": "object" },
                    "transactions": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["date", "amount", "description"],
                            "properties": {
                                "date": { "type": "string" },
                                "amount": { "type": "number" },
                                "description": { "type": "string" }
                            }
                        }
                    }
                }
            }),
        ),
    ]
}
