use std::sync::Arc;

use kernel::Core;
use microkernel::{ValidationOutcome, COOK_COUNTY_EXHIBIT, FINANCIAL_DOCUMENT};
use serde_json::Value;

use crate::{schema_service, HelperError};

pub struct SchemaValidator {
    core: Arc<Core>,
}

impl SchemaValidator {
    pub fn new(core: Arc<Core>) -> Self {
        Self { core }
    }

    pub fn validate_exhibit_package(
        &self,
        package: &Value,
    ) -> Result<Option<ValidationOutcome>, HelperError> {
        self.validate(COOK_COUNTY_EXHIBIT, package)
    }

    pub fn validate_financial_document(
        &self,
        document: &Value,
    ) -> Result<Option<ValidationOutcome>, HelperError> {
        self.validate(FINANCIAL_DOCUMENT, document)
    }

    fn validate(&self, schema_id: &str, data: &Value) -> Result<Option<ValidationOutcome>, HelperError> {
        match schema_service(&self.core)? {
            Some(schema) => Ok(Some(schema.validate_schema(schema_id, data)?)),
            None => Ok(None),
        }
    }
}
