use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AdminError, AdminResult};
use crate::model::{ClassMetadata, Entity, EntityForm, PropertyValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub error_type: ValidationErrorType,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorType {
    FormError,
    UndefinedProperty,
    MissingRequiredProperty,
    TypeMismatch,
    CardinalityMismatch,
    InvalidKey,
}

/// Outcome of binding a form onto an entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push(&mut self, field: &str, error_type: ValidationErrorType, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            error_type,
            message: message.into(),
        });
    }

    pub fn into_result(self) -> AdminResult<()> {
        if self.is_valid() {
            return Ok(());
        }
        Err(self.into_error())
    }

    pub fn into_error(self) -> AdminError {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for error in self.errors {
            errors.entry(error.field).or_default().push(error.message);
        }
        AdminError::Validation { errors }
    }
}

/// Binds caller-supplied forms onto entities, validating every field
/// against resolved metadata.
pub struct FormValidator;

impl FormValidator {
    /// Build a new entity of the form's concrete type. Omitted properties
    /// with a declared default receive it.
    pub fn bind_new(form: &EntityForm, metadata: &ClassMetadata) -> AdminResult<Entity> {
        let mut entity = Entity::new(form.id.clone().unwrap_or_default(), form.entity_type.clone());
        let mut result = Self::apply_fields(&mut entity, form, metadata);

        for prop in metadata.properties_for(&form.entity_type) {
            if entity.find_property(&prop.name).is_none() {
                if let Some(default) = &prop.default_value {
                    entity.set_property(prop.bind(PropertyValue::Single(default.clone())));
                }
            }
        }

        Self::check_required(&entity, metadata, &mut result);
        result.into_result()?;
        Ok(entity)
    }

    /// Overlay a form onto a persisted entity. Fields the form omits keep
    /// their stored values.
    pub fn bind_update(existing: &Entity, form: &EntityForm, metadata: &ClassMetadata) -> AdminResult<Entity> {
        if form.entity_type != existing.entity_type {
            return Err(AdminError::validation(
                "type",
                format!(
                    "cannot change type from '{}' to '{}'",
                    existing.entity_type, form.entity_type
                ),
            ));
        }

        let mut entity = existing.clone();
        let mut result = Self::apply_fields(&mut entity, form, metadata);
        Self::check_required(&entity, metadata, &mut result);
        result.into_result()?;
        Ok(entity)
    }

    fn apply_fields(entity: &mut Entity, form: &EntityForm, metadata: &ClassMetadata) -> ValidationResult {
        let mut result = ValidationResult::default();

        for (field, messages) in &form.errors {
            for message in messages {
                result.push(field, ValidationErrorType::FormError, message.clone());
            }
        }

        for field in &form.fields {
            let Some(prop) = metadata
                .properties_for(&form.entity_type)
                .find(|p| p.name == field.name)
            else {
                result.push(
                    &field.name,
                    ValidationErrorType::UndefinedProperty,
                    format!("is not a property of '{}'", form.entity_type),
                );
                continue;
            };

            match (&field.value, prop.multi_valued) {
                (PropertyValue::Multiple(_), false) => {
                    result.push(
                        &field.name,
                        ValidationErrorType::CardinalityMismatch,
                        "accepts a single value",
                    );
                    continue;
                }
                (PropertyValue::Single(value), true) if !value.is_null() => {
                    result.push(
                        &field.name,
                        ValidationErrorType::CardinalityMismatch,
                        "accepts a list of values",
                    );
                    continue;
                }
                _ => {}
            }

            if let Some(bad) = field.value.values().into_iter().find(|v| !prop.data_type.accepts(v)) {
                result.push(
                    &field.name,
                    ValidationErrorType::TypeMismatch,
                    format!("expected {:?}, found {}", prop.data_type, bad),
                );
                continue;
            }

            entity.set_property(prop.bind(field.value.clone()));
        }

        result
    }

    fn check_required(entity: &Entity, metadata: &ClassMetadata, result: &mut ValidationResult) {
        for prop in metadata.properties_for(&entity.entity_type).filter(|p| p.required) {
            let present = entity
                .find_property(&prop.name)
                .is_some_and(|p| p.value.values().iter().any(|v| !is_blank(v)));
            if !present && !result.errors.iter().any(|e| e.field == prop.name) {
                result.push(&prop.name, ValidationErrorType::MissingRequiredProperty, "is required");
            }
        }
    }
}

fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
