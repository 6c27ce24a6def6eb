//! Shapes shared by suppliers, carriers and destinations.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{carrier, destination, supplier};

/// Editable fields of a contact record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ContactFields {
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Acme Trading Ltd")]
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    #[schema(example = "China")]
    pub country: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Must be a valid email address"))]
    #[schema(example = "sales@acme.example")]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ContactFields {
    /// Trims every field; blank optional fields become `None`.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            address: blank_to_none(self.address),
            country: blank_to_none(self.country),
            email: blank_to_none(self.email),
            phone: blank_to_none(self.phone),
        }
    }

    /// Normalizes, then validates.
    pub fn into_valid(self) -> Result<Self, crate::errors::ServiceError> {
        let fields = self.normalized();
        fields.validate()?;
        Ok(fields)
    }
}

/// Trimmed value, or `None` when nothing is left.
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A supplier, carrier or destination as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReferenceRecord {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

macro_rules! record_from_model {
    ($($module:ident),+) => {
        $(
            impl From<$module::Model> for ReferenceRecord {
                fn from(model: $module::Model) -> Self {
                    Self {
                        id: model.id,
                        name: model.name,
                        address: model.address,
                        country: model.country,
                        email: model.email,
                        phone: model.phone,
                        created_at: model.created_at,
                        updated_at: model.updated_at,
                    }
                }
            }
        )+
    };
}

record_from_model!(supplier, carrier, destination);

/// Id and display name used to fill select inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LookupOption {
    pub id: Uuid,
    pub name: String,
}

impl From<ReferenceRecord> for LookupOption {
    fn from(record: ReferenceRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
        }
    }
}

/// Search term with surrounding whitespace removed; `None` when blank.
pub fn normalize_search(search: Option<&str>) -> Option<String> {
    search.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring match of `column` against `term`.
pub fn contains_ignore_case<C: IntoColumnRef>(column: C, term: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}
