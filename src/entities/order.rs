use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::i18n::Locale;

/// Purchase order moving through production and shipping
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub reference: String,
    pub supplier_id: Uuid,
    pub destination_id: Uuid,
    pub carrier_id: Uuid,
    #[sea_orm(column_type = "Text", nullable)]
    pub product_description: Option<String>,
    pub container_type: String,
    pub container_reference: Option<String>,
    pub transport_price: Option<Decimal>,
    pub order_value: Option<Decimal>,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub expected_start_date: DateTime<Utc>,
    pub initial_payment_date: Option<DateTime<Utc>>,
    pub initial_payment_amount: Option<Decimal>,
    pub final_payment_date: Option<DateTime<Utc>>,
    pub final_payment_amount: Option<Decimal>,
    pub etd: Option<DateTime<Utc>>,
    pub eta: Option<DateTime<Utc>>,
    pub ata: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id",
        on_delete = "Restrict"
    )]
    Supplier,
    #[sea_orm(
        belongs_to = "super::destination::Entity",
        from = "Column::DestinationId",
        to = "super::destination::Column::Id",
        on_delete = "Restrict"
    )]
    Destination,
    #[sea_orm(
        belongs_to = "super::carrier::Entity",
        from = "Column::CarrierId",
        to = "super::carrier::Column::Id",
        on_delete = "Restrict"
    )]
    Carrier,
    #[sea_orm(has_many = "super::order_document::Entity")]
    Documents,
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::destination::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Destination.def()
    }
}

impl Related<super::carrier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Carrier.def()
    }
}

impl Related<super::order_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Shipping lifecycle of an order
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_production")]
    InProduction,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}

/// Visual emphasis a client should give a status badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Neutral,
    Warning,
    Info,
    Success,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProduction => "in_production",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "pending" => Some(OrderStatus::Pending),
            "in_production" => Some(OrderStatus::InProduction),
            "in_transit" => Some(OrderStatus::InTransit),
            "delivered" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            OrderStatus::Pending => StatusTone::Neutral,
            OrderStatus::InProduction => StatusTone::Warning,
            OrderStatus::InTransit => StatusTone::Info,
            OrderStatus::Delivered => StatusTone::Success,
        }
    }

    pub fn label(&self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::Pt | Locale::PtBr, OrderStatus::Pending) => "Pendente",
            (Locale::Pt | Locale::PtBr, OrderStatus::InProduction) => "Em Produção",
            (Locale::Pt | Locale::PtBr, OrderStatus::InTransit) => "Em Trânsito",
            (Locale::Pt | Locale::PtBr, OrderStatus::Delivered) => "Entregue",
            (Locale::EnUs, OrderStatus::Pending) => "Pending",
            (Locale::EnUs, OrderStatus::InProduction) => "In Production",
            (Locale::EnUs, OrderStatus::InTransit) => "In Transit",
            (Locale::EnUs, OrderStatus::Delivered) => "Delivered",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sea_orm::Iterable;

    #[rstest]
    #[case(OrderStatus::Pending, StatusTone::Neutral, "Pendente", "Pending")]
    #[case(OrderStatus::InProduction, StatusTone::Warning, "Em Produção", "In Production")]
    #[case(OrderStatus::InTransit, StatusTone::Info, "Em Trânsito", "In Transit")]
    #[case(OrderStatus::Delivered, StatusTone::Success, "Entregue", "Delivered")]
    fn status_presentation(
        #[case] status: OrderStatus,
        #[case] tone: StatusTone,
        #[case] pt: &str,
        #[case] en: &str,
    ) {
        assert_eq!(status.tone(), tone);
        assert_eq!(status.label(Locale::Pt), pt);
        assert_eq!(status.label(Locale::PtBr), pt);
        assert_eq!(status.label(Locale::EnUs), en);
    }

    #[test]
    fn wire_and_store_values_agree() {
        for status in OrderStatus::iter() {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
            assert_eq!(status.to_value(), status.as_str().to_string());
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.as_str().to_string())
            );
        }
        assert_eq!(OrderStatus::parse("shipped"), None);
    }
}
