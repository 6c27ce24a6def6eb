use sea_orm::{EntityTrait, Iterable, QueryOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    cache::{entity, QueryCache},
    db::DbPool,
    entities::{container_type, OrderStatus, StatusTone},
    errors::ServiceError,
    i18n::Locale,
    services::{
        contacts::{CarrierService, DestinationService, SupplierService},
        reference_data::LookupOption,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContainerTypeResponse {
    pub id: Uuid,
    #[schema(example = "40ft HC")]
    pub name: String,
}

impl From<container_type::Model> for ContainerTypeResponse {
    fn from(model: container_type::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusOption {
    pub value: OrderStatus,
    pub label: String,
    pub tone: StatusTone,
}

/// Everything the order form needs to fill its select inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderLookups {
    pub suppliers: Vec<LookupOption>,
    pub carriers: Vec<LookupOption>,
    pub destinations: Vec<LookupOption>,
    pub container_types: Vec<ContainerTypeResponse>,
    pub statuses: Vec<StatusOption>,
}

pub fn status_options(locale: Locale) -> Vec<StatusOption> {
    OrderStatus::iter()
        .map(|status| StatusOption {
            value: status,
            label: status.label(locale).to_string(),
            tone: status.tone(),
        })
        .collect()
}

#[derive(Clone)]
pub struct LookupService {
    db_pool: Arc<DbPool>,
    cache: QueryCache,
    suppliers: Arc<SupplierService>,
    carriers: Arc<CarrierService>,
    destinations: Arc<DestinationService>,
}

impl LookupService {
    pub fn new(
        db_pool: Arc<DbPool>,
        cache: QueryCache,
        suppliers: Arc<SupplierService>,
        carriers: Arc<CarrierService>,
        destinations: Arc<DestinationService>,
    ) -> Self {
        Self {
            db_pool,
            cache,
            suppliers,
            carriers,
            destinations,
        }
    }

    /// The controlled container type list, ordered by name
    #[instrument(skip(self))]
    pub async fn container_types(&self) -> Result<Vec<ContainerTypeResponse>, ServiceError> {
        let key = QueryCache::key(entity::CONTAINER_TYPES, &[]);
        if let Some(cached) = self.cache.get::<Vec<ContainerTypeResponse>>(&key) {
            return Ok(cached);
        }

        let types: Vec<ContainerTypeResponse> = container_type::Entity::find()
            .order_by_asc(container_type::Column::Name)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list container types");
                ServiceError::from(e)
            })?
            .into_iter()
            .map(ContainerTypeResponse::from)
            .collect();

        self.cache.remember(&key, &types);
        Ok(types)
    }

    #[instrument(skip(self))]
    pub async fn order_lookups(&self, locale: Locale) -> Result<OrderLookups, ServiceError> {
        let (suppliers, carriers, destinations, container_types) = futures::try_join!(
            self.suppliers.list(None),
            self.carriers.list(None),
            self.destinations.list(None),
            self.container_types(),
        )?;

        Ok(OrderLookups {
            suppliers: suppliers.into_iter().map(LookupOption::from).collect(),
            carriers: carriers.into_iter().map(LookupOption::from).collect(),
            destinations: destinations.into_iter().map(LookupOption::from).collect(),
            container_types,
            statuses: status_options(locale),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_lifecycle_order() {
        let options = status_options(Locale::EnUs);
        let values: Vec<_> = options.iter().map(|o| o.value).collect();
        assert_eq!(
            values,
            vec![
                OrderStatus::Pending,
                OrderStatus::InProduction,
                OrderStatus::InTransit,
                OrderStatus::Delivered
            ]
        );
        assert_eq!(options[2].label, "In Transit");
        assert_eq!(options[2].tone, StatusTone::Info);
    }

    #[test]
    fn portuguese_labels() {
        let options = status_options(Locale::Pt);
        assert_eq!(options[1].label, "Em Produção");
    }
}
