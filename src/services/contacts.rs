//! CRUD shared by suppliers, carriers and destinations.
//!
//! The three tables have identical columns; [`ContactEntity`] supplies the parts that differ
//! (cache key, event variants, how fields land on an active model) and [`ContactService`]
//! does the rest.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, EntityTrait, IntoActiveModel, PrimaryKeyTrait,
    QueryFilter, QueryOrder, Set,
};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    cache::{entity, QueryCache},
    db::DbPool,
    entities::{carrier, destination, supplier},
    errors::ServiceError,
    events::{Event, EventSender},
    services::reference_data::{contains_ignore_case, normalize_search, ContactFields, ReferenceRecord},
};

/// A table of named contacts that orders point at
pub trait ContactEntity: EntityTrait + Send + Sync + 'static {
    /// Singular, capitalized: `Supplier`
    const LABEL: &'static str;
    /// Prefix of cached list keys, see [`entity`]
    const CACHE_ENTITY: &'static str;

    fn name_column() -> Self::Column;

    fn new_active_model(id: Uuid, fields: ContactFields, now: DateTime<Utc>) -> Self::ActiveModel;

    fn apply(active: &mut Self::ActiveModel, fields: ContactFields, now: DateTime<Utc>);

    fn created(id: Uuid) -> Event;
    fn updated(id: Uuid) -> Event;
    fn deleted(id: Uuid) -> Event;
}

macro_rules! contact_entity {
    ($module:ident, $label:literal, $cache:expr, $created:ident, $updated:ident, $deleted:ident) => {
        impl ContactEntity for $module::Entity {
            const LABEL: &'static str = $label;
            const CACHE_ENTITY: &'static str = $cache;

            fn name_column() -> $module::Column {
                $module::Column::Name
            }

            fn new_active_model(id: Uuid, fields: ContactFields, now: DateTime<Utc>) -> $module::ActiveModel {
                $module::ActiveModel {
                    id: Set(id),
                    name: Set(fields.name),
                    address: Set(fields.address),
                    country: Set(fields.country),
                    email: Set(fields.email),
                    phone: Set(fields.phone),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
            }

            fn apply(active: &mut $module::ActiveModel, fields: ContactFields, now: DateTime<Utc>) {
                active.name = Set(fields.name);
                active.address = Set(fields.address);
                active.country = Set(fields.country);
                active.email = Set(fields.email);
                active.phone = Set(fields.phone);
                active.updated_at = Set(now);
            }

            fn created(id: Uuid) -> Event {
                Event::$created(id)
            }

            fn updated(id: Uuid) -> Event {
                Event::$updated(id)
            }

            fn deleted(id: Uuid) -> Event {
                Event::$deleted(id)
            }
        }
    };
}

contact_entity!(supplier, "Supplier", entity::SUPPLIERS, SupplierCreated, SupplierUpdated, SupplierDeleted);
contact_entity!(carrier, "Carrier", entity::CARRIERS, CarrierCreated, CarrierUpdated, CarrierDeleted);
contact_entity!(
    destination,
    "Destination",
    entity::DESTINATIONS,
    DestinationCreated,
    DestinationUpdated,
    DestinationDeleted
);

pub type SupplierService = ContactService<supplier::Entity>;
pub type CarrierService = ContactService<carrier::Entity>;
pub type DestinationService = ContactService<destination::Entity>;

/// Service for managing one contact table
pub struct ContactService<E> {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    cache: QueryCache,
    _entity: PhantomData<E>,
}

impl<E> Clone for ContactService<E> {
    fn clone(&self) -> Self {
        Self {
            db_pool: self.db_pool.clone(),
            event_sender: self.event_sender.clone(),
            cache: self.cache.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> ContactService<E>
where
    E: ContactEntity,
    E::Model: Into<ReferenceRecord> + IntoActiveModel<E::ActiveModel> + Send + Sync,
    E::ActiveModel: ActiveModelBehavior + Send,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
{
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        cache: QueryCache,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            cache,
            _entity: PhantomData,
        }
    }

    pub(crate) fn db(&self) -> &DbPool {
        &self.db_pool
    }

    /// Lists records ordered by name, optionally filtered by a name substring
    #[instrument(skip(self), fields(kind = E::LABEL))]
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<ReferenceRecord>, ServiceError> {
        let search = normalize_search(search);
        let key = QueryCache::key(E::CACHE_ENTITY, &[("search", search.as_deref())]);
        if let Some(cached) = self.cache.get::<Vec<ReferenceRecord>>(&key) {
            return Ok(cached);
        }

        let mut query = E::find();
        if let Some(term) = &search {
            query = query.filter(contains_ignore_case((E::default(), E::name_column()), term));
        }

        let records: Vec<ReferenceRecord> = query
            .order_by_asc(E::name_column())
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, kind = E::LABEL, "Failed to list records");
                ServiceError::from(e)
            })?
            .into_iter()
            .map(Into::into)
            .collect();

        self.cache.remember(&key, &records);
        Ok(records)
    }

    #[instrument(skip(self), fields(kind = E::LABEL, id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<ReferenceRecord, ServiceError> {
        self.find_model(id).await.map(Into::into)
    }

    #[instrument(skip(self, input), fields(kind = E::LABEL, name = %input.name))]
    pub async fn create(&self, input: ContactFields) -> Result<ReferenceRecord, ServiceError> {
        let fields = input.into_valid()?;
        let id = Uuid::new_v4();

        let model = E::new_active_model(id, fields, Utc::now())
            .insert(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, kind = E::LABEL, "Failed to create record");
                ServiceError::from(e)
            })?;

        self.invalidate();
        self.publish(E::created(id)).await;
        info!(id = %id, "{} created successfully", E::LABEL);
        Ok(model.into())
    }

    #[instrument(skip(self, input), fields(kind = E::LABEL, id = %id))]
    pub async fn update(&self, id: Uuid, input: ContactFields) -> Result<ReferenceRecord, ServiceError> {
        let fields = input.into_valid()?;
        let mut active = self.find_model(id).await?.into_active_model();
        E::apply(&mut active, fields, Utc::now());

        let model = active.update(&*self.db_pool).await.map_err(|e| {
            error!(error = %e, kind = E::LABEL, id = %id, "Failed to update record");
            ServiceError::from(e)
        })?;

        self.invalidate();
        self.publish(E::updated(id)).await;
        info!(id = %id, "{} updated successfully", E::LABEL);
        Ok(model.into())
    }

    /// Fails with a referential-integrity error while orders still point at the record
    #[instrument(skip(self), fields(kind = E::LABEL, id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = E::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, kind = E::LABEL, id = %id, "Failed to delete record");
                ServiceError::from(e)
            })?;

        if result.rows_affected == 0 {
            return Err(self.not_found(id));
        }

        self.invalidate();
        self.publish(E::deleted(id)).await;
        info!(id = %id, "{} deleted successfully", E::LABEL);
        Ok(())
    }

    pub(crate) async fn find_model(&self, id: Uuid) -> Result<E::Model, ServiceError> {
        E::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, kind = E::LABEL, id = %id, "Failed to fetch record");
                ServiceError::from(e)
            })?
            .ok_or_else(|| self.not_found(id))
    }

    fn not_found(&self, id: Uuid) -> ServiceError {
        ServiceError::NotFound(format!("{} {} not found", E::LABEL, id))
    }

    fn invalidate(&self) {
        self.cache.invalidate_entity(E::CACHE_ENTITY);
        // order rows display contact names
        self.cache.invalidate_entity(entity::ORDERS);
    }

    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event).await;
        }
    }
}
