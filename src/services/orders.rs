use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    cache::{entity, QueryCache},
    db::DbPool,
    entities::{carrier, container_type, destination, order, order_document, supplier, OrderStatus, StatusTone},
    errors::{FieldError, ServiceError},
    events::{Event, EventSender},
    i18n::Locale,
    services::{
        documents::{DocumentResponse, DocumentService, UploadedFile},
        order_form::{OrderDraft, OrderForm, OrderFormView},
        reference_data::{contains_ignore_case, normalize_search},
    },
};

/// Order with related names and status presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    #[schema(example = "PO-2024-0042")]
    pub reference: String,
    pub supplier_id: Uuid,
    pub supplier_name: Option<String>,
    pub destination_id: Uuid,
    pub destination_name: Option<String>,
    pub carrier_id: Uuid,
    pub carrier_name: Option<String>,
    pub product_description: Option<String>,
    pub container_type: String,
    pub container_reference: Option<String>,
    #[schema(value_type = Option<String>)]
    pub transport_price: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub order_value: Option<Decimal>,
    pub status: OrderStatus,
    pub status_tone: StatusTone,
    #[schema(example = "Em Trânsito")]
    pub status_label: String,
    pub order_date: DateTime<Utc>,
    pub expected_start_date: DateTime<Utc>,
    pub initial_payment_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub initial_payment_amount: Option<Decimal>,
    pub final_payment_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub final_payment_amount: Option<Decimal>,
    pub etd: Option<DateTime<Utc>>,
    pub eta: Option<DateTime<Utc>>,
    pub ata: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display names of the records an order points to
#[derive(Debug, Clone, Default)]
pub struct RelatedNames {
    pub supplier: Option<String>,
    pub destination: Option<String>,
    pub carrier: Option<String>,
}

impl OrderResponse {
    pub fn from_model(model: order::Model, names: RelatedNames, locale: Locale) -> Self {
        Self {
            id: model.id,
            reference: model.reference,
            supplier_id: model.supplier_id,
            supplier_name: names.supplier,
            destination_id: model.destination_id,
            destination_name: names.destination,
            carrier_id: model.carrier_id,
            carrier_name: names.carrier,
            product_description: model.product_description,
            container_type: model.container_type,
            container_reference: model.container_reference,
            transport_price: model.transport_price,
            order_value: model.order_value,
            status: model.status,
            status_tone: model.status.tone(),
            status_label: model.status.label(locale).to_string(),
            order_date: model.order_date,
            expected_start_date: model.expected_start_date,
            initial_payment_date: model.initial_payment_date,
            initial_payment_amount: model.initial_payment_amount,
            final_payment_date: model.final_payment_date,
            final_payment_amount: model.final_payment_amount,
            etd: model.etd,
            eta: model.eta,
            ata: model.ata,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Order with its attachments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub documents: Vec<DocumentResponse>,
}

/// What a client echoes back before confirming an irreversible delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeletePreview {
    pub id: Uuid,
    pub reference: String,
    pub supplier_name: Option<String>,
    pub destination_name: Option<String>,
    pub status: OrderStatus,
    pub status_label: String,
    /// Documents whose records are deleted with the order
    pub document_count: u64,
}

/// Filters accepted by the order list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub search: Option<String>,
    pub status: Option<String>,
}

impl OrderFilter {
    /// Blank means unfiltered; anything else must name a known status.
    pub fn parsed_status(&self) -> Result<Option<OrderStatus>, ServiceError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => OrderStatus::parse(raw).map(Some).ok_or_else(|| {
                ServiceError::InvalidFields(vec![FieldError::new(
                    "status",
                    format!("Unknown status '{}'", raw),
                )])
            }),
        }
    }
}

/// Service for purchase orders
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    cache: QueryCache,
    documents: DocumentService,
    purge_documents_on_delete: bool,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        cache: QueryCache,
        documents: DocumentService,
        purge_documents_on_delete: bool,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            cache,
            documents,
            purge_documents_on_delete,
        }
    }

    /// Orders newest first, matching a reference substring and an optional status
    #[instrument(skip(self, filter), fields(search = ?filter.search, status = ?filter.status))]
    pub async fn list(
        &self,
        filter: &OrderFilter,
        locale: Locale,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let search = normalize_search(filter.search.as_deref());
        let status = filter.parsed_status()?;
        let key = QueryCache::key(
            entity::ORDERS,
            &[
                ("search", search.as_deref()),
                ("status", status.map(|s| s.as_str())),
                ("lang", Some(locale.tag())),
            ],
        );
        if let Some(cached) = self.cache.get::<Vec<OrderResponse>>(&key) {
            return Ok(cached);
        }

        let mut query = order::Entity::find();
        if let Some(term) = &search {
            query = query.filter(contains_ignore_case(
                (order::Entity, order::Column::Reference),
                term,
            ));
        }
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }

        let db = &*self.db_pool;
        let models = query
            .order_by_desc(order::Column::OrderDate)
            .order_by_desc(order::Column::CreatedAt)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list orders");
                ServiceError::from(e)
            })?;

        let orders = self.with_names(db, models, locale).await?;
        self.cache.remember(&key, &orders);
        info!(returned_count = orders.len(), "Orders listed successfully");
        Ok(orders)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get(&self, order_id: Uuid, locale: Locale) -> Result<OrderDetail, ServiceError> {
        let db = &*self.db_pool;
        let model = self.find_model(order_id).await?;
        let order = self
            .with_names(db, vec![model], locale)
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError("Order vanished while loading names".into()))?;
        let documents = self.documents.list(order_id).await?;
        Ok(OrderDetail { order, documents })
    }

    /// Raw stored order
    pub async fn find_model(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to fetch order");
                ServiceError::from(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    /// Stored values shaped for the edit form
    pub async fn form(&self, order_id: Uuid) -> Result<OrderFormView, ServiceError> {
        self.find_model(order_id).await.map(OrderFormView::from)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete_preview(
        &self,
        order_id: Uuid,
        locale: Locale,
    ) -> Result<DeletePreview, ServiceError> {
        let db = &*self.db_pool;
        let model = self.find_model(order_id).await?;
        let document_count = order_document::Entity::find()
            .filter(order_document::Column::OrderId.eq(order_id))
            .count(db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to count documents");
                ServiceError::from(e)
            })?;
        let order = self
            .with_names(db, vec![model], locale)
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError("Order vanished while loading names".into()))?;

        Ok(DeletePreview {
            id: order.id,
            reference: order.reference,
            supplier_name: order.supplier_name,
            destination_name: order.destination_name,
            status: order.status,
            status_label: order.status_label,
            document_count,
        })
    }

    /// Validates and inserts a new order
    #[instrument(skip(self, form), fields(reference = %form.reference))]
    pub async fn create(&self, form: OrderForm, locale: Locale) -> Result<OrderResponse, ServiceError> {
        let draft = self.validate(form).await?;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let mut active = order::ActiveModel {
            id: Set(order_id),
            created_at: Set(now),
            ..Default::default()
        };
        apply_draft(&mut active, draft, now);

        let model = active.insert(&*self.db_pool).await.map_err(|e| {
            error!(error = %e, "Failed to create order");
            ServiceError::from(e)
        })?;

        self.cache.invalidate_entity(entity::ORDERS);
        self.publish(Event::OrderCreated(order_id)).await;
        info!(order_id = %order_id, "Order created successfully");
        self.single_response(model, locale).await
    }

    /// Replaces every editable field of an order
    #[instrument(skip(self, form), fields(order_id = %order_id))]
    pub async fn update(
        &self,
        order_id: Uuid,
        form: OrderForm,
        locale: Locale,
    ) -> Result<OrderResponse, ServiceError> {
        let draft = self.validate(form).await?;
        let mut active: order::ActiveModel = self.find_model(order_id).await?.into();
        apply_draft(&mut active, draft, Utc::now());

        let model = active.update(&*self.db_pool).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to update order");
            ServiceError::from(e)
        })?;

        self.cache.invalidate_entity(entity::ORDERS);
        self.publish(Event::OrderUpdated(order_id)).await;
        info!(order_id = %order_id, "Order updated successfully");
        self.single_response(model, locale).await
    }

    /// Creates or updates depending on `order_id`
    pub async fn save(
        &self,
        order_id: Option<Uuid>,
        form: OrderForm,
        locale: Locale,
    ) -> Result<OrderResponse, ServiceError> {
        match order_id {
            Some(id) => self.update(id, form, locale).await,
            None => self.create(form, locale).await,
        }
    }

    /// Saves the order, then attaches the file. The two writes are independent: when the
    /// document step fails the order stays saved and the error carries its id.
    #[instrument(skip(self, form, file), fields(order_id = ?order_id, file_name = %file.file_name))]
    pub async fn save_with_document(
        &self,
        order_id: Option<Uuid>,
        form: OrderForm,
        file: UploadedFile,
        locale: Locale,
    ) -> Result<OrderDetail, ServiceError> {
        self.documents.check_upload(&file)?;

        let order = self.save(order_id, form, locale).await?;
        let saved_id = order.id;

        match self.documents.upload(saved_id, file).await {
            Ok(_) => self.get(saved_id, locale).await,
            Err(e) => {
                warn!(order_id = %saved_id, error = %e, "Order saved but document upload failed");
                Err(ServiceError::PartialFailure {
                    order_id: saved_id,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Deletes an order. Document records go with it; stored objects are only
    /// removed when purging is configured.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let documents = self.documents.models_for_order(order_id).await?;

        let result = order::Entity::delete_by_id(order_id)
            .exec(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to delete order");
                ServiceError::from(e)
            })?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Order {} not found", order_id)));
        }

        if self.purge_documents_on_delete && !documents.is_empty() {
            let paths: Vec<String> = documents.iter().map(|d| d.file_url.clone()).collect();
            let purged = self.documents.purge_objects(&paths).await;
            info!(order_id = %order_id, purged, "Purged stored documents of deleted order");
        }

        self.cache.invalidate_entity(entity::ORDERS);
        self.publish(Event::OrderDeleted {
            order_id,
            documents_removed: documents.len(),
        })
        .await;
        info!(order_id = %order_id, documents = documents.len(), "Order deleted successfully");
        Ok(())
    }

    /// Every stored order, for aggregate computations
    pub async fn all_models(&self) -> Result<Vec<order::Model>, ServiceError> {
        order::Entity::find()
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load orders");
                ServiceError::from(e)
            })
    }

    async fn validate(&self, form: OrderForm) -> Result<OrderDraft, ServiceError> {
        let draft = OrderDraft::try_from(form).map_err(ServiceError::InvalidFields)?;

        let known = container_type::Entity::find()
            .filter(container_type::Column::Name.eq(draft.container_type.as_str()))
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check container type");
                ServiceError::from(e)
            })?
            .is_some();
        if !known {
            return Err(ServiceError::InvalidFields(vec![FieldError::new(
                "container_type",
                "Unknown container type",
            )]));
        }
        Ok(draft)
    }

    async fn single_response(
        &self,
        model: order::Model,
        locale: Locale,
    ) -> Result<OrderResponse, ServiceError> {
        self.with_names(&*self.db_pool, vec![model], locale)
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError("Order vanished while loading names".into()))
    }

    async fn with_names<C: ConnectionTrait>(
        &self,
        db: &C,
        models: Vec<order::Model>,
        locale: Locale,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let supplier_ids: HashSet<Uuid> = models.iter().map(|m| m.supplier_id).collect();
        let destination_ids: HashSet<Uuid> = models.iter().map(|m| m.destination_id).collect();
        let carrier_ids: HashSet<Uuid> = models.iter().map(|m| m.carrier_id).collect();

        let suppliers: HashMap<Uuid, String> = supplier::Entity::find()
            .filter(supplier::Column::Id.is_in(supplier_ids))
            .all(db)
            .await
            .map_err(ServiceError::from)?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();
        let destinations: HashMap<Uuid, String> = destination::Entity::find()
            .filter(destination::Column::Id.is_in(destination_ids))
            .all(db)
            .await
            .map_err(ServiceError::from)?
            .into_iter()
            .map(|d| (d.id, d.name))
            .collect();
        let carriers: HashMap<Uuid, String> = carrier::Entity::find()
            .filter(carrier::Column::Id.is_in(carrier_ids))
            .all(db)
            .await
            .map_err(ServiceError::from)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        Ok(models
            .into_iter()
            .map(|m| {
                let names = RelatedNames {
                    supplier: suppliers.get(&m.supplier_id).cloned(),
                    destination: destinations.get(&m.destination_id).cloned(),
                    carrier: carriers.get(&m.carrier_id).cloned(),
                };
                OrderResponse::from_model(m, names, locale)
            })
            .collect())
    }

    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event).await;
        }
    }
}

fn apply_draft(active: &mut order::ActiveModel, draft: OrderDraft, now: DateTime<Utc>) {
    active.reference = Set(draft.reference);
    active.supplier_id = Set(draft.supplier_id);
    active.destination_id = Set(draft.destination_id);
    active.carrier_id = Set(draft.carrier_id);
    active.product_description = Set(draft.product_description);
    active.container_type = Set(draft.container_type);
    active.container_reference = Set(draft.container_reference);
    active.transport_price = Set(Some(draft.transport_price));
    active.order_value = Set(Some(draft.order_value));
    active.status = Set(draft.status);
    active.order_date = Set(draft.order_date);
    active.expected_start_date = Set(draft.expected_start_date);
    active.initial_payment_date = Set(draft.initial_payment_date);
    active.initial_payment_amount = Set(draft.initial_payment_amount);
    active.final_payment_date = Set(draft.final_payment_date);
    active.final_payment_amount = Set(draft.final_payment_amount);
    active.etd = Set(draft.etd);
    active.eta = Set(draft.eta);
    active.ata = Set(draft.ata);
    active.updated_at = Set(now);
}
