use bytes::Bytes;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{order, order_document},
    errors::{FieldError, ServiceError},
    events::{Event, EventSender},
    storage::{self, ObjectStorage, StorageError},
};

/// Attempts at finding a free numbered file name before giving up
const MAX_NAME_ATTEMPTS: usize = 1000;

/// File received from a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Document metadata with its download URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    #[schema(example = "bill-of-lading.pdf")]
    pub name: String,
    /// Storage path, `<order_id>/<file_name>`
    pub file_url: String,
    /// Download URL derived from the storage path
    pub public_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RenameDocumentRequest {
    #[schema(example = "Bill of lading (signed).pdf")]
    pub name: String,
}

/// Service for order attachments
#[derive(Clone)]
pub struct DocumentService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    storage: Arc<dyn ObjectStorage>,
    public_base_url: String,
    max_upload_bytes: usize,
}

impl DocumentService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        storage: Arc<dyn ObjectStorage>,
        public_base_url: String,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            storage,
            public_base_url,
            max_upload_bytes,
        }
    }

    pub fn to_response(&self, model: order_document::Model) -> DocumentResponse {
        DocumentResponse {
            public_url: storage::public_url(&self.public_base_url, &model.file_url),
            id: model.id,
            order_id: model.order_id,
            name: model.name,
            file_url: model.file_url,
            created_at: model.created_at,
        }
    }

    /// Checks size and name without touching storage; returns the sanitized file name.
    pub fn check_upload(&self, file: &UploadedFile) -> Result<String, ServiceError> {
        if file.bytes.is_empty() {
            return Err(ServiceError::InvalidFields(vec![FieldError::new(
                "file",
                "File is empty",
            )]));
        }
        if file.bytes.len() > self.max_upload_bytes {
            return Err(ServiceError::PayloadTooLarge(format!(
                "File exceeds the {} byte upload limit",
                self.max_upload_bytes
            )));
        }
        storage::sanitize_file_name(&file.file_name)
            .map_err(|_| ServiceError::InvalidFields(vec![FieldError::new("file", "File name is not usable")]))
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn list(&self, order_id: Uuid) -> Result<Vec<DocumentResponse>, ServiceError> {
        self.ensure_order(order_id).await?;
        let documents = self.models_for_order(order_id).await?;
        Ok(documents.into_iter().map(|d| self.to_response(d)).collect())
    }

    pub(crate) async fn models_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<order_document::Model>, ServiceError> {
        order_document::Entity::find()
            .filter(order_document::Column::OrderId.eq(order_id))
            .order_by_asc(order_document::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to list documents");
                ServiceError::from(e)
            })
    }

    /// Stores the bytes, then records the metadata row. A failed insert removes the stored object.
    #[instrument(skip(self, file), fields(order_id = %order_id, file_name = %file.file_name, size = file.bytes.len()))]
    pub async fn upload(
        &self,
        order_id: Uuid,
        file: UploadedFile,
    ) -> Result<DocumentResponse, ServiceError> {
        let file_name = self.check_upload(&file)?;
        self.ensure_order(order_id).await?;

        let path = self.store_unique(order_id, &file_name, file.bytes).await?;
        let stored_name = path
            .rsplit('/')
            .next()
            .unwrap_or(file_name.as_str())
            .to_string();

        let document_id = Uuid::new_v4();
        let inserted = order_document::ActiveModel {
            id: Set(document_id),
            order_id: Set(order_id),
            name: Set(stored_name),
            file_url: Set(path.clone()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await;

        let model = match inserted {
            Ok(model) => model,
            Err(e) => {
                error!(error = %e, order_id = %order_id, path = %path, "Failed to record document; removing stored object");
                if let Err(cleanup) = self.storage.delete(&path).await {
                    warn!(error = %cleanup, path = %path, "Failed to remove orphaned object");
                }
                return Err(ServiceError::from(e));
            }
        };

        self.publish(Event::DocumentUploaded {
            order_id,
            document_id,
        })
        .await;
        info!(document_id = %document_id, order_id = %order_id, "Document uploaded successfully");
        Ok(self.to_response(model))
    }

    /// Renames the document record; the stored object keeps its path.
    #[instrument(skip(self, request), fields(document_id = %document_id))]
    pub async fn rename(
        &self,
        document_id: Uuid,
        request: RenameDocumentRequest,
    ) -> Result<DocumentResponse, ServiceError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::InvalidFields(vec![FieldError::new(
                "name",
                "Name is required",
            )]));
        }

        let mut active: order_document::ActiveModel = self.find_model(document_id).await?.into();
        active.name = Set(name.clone());
        let model = active.update(&*self.db_pool).await.map_err(|e| {
            error!(error = %e, document_id = %document_id, "Failed to rename document");
            ServiceError::from(e)
        })?;

        self.publish(Event::DocumentRenamed { document_id, name }).await;
        info!(document_id = %document_id, "Document renamed successfully");
        Ok(self.to_response(model))
    }

    /// Removes the stored object, then the record.
    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn delete(&self, document_id: Uuid) -> Result<(), ServiceError> {
        let model = self.find_model(document_id).await?;

        let removed = self.storage.delete(&model.file_url).await.map_err(|e| {
            error!(error = %e, path = %model.file_url, "Failed to delete stored object");
            ServiceError::from(e)
        })?;
        if !removed {
            warn!(path = %model.file_url, "Stored object was already gone");
        }

        order_document::Entity::delete_by_id(document_id)
            .exec(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, document_id = %document_id, "Failed to delete document record");
                ServiceError::from(e)
            })?;

        self.publish(Event::DocumentDeleted {
            order_id: model.order_id,
            document_id,
        })
        .await;
        info!(document_id = %document_id, "Document deleted successfully");
        Ok(())
    }

    /// Best-effort removal of stored objects whose records are already gone.
    pub(crate) async fn purge_objects(&self, paths: &[String]) -> usize {
        let mut purged = 0;
        for path in paths {
            match self.storage.delete(path).await {
                Ok(true) => purged += 1,
                Ok(false) => {}
                Err(e) => warn!(error = %e, path = %path, "Failed to purge stored object"),
            }
        }
        purged
    }

    async fn store_unique(
        &self,
        order_id: Uuid,
        file_name: &str,
        bytes: Bytes,
    ) -> Result<String, ServiceError> {
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let candidate = storage::numbered_file_name(file_name, attempt);
            let path = storage::document_path(order_id, &candidate);
            match self.storage.put_new(&path, bytes.clone()).await {
                Ok(()) => return Ok(path),
                Err(StorageError::AlreadyExists(_)) => continue,
                Err(e) => {
                    error!(error = %e, path = %path, "Failed to store document");
                    return Err(e.into());
                }
            }
        }
        Err(ServiceError::Conflict(format!(
            "Too many documents named '{}' on this order",
            file_name
        )))
    }

    async fn ensure_order(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let exists = order::Entity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to fetch order");
                ServiceError::from(e)
            })?
            .is_some();
        if exists {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!("Order {} not found", order_id)))
        }
    }

    async fn find_model(&self, document_id: Uuid) -> Result<order_document::Model, ServiceError> {
        order_document::Entity::find_by_id(document_id)
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, document_id = %document_id, "Failed to fetch document");
                ServiceError::from(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Document {} not found", document_id)))
    }

    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event).await;
        }
    }
}
