pub mod auth;
pub mod carriers;
pub mod common;
pub mod dashboard;
pub mod destinations;
pub mod documents;
pub mod lookups;
pub mod orders;
pub mod suppliers;
pub mod users;

use std::sync::Arc;

use crate::{
    auth::session::SessionHub,
    cache::QueryCache,
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        contacts::{CarrierService, DestinationService, SupplierService},
        dashboard::DashboardService,
        documents::DocumentService,
        lookups::LookupService,
        orders::OrderService,
        users::UserService,
    },
    storage::ObjectStorage,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub suppliers: Arc<SupplierService>,
    pub carriers: Arc<CarrierService>,
    pub destinations: Arc<DestinationService>,
    pub orders: Arc<OrderService>,
    pub documents: Arc<DocumentService>,
    pub dashboard: Arc<DashboardService>,
    pub lookups: Arc<LookupService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
        cache: QueryCache,
        storage: Arc<dyn ObjectStorage>,
        sessions: SessionHub,
    ) -> Self {
        let events = Some(event_sender);

        let suppliers = Arc::new(SupplierService::new(
            db_pool.clone(),
            events.clone(),
            cache.clone(),
        ));
        let carriers = Arc::new(CarrierService::new(
            db_pool.clone(),
            events.clone(),
            cache.clone(),
        ));
        let destinations = Arc::new(DestinationService::new(
            db_pool.clone(),
            events.clone(),
            cache.clone(),
        ));
        let documents = DocumentService::new(
            db_pool.clone(),
            events.clone(),
            storage,
            config.storage.public_base_url.clone(),
            config.storage.max_upload_bytes,
        );
        let orders = Arc::new(OrderService::new(
            db_pool.clone(),
            events.clone(),
            cache.clone(),
            documents.clone(),
            config.storage.purge_on_order_delete,
        ));
        let dashboard = Arc::new(DashboardService::new(orders.clone()));
        let lookups = Arc::new(LookupService::new(
            db_pool.clone(),
            cache,
            suppliers.clone(),
            carriers.clone(),
            destinations.clone(),
        ));
        let users = Arc::new(UserService::new(db_pool, events, sessions));

        Self {
            suppliers,
            carriers,
            destinations,
            orders,
            documents: Arc::new(documents),
            dashboard,
            lookups,
            users,
        }
    }
}
