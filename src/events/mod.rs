use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Default capacity of the event channel created at startup
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Sends domain events to the audit consumer
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing the caller.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "Failed to publish event");
        }
    }
}

/// Things that happened to stored records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    SupplierCreated(Uuid),
    SupplierUpdated(Uuid),
    SupplierDeleted(Uuid),

    CarrierCreated(Uuid),
    CarrierUpdated(Uuid),
    CarrierDeleted(Uuid),

    DestinationCreated(Uuid),
    DestinationUpdated(Uuid),
    DestinationDeleted(Uuid),

    OrderCreated(Uuid),
    OrderUpdated(Uuid),
    OrderDeleted {
        order_id: Uuid,
        documents_removed: usize,
    },

    DocumentUploaded {
        order_id: Uuid,
        document_id: Uuid,
    },
    DocumentRenamed {
        document_id: Uuid,
        name: String,
    },
    DocumentDeleted {
        order_id: Uuid,
        document_id: Uuid,
    },

    UserCreated(Uuid),
    UserDeleted(Uuid),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::SupplierCreated(_) => "supplier.created",
            Event::SupplierUpdated(_) => "supplier.updated",
            Event::SupplierDeleted(_) => "supplier.deleted",
            Event::CarrierCreated(_) => "carrier.created",
            Event::CarrierUpdated(_) => "carrier.updated",
            Event::CarrierDeleted(_) => "carrier.deleted",
            Event::DestinationCreated(_) => "destination.created",
            Event::DestinationUpdated(_) => "destination.updated",
            Event::DestinationDeleted(_) => "destination.deleted",
            Event::OrderCreated(_) => "order.created",
            Event::OrderUpdated(_) => "order.updated",
            Event::OrderDeleted { .. } => "order.deleted",
            Event::DocumentUploaded { .. } => "document.uploaded",
            Event::DocumentRenamed { .. } => "document.renamed",
            Event::DocumentDeleted { .. } => "document.deleted",
            Event::UserCreated(_) => "user.created",
            Event::UserDeleted(_) => "user.deleted",
        }
    }

    /// Id of the record the event is about
    pub fn subject_id(&self) -> Uuid {
        match self {
            Event::SupplierCreated(id)
            | Event::SupplierUpdated(id)
            | Event::SupplierDeleted(id)
            | Event::CarrierCreated(id)
            | Event::CarrierUpdated(id)
            | Event::CarrierDeleted(id)
            | Event::DestinationCreated(id)
            | Event::DestinationUpdated(id)
            | Event::DestinationDeleted(id)
            | Event::OrderCreated(id)
            | Event::OrderUpdated(id)
            | Event::UserCreated(id)
            | Event::UserDeleted(id) => *id,
            Event::OrderDeleted { order_id, .. } => *order_id,
            Event::DocumentUploaded { document_id, .. }
            | Event::DocumentRenamed { document_id, .. }
            | Event::DocumentDeleted { document_id, .. } => *document_id,
        }
    }
}

/// Consumes events until every sender is dropped, writing one audit line per event.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderDeleted {
                order_id,
                documents_removed,
            } => info!(
                target: "audit",
                event = event.name(),
                order_id = %order_id,
                documents_removed,
                "Order deleted"
            ),
            Event::DocumentUploaded {
                order_id,
                document_id,
            }
            | Event::DocumentDeleted {
                order_id,
                document_id,
            } => info!(
                target: "audit",
                event = event.name(),
                order_id = %order_id,
                document_id = %document_id,
                "Document changed"
            ),
            Event::DocumentRenamed { document_id, name } => info!(
                target: "audit",
                event = event.name(),
                document_id = %document_id,
                name = %name,
                "Document renamed"
            ),
            _ => info!(
                target: "audit",
                event = event.name(),
                subject_id = %event.subject_id(),
                "Record changed"
            ),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();

        sender.send(Event::SupplierCreated(id)).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received, Event::SupplierCreated(id));
        assert_eq!(received.name(), "supplier.created");
        assert_eq!(received.subject_id(), id);
    }

    #[tokio::test]
    async fn send_fails_once_consumer_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::UserDeleted(Uuid::new_v4())).await.is_err());
        // Never panics or errors for the caller.
        sender.send_or_log(Event::UserDeleted(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn processing_loop_ends_when_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(process_events(rx));
        let sender = EventSender::new(tx);
        sender
            .send(Event::DocumentRenamed {
                document_id: Uuid::new_v4(),
                name: "invoice.pdf".into(),
            })
            .await
            .unwrap();
        drop(sender);
        handle.await.unwrap();
    }
}
