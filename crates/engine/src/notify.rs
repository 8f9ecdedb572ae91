use abasto_core::domain::company::CompanyId;
use abasto_core::domain::preorder::PreOrderId;

/// Emitted once per provider group when a pre-order lands in the queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreOrderCreatedEvent {
    pub pre_order_id: PreOrderId,
    pub client_company_id: CompanyId,
    pub provider_company_id: CompanyId,
    pub buyer_user_id: String,
    pub instance: u32,
    pub line_count: usize,
}

/// Emitted when a resolution leaves accepted lines behind. The surrounding
/// order layer owns turning this into a firm buy order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuyOrderPendingEvent {
    pub pre_order_id: PreOrderId,
    pub client_company_id: CompanyId,
    pub provider_company_id: CompanyId,
    pub accepted_count: usize,
}

/// Outbound notification seam. Implementations must not fail the calling
/// flow; delivery problems are theirs to absorb.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn pre_order_created(&self, event: PreOrderCreatedEvent);
    async fn buy_order_pending(&self, event: BuyOrderPendingEvent);
}

/// Default notifier: structured log lines only.
pub struct TracingNotifier;

#[async_trait::async_trait]
impl Notifier for TracingNotifier {
    async fn pre_order_created(&self, event: PreOrderCreatedEvent) {
        tracing::info!(
            event_name = "negotiation.pre_order.created",
            pre_order_id = %event.pre_order_id.0,
            client_company_id = %event.client_company_id.0,
            provider_company_id = %event.provider_company_id.0,
            buyer_user_id = %event.buyer_user_id,
            instance = event.instance,
            line_count = event.line_count,
            "pre-order created"
        );
    }

    async fn buy_order_pending(&self, event: BuyOrderPendingEvent) {
        tracing::info!(
            event_name = "negotiation.buy_order.pending",
            pre_order_id = %event.pre_order_id.0,
            client_company_id = %event.client_company_id.0,
            provider_company_id = %event.provider_company_id.0,
            accepted_count = event.accepted_count,
            "buy order pending"
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use tokio::sync::Mutex;

    use super::{BuyOrderPendingEvent, Notifier, PreOrderCreatedEvent};

    /// Records every event for assertions.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub created: Mutex<Vec<PreOrderCreatedEvent>>,
        pub buy_orders: Mutex<Vec<BuyOrderPendingEvent>>,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn pre_order_created(&self, event: PreOrderCreatedEvent) {
            self.created.lock().await.push(event);
        }

        async fn buy_order_pending(&self, event: BuyOrderPendingEvent) {
            self.buy_orders.lock().await.push(event);
        }
    }
}
