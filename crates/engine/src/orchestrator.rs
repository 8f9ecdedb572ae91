use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use abasto_core::config::NegotiationConfig;
use abasto_core::domain::company::CompanyId;
use abasto_core::domain::job::{JobId, JobKind, JobState, ScheduledJob};
use abasto_core::domain::preorder::{
    CartLineItem, PreOrder, PreOrderAggregate, PreOrderCriteria, PreOrderId, PreOrderProduct,
    PreOrderStatus,
};
use abasto_db::repositories::{CompanyRepository, JobQueue, PreOrderRepository};

use crate::errors::EngineError;
use crate::notify::{Notifier, PreOrderCreatedEvent};

/// Per-provider result of a cart fan-out. One provider failing leaves the
/// sibling groups untouched.
#[derive(Clone, Debug)]
pub enum ProviderGroupOutcome {
    Created(PreOrder),
    Failed { provider_id: CompanyId, reason: String },
}

/// Splits a buyer's cart into one pre-order per provider and schedules the
/// response and timeout jobs for each.
pub struct PreOrderOrchestrator {
    companies: Arc<dyn CompanyRepository>,
    pre_orders: Arc<dyn PreOrderRepository>,
    jobs: Arc<dyn JobQueue>,
    notifier: Arc<dyn Notifier>,
    config: NegotiationConfig,
}

impl PreOrderOrchestrator {
    pub fn new(
        companies: Arc<dyn CompanyRepository>,
        pre_orders: Arc<dyn PreOrderRepository>,
        jobs: Arc<dyn JobQueue>,
        notifier: Arc<dyn Notifier>,
        config: NegotiationConfig,
    ) -> Self {
        Self { companies, pre_orders, jobs, notifier, config }
    }

    /// Fan a cart out into per-provider pre-orders at the given negotiation
    /// instance. The criteria snapshot is persisted verbatim with each group.
    pub async fn create_pre_orders(
        &self,
        cart: &[CartLineItem],
        buyer_user_id: &str,
        criteria: &PreOrderCriteria,
        instance: u32,
    ) -> Result<Vec<ProviderGroupOutcome>, EngineError> {
        if cart.is_empty() {
            return Err(EngineError::InvalidRequest("cart has no line items".to_string()));
        }

        let buyer = self
            .companies
            .find_by_user(buyer_user_id)
            .await?
            .ok_or_else(|| EngineError::not_found("buyer company", buyer_user_id))?;

        let mut outcomes = Vec::new();
        for (provider_id, lines) in group_by_provider(cart) {
            match self.create_group(&buyer.id, buyer_user_id, &provider_id, &lines, criteria, instance).await
            {
                Ok(pre_order) => outcomes.push(ProviderGroupOutcome::Created(pre_order)),
                Err(error) => {
                    tracing::warn!(
                        event_name = "negotiation.fan_out.group_failed",
                        provider_company_id = %provider_id.0,
                        error = %error,
                        "provider group failed, continuing with siblings"
                    );
                    outcomes.push(ProviderGroupOutcome::Failed {
                        provider_id,
                        reason: error.to_string(),
                    });
                }
            }
        }
        Ok(outcomes)
    }

    async fn create_group(
        &self,
        client_company_id: &CompanyId,
        buyer_user_id: &str,
        provider_id: &CompanyId,
        lines: &[&CartLineItem],
        criteria: &PreOrderCriteria,
        instance: u32,
    ) -> Result<PreOrder, EngineError> {
        let provider = self
            .companies
            .find_by_id(provider_id)
            .await?
            .ok_or_else(|| EngineError::not_found("provider company", &provider_id.0))?;

        let now = Utc::now();
        let pre_order_id = PreOrderId(Uuid::new_v4().to_string());
        let sequence = self.pre_orders.next_sequence().await?;
        let pre_order = PreOrder {
            id: pre_order_id.clone(),
            sequence,
            buyer_user_id: buyer_user_id.to_string(),
            status: PreOrderStatus::Pending,
            instance,
            response_deadline: now + Duration::seconds(self.config.response_window_secs as i64),
            client_company_id: client_company_id.clone(),
            provider_company_id: provider.id.clone(),
            buy_order_id: None,
            created_at: now,
            updated_at: now,
        };

        let aggregate = PreOrderAggregate {
            pre_order: pre_order.clone(),
            criteria: criteria.clone(),
            lines: lines
                .iter()
                .map(|line| PreOrderProduct {
                    pre_order_id: pre_order_id.clone(),
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                })
                .collect(),
        };
        self.pre_orders.create(&aggregate).await?;

        self.jobs
            .enqueue(ScheduledJob {
                id: JobId(Uuid::new_v4().to_string()),
                kind: JobKind::ProcessResponse,
                pre_order_id: pre_order_id.clone(),
                instance,
                run_at: now,
                attempts_left: 1,
                state: JobState::Pending,
                created_at: now,
            })
            .await?;
        self.jobs
            .enqueue(ScheduledJob {
                id: JobId(Uuid::new_v4().to_string()),
                kind: JobKind::Timeout,
                pre_order_id: pre_order_id.clone(),
                instance,
                run_at: pre_order.response_deadline,
                attempts_left: self.config.timeout_attempts,
                state: JobState::Pending,
                created_at: now,
            })
            .await?;

        self.notifier
            .pre_order_created(PreOrderCreatedEvent {
                pre_order_id,
                client_company_id: client_company_id.clone(),
                provider_company_id: provider.id,
                buyer_user_id: buyer_user_id.to_string(),
                instance,
                line_count: aggregate.lines.len(),
            })
            .await;

        Ok(pre_order)
    }
}

/// Groups cart lines by provider, preserving first-seen provider order.
fn group_by_provider(cart: &[CartLineItem]) -> Vec<(CompanyId, Vec<&CartLineItem>)> {
    let mut groups: Vec<(CompanyId, Vec<&CartLineItem>)> = Vec::new();
    for line in cart {
        match groups.iter_mut().find(|(provider, _)| *provider == line.provider_id) {
            Some((_, lines)) => lines.push(line),
            None => groups.push((line.provider_id.clone(), vec![line])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use abasto_core::domain::company::CompanyId;
    use abasto_core::domain::preorder::CartLineItem;
    use abasto_core::domain::product::ProductId;

    use super::group_by_provider;

    fn line(product: &str, provider: &str) -> CartLineItem {
        CartLineItem {
            product_id: ProductId(product.to_string()),
            provider_id: CompanyId(provider.to_string()),
            quantity: 1,
        }
    }

    #[test]
    fn grouping_preserves_first_seen_provider_order() {
        let cart =
            vec![line("p1", "prov-b"), line("p2", "prov-a"), line("p3", "prov-b")];
        let groups = group_by_provider(&cart);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0 .0, "prov-b");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0 .0, "prov-a");
        assert_eq!(groups[1].1.len(), 1);
    }
}
