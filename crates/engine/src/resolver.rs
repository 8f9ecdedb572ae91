use std::collections::VecDeque;
use std::sync::Arc;

use abasto_core::config::NegotiationConfig;
use abasto_core::domain::preorder::{
    derive_response_status, PreOrder, PreOrderCriteria, PreOrderId, PreOrderProduct,
    PreOrderStatus, ResponseTrigger,
};
use abasto_core::domain::product::ProductId;
use abasto_db::repositories::{JobQueue, PreOrderRepository};

use crate::errors::EngineError;
use crate::notify::{BuyOrderPendingEvent, Notifier};
use crate::orchestrator::PreOrderOrchestrator;
use crate::replacement::ReplacementSelector;

/// Applies a provider's answer (or its absence) to a pending pre-order:
/// derives the terminal status, swaps it in atomically, and re-sources every
/// rejected line at the next negotiation instance.
pub struct ResponseResolver {
    pre_orders: Arc<dyn PreOrderRepository>,
    jobs: Arc<dyn JobQueue>,
    orchestrator: Arc<PreOrderOrchestrator>,
    selector: Arc<ReplacementSelector>,
    notifier: Arc<dyn Notifier>,
    config: NegotiationConfig,
}

impl ResponseResolver {
    pub fn new(
        pre_orders: Arc<dyn PreOrderRepository>,
        jobs: Arc<dyn JobQueue>,
        orchestrator: Arc<PreOrderOrchestrator>,
        selector: Arc<ReplacementSelector>,
        notifier: Arc<dyn Notifier>,
        config: NegotiationConfig,
    ) -> Self {
        Self { pre_orders, jobs, orchestrator, selector, notifier, config }
    }

    pub async fn handle_provider_response(
        &self,
        pre_order_id: &PreOrderId,
        accepted: &[ProductId],
        rejected: &[ProductId],
        trigger: ResponseTrigger,
        instance: u32,
    ) -> Result<PreOrder, EngineError> {
        let aggregate = self
            .pre_orders
            .find_aggregate(pre_order_id)
            .await?
            .ok_or_else(|| EngineError::not_found("pre-order", &pre_order_id.0))?;

        if aggregate.pre_order.status != PreOrderStatus::Pending {
            tracing::info!(
                event_name = "negotiation.resolve.already_resolved",
                pre_order_id = %pre_order_id.0,
                status = aggregate.pre_order.status.as_str(),
                trigger = trigger.as_str(),
                "pre-order already resolved, ignoring trigger"
            );
            return Ok(aggregate.pre_order);
        }

        // A timeout answers for the provider: every line counts as rejected.
        let rejected: Vec<ProductId> = match trigger {
            ResponseTrigger::Timeout => {
                aggregate.lines.iter().map(|line| line.product_id.clone()).collect()
            }
            ResponseTrigger::ProviderResponse => rejected.to_vec(),
        };
        let accepted: Vec<ProductId> = match trigger {
            ResponseTrigger::Timeout => Vec::new(),
            ResponseTrigger::ProviderResponse => accepted.to_vec(),
        };
        validate_response(&aggregate.lines, &accepted, &rejected)?;

        let status = match trigger {
            ResponseTrigger::Timeout => PreOrderStatus::Timeout,
            ResponseTrigger::ProviderResponse => {
                match derive_response_status(!accepted.is_empty(), !rejected.is_empty()) {
                    Some(status) => status,
                    None => {
                        tracing::info!(
                            event_name = "negotiation.resolve.empty_response",
                            pre_order_id = %pre_order_id.0,
                            "response carried no items, pre-order stays pending"
                        );
                        return Ok(aggregate.pre_order);
                    }
                }
            }
        };

        // Retry bound: a rejection at the last allowed instance goes terminal
        // without re-sourcing.
        let exhausted = !rejected.is_empty() && instance >= self.config.max_instance;
        let status = if exhausted { PreOrderStatus::Exhausted } else { status };

        let swapped = self.pre_orders.set_status_if_pending(pre_order_id, status).await?;
        if !swapped {
            let current = self
                .pre_orders
                .find_aggregate(pre_order_id)
                .await?
                .ok_or_else(|| EngineError::not_found("pre-order", &pre_order_id.0))?;
            tracing::info!(
                event_name = "negotiation.resolve.lost_race",
                pre_order_id = %pre_order_id.0,
                status = current.pre_order.status.as_str(),
                trigger = trigger.as_str(),
                "status already swapped by a concurrent trigger"
            );
            return Ok(current.pre_order);
        }
        self.jobs.cancel_for_pre_order(pre_order_id).await?;

        tracing::info!(
            event_name = "negotiation.resolve.status_set",
            pre_order_id = %pre_order_id.0,
            status = status.as_str(),
            trigger = trigger.as_str(),
            instance,
            "pre-order resolved"
        );

        if !accepted.is_empty() {
            self.notifier
                .buy_order_pending(BuyOrderPendingEvent {
                    pre_order_id: pre_order_id.clone(),
                    client_company_id: aggregate.pre_order.client_company_id.clone(),
                    provider_company_id: aggregate.pre_order.provider_company_id.clone(),
                    accepted_count: accepted.len(),
                })
                .await;
        }

        if !exhausted && !rejected.is_empty() {
            self.re_source_rejected(
                &aggregate.pre_order,
                &aggregate.criteria,
                &aggregate.lines,
                &rejected,
                instance,
            )
            .await?;
        } else if exhausted {
            tracing::warn!(
                event_name = "negotiation.resolve.exhausted",
                pre_order_id = %pre_order_id.0,
                instance,
                max_instance = self.config.max_instance,
                "retry budget spent, rejected lines will not be re-sourced"
            );
        }

        let mut resolved = aggregate.pre_order;
        resolved.status = status;
        Ok(resolved)
    }

    /// Drains the rejected lines through an explicit queue; each substitute
    /// found goes back through the orchestrator one instance deeper. A line
    /// that fails to re-source is logged and dropped, it never poisons the
    /// pre-order that was already resolved.
    async fn re_source_rejected(
        &self,
        pre_order: &PreOrder,
        criteria: &PreOrderCriteria,
        lines: &[PreOrderProduct],
        rejected: &[ProductId],
        instance: u32,
    ) -> Result<(), EngineError> {
        let mut queue: VecDeque<&PreOrderProduct> = lines
            .iter()
            .filter(|line| rejected.contains(&line.product_id))
            .collect();

        while let Some(line) = queue.pop_front() {
            let substitute = match self
                .selector
                .find_best_substitute(
                    &pre_order.client_company_id,
                    &line.product_id,
                    line.quantity,
                    criteria,
                )
                .await
            {
                Ok(Some(substitute)) => substitute,
                Ok(None) => continue,
                Err(error) => {
                    tracing::warn!(
                        event_name = "negotiation.re_source.selection_failed",
                        pre_order_id = %pre_order.id.0,
                        product_id = %line.product_id.0,
                        error = %error,
                        "substitute selection failed, dropping line"
                    );
                    continue;
                }
            };

            if let Err(error) = self
                .orchestrator
                .create_pre_orders(
                    std::slice::from_ref(&substitute),
                    &pre_order.buyer_user_id,
                    criteria,
                    instance + 1,
                )
                .await
            {
                tracing::warn!(
                    event_name = "negotiation.re_source.fan_out_failed",
                    pre_order_id = %pre_order.id.0,
                    product_id = %substitute.product_id.0,
                    error = %error,
                    "re-sourced fan-out failed, dropping line"
                );
            }
        }
        Ok(())
    }
}

fn validate_response(
    lines: &[PreOrderProduct],
    accepted: &[ProductId],
    rejected: &[ProductId],
) -> Result<(), EngineError> {
    for id in accepted.iter().chain(rejected) {
        if !lines.iter().any(|line| line.product_id == *id) {
            return Err(EngineError::InvalidRequest(format!(
                "product `{}` is not part of this pre-order",
                id.0
            )));
        }
    }
    if let Some(id) = accepted.iter().find(|id| rejected.contains(id)) {
        return Err(EngineError::InvalidRequest(format!(
            "product `{}` cannot be both accepted and rejected",
            id.0
        )));
    }
    Ok(())
}
