use thiserror::Error;

use crate::domain::preorder::PreOrderStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid pre-order transition from {from:?} to {to:?}")]
    InvalidPreOrderTransition { from: PreOrderStatus, to: PreOrderStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}
