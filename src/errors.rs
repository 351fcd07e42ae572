use miette::Diagnostic;
use thiserror::Error;

use crate::store::StoreError;
use crate::types::ReconcileOperation;

#[derive(Debug, Error, Diagnostic)]
pub enum ReconcileError {
    #[error("exceeded maximum attempts ({attempts}) reconciling role `{name}`")]
    #[diagnostic(
        code(rolewarden::reconcile::exceeded_attempts),
        help("Another actor is rapidly creating or deleting this role; retry once the churn settles")
    )]
    ExceededMaxAttempts { name: String, attempts: usize },

    #[error("invalid operation `{0}` for role `{1}`")]
    #[diagnostic(code(rolewarden::reconcile::invalid_operation))]
    InvalidOperation(ReconcileOperation, String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}
