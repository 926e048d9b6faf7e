//! Submit Review use case
//!
//! Gateway-side entry: stamp a client payload with a request id and put it
//! on `review.request`. The request id is returned so the client can match
//! the eventual terminal message.

use crate::ports::transport::{TransportError, TransportFabric, TransportFabricExt};
use chrono::Utc;
use magi_domain::{DomainError, QueueMessage, RequestId, ReviewRequest, SessionId};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while accepting a review request
#[derive(Error, Debug)]
pub enum SubmitReviewError {
    #[error("Invalid request: {0}")]
    Invalid(#[from] DomainError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

pub struct SubmitReviewUseCase<T: TransportFabric + ?Sized + 'static> {
    transport: Arc<T>,
}

impl<T: TransportFabric + ?Sized + 'static> SubmitReviewUseCase<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub async fn execute(
        &self,
        session_id: &SessionId,
        payload: String,
    ) -> Result<RequestId, SubmitReviewError> {
        let request = ReviewRequest::new(session_id.clone(), payload, Utc::now())?;
        let request_id = request.request_id;
        self.transport
            .enqueue(&QueueMessage::ReviewRequest(request))
            .await?;
        info!("Accepted review request {} from {}", request_id, session_id);
        Ok(request_id)
    }
}
