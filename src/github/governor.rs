// src/github/governor.rs
// =============================================================================
// The rate-limit governor wraps every GraphQL call the crawl makes.
//
// Policy:
// - First throttle signal for a call: log when we will resume, sleep for
//   the provider's delay, try again
// - Second throttle for the same call: log that we are giving up and
//   return the error
//
// The retry counter lives inside `call`, so each logical call gets its own
// budget of one retry. Nothing is shared between calls.
// =============================================================================

use chrono::Utc;
use tracing::warn;

use super::client::{GraphqlRequest, GraphqlResponse, Transport};
use crate::error::{ApiError, Throttle};

// Retries allowed per call after a throttle signal
const MAX_RETRIES: u32 = 1;

pub struct Governor<T> {
    transport: T,
}

impl<T: Transport> Governor<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // Executes one GraphQL call, retrying once after a throttle
    //
    // Returns: the response envelope, or the error from the last attempt
    pub async fn call(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, ApiError> {
        let mut retries = 0;

        loop {
            match self.transport.execute(request).await {
                Err(ApiError::Throttled(throttle)) => {
                    if retries >= MAX_RETRIES {
                        warn!(
                            operation = request.operation,
                            kind = %throttle.kind,
                            "{} hit again during {}; giving up on this call",
                            throttle.kind,
                            request.operation,
                        );
                        return Err(ApiError::Throttled(throttle));
                    }
                    retries += 1;
                    log_throttle(request.operation, &throttle);
                    tokio::time::sleep(throttle.retry_after).await;
                }
                other => return other,
            }
        }
    }
}

fn log_throttle(operation: &str, throttle: &Throttle) {
    let delay = chrono::Duration::from_std(throttle.retry_after)
        .unwrap_or_else(|_| chrono::Duration::zero());
    let resume_at = Utc::now() + delay;

    warn!(
        operation,
        kind = %throttle.kind,
        delay_secs = throttle.retry_after.as_secs(),
        "{} hit during {}; retrying at {}",
        throttle.kind,
        operation,
        resume_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThrottleKind;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // Plays back a fixed list of outcomes, one per call
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<Result<GraphqlResponse, ApiError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<Result<GraphqlResponse, ApiError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, _request: &GraphqlRequest) -> Result<GraphqlResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(GraphqlResponse::default()))
        }
    }

    fn ok() -> Result<GraphqlResponse, ApiError> {
        Ok(GraphqlResponse {
            data: Some(json!({"ok": true})),
            errors: vec![],
        })
    }

    fn throttled(kind: ThrottleKind) -> Result<GraphqlResponse, ApiError> {
        Err(ApiError::Throttled(Throttle::immediate(kind)))
    }

    fn request() -> GraphqlRequest {
        GraphqlRequest::new("test", "query { viewer { login } }", json!({}))
    }

    #[tokio::test]
    async fn test_success_is_not_retried() {
        let governor = Governor::new(ScriptedTransport::new(vec![ok()]));
        assert!(governor.call(&request()).await.is_ok());
        assert_eq!(governor.transport().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_throttle_is_retried_once() {
        let governor = Governor::new(ScriptedTransport::new(vec![
            throttled(ThrottleKind::Primary),
            ok(),
        ]));
        assert!(governor.call(&request()).await.is_ok());
        assert_eq!(governor.transport().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_throttle_propagates() {
        let governor = Governor::new(ScriptedTransport::new(vec![
            throttled(ThrottleKind::Secondary),
            throttled(ThrottleKind::Secondary),
            ok(),
        ]));
        let err = governor.call(&request()).await.unwrap_err();
        assert!(err.is_throttled());
        assert_eq!(governor.transport().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_budget_is_per_call() {
        let governor = Governor::new(ScriptedTransport::new(vec![
            throttled(ThrottleKind::Primary),
            ok(),
            throttled(ThrottleKind::Primary),
            ok(),
        ]));
        assert!(governor.call(&request()).await.is_ok());
        assert!(governor.call(&request()).await.is_ok());
        assert_eq!(governor.transport().calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let governor = Governor::new(ScriptedTransport::new(vec![
            Err(ApiError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            }),
            ok(),
        ]));
        assert!(governor.call(&request()).await.is_err());
        assert_eq!(governor.transport().calls.load(Ordering::SeqCst), 1);
    }
}
