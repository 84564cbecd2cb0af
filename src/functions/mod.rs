// SPDX-License-Identifier: Apache-2.0

//! Function Runner Client: a thin gRPC client over the `RunFunction` RPC
//! (spec.md §4.6, §6). The client does not retry internally — retries are
//! the Operation Reconciler's concern (spec.md §4.6: "no global session").

pub mod generated {
    tonic::include_proto!("xrm.fn.v1");
}

use std::time::Duration;

use tonic::transport::{Channel, Endpoint};
use tonic::Request;

use generated::function_runner_client::FunctionRunnerClient as GeneratedClient;
pub use generated::{Credential, Result as FunctionResult, RunFunctionRequest, RunFunctionResponse, Severity, State};

use crate::constants::{FUNCTION_RUNNER_CALL_TIMEOUT_SECS, FUNCTION_RUNNER_DIAL_TIMEOUT_SECS};

/// Failure connecting to or calling a function's gRPC endpoint.
#[derive(Debug, thiserror::Error)]
pub enum FunctionRunnerError {
    #[error("failed to dial function endpoint {target}: {source}")]
    Connect { target: String, #[source] source: tonic::transport::Error },
    #[error("RunFunction call failed: {0}")]
    Call(#[from] tonic::Status),
}

/// A connected client for one [`crate::crd::Function`] endpoint.
pub struct FunctionRunnerClient {
    inner: GeneratedClient<Channel>,
}

impl FunctionRunnerClient {
    /// Dial `target` (a `Function`'s `spec.target`), optionally over TLS.
    ///
    /// # Errors
    /// Returns [`FunctionRunnerError::Connect`] if the endpoint cannot be
    /// reached within the dial timeout.
    pub async fn connect(target: &str, tls: bool) -> Result<Self, FunctionRunnerError> {
        let scheme = if tls { "https" } else { "http" };
        let uri = format!("{scheme}://{target}");
        let endpoint = Endpoint::from_shared(uri)
            .map_err(|source| FunctionRunnerError::Connect { target: target.to_string(), source })?
            .connect_timeout(Duration::from_secs(FUNCTION_RUNNER_DIAL_TIMEOUT_SECS))
            .timeout(Duration::from_secs(FUNCTION_RUNNER_CALL_TIMEOUT_SECS));
        let channel = endpoint
            .connect()
            .await
            .map_err(|source| FunctionRunnerError::Connect { target: target.to_string(), source })?;
        Ok(Self { inner: GeneratedClient::new(channel) })
    }

    /// Invoke `RunFunction`. A single blocking, stream-unary call; the
    /// caller decides whether a `Fatal` result in the response should be
    /// treated as a step failure (spec.md §4.5 step 4).
    ///
    /// # Errors
    /// Returns [`FunctionRunnerError::Call`] on any transport or gRPC-status
    /// level failure. It never interprets the response body as an error —
    /// that is the caller's job, since a response can carry `Fatal`
    /// results without the RPC itself failing.
    pub async fn run(
        &mut self,
        request: RunFunctionRequest,
    ) -> Result<RunFunctionResponse, FunctionRunnerError> {
        let response = self.inner.run_function(Request::new(request)).await?;
        Ok(response.into_inner())
    }
}

/// True if any result in `results` is `Fatal` (spec.md §4.5 step 4: "If any
/// result has severity Fatal, abort the pipeline").
#[must_use]
pub fn has_fatal_result(results: &[FunctionResult]) -> bool {
    results.iter().any(|r| r.severity == Severity::Fatal as i32)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
