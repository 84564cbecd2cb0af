// SPDX-License-Identifier: Apache-2.0

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::{default_backoff, grpc_backoff, is_retryable_grpc_status, is_retryable_kube_error};
    use std::time::Duration;

    #[test]
    fn backoff_configuration() {
        let backoff = default_backoff();

        assert_eq!(backoff.initial_interval, Duration::from_millis(100));
        assert_eq!(backoff.max_interval, Duration::from_secs(30));
        assert_eq!(backoff.max_elapsed_time, Some(Duration::from_secs(300)));
        #[allow(clippy::float_cmp)]
        {
            assert_eq!(backoff.multiplier, 2.0);
            assert_eq!(backoff.randomization_factor, 0.1);
        }
    }

    #[test]
    fn grpc_backoff_is_shorter_than_kube_backoff() {
        let kube = default_backoff();
        let grpc = grpc_backoff();

        assert!(grpc.max_interval < kube.max_interval);
        assert!(grpc.max_elapsed_time < kube.max_elapsed_time);
    }

    #[test]
    fn rate_limit_is_retryable() {
        let err = kube::Error::Api(kube::error::ErrorResponse {
            status: "Too Many Requests".to_string(),
            message: "Rate limit exceeded".to_string(),
            reason: "TooManyRequests".to_string(),
            code: 429,
        });
        assert!(is_retryable_kube_error(&err));
    }

    #[test]
    fn server_errors_are_retryable() {
        for code in [500, 503, 599] {
            let err = kube::Error::Api(kube::error::ErrorResponse {
                status: "Server Error".to_string(),
                message: "Server error".to_string(),
                reason: "ServerError".to_string(),
                code,
            });
            assert!(is_retryable_kube_error(&err), "{code} should be retryable");
        }
    }

    #[test]
    fn client_errors_other_than_429_are_not_retryable() {
        for code in [400, 404, 401] {
            let err = kube::Error::Api(kube::error::ErrorResponse {
                status: "Client Error".to_string(),
                message: "Client error".to_string(),
                reason: "ClientError".to_string(),
                code,
            });
            assert!(!is_retryable_kube_error(&err), "{code} should not be retryable");
        }
    }

    #[test]
    fn service_errors_are_retryable() {
        let service_error: Box<dyn std::error::Error + Send + Sync> =
            Box::new(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection failed"));
        let err = kube::Error::Service(service_error);
        assert!(is_retryable_kube_error(&err));
    }

    #[test]
    fn unavailable_and_deadline_exceeded_grpc_statuses_are_retryable() {
        assert!(is_retryable_grpc_status(&tonic::Status::unavailable("down")));
        assert!(is_retryable_grpc_status(&tonic::Status::deadline_exceeded("slow")));
        assert!(is_retryable_grpc_status(&tonic::Status::resource_exhausted("busy")));
    }

    #[test]
    fn invalid_argument_grpc_status_is_not_retryable() {
        assert!(!is_retryable_grpc_status(&tonic::Status::invalid_argument("bad input")));
        assert!(!is_retryable_grpc_status(&tonic::Status::not_found("missing")));
    }

    #[test]
    fn backoff_grows_exponentially_until_capped() {
        let mut backoff = default_backoff();
        let first = backoff.next_backoff().unwrap();
        let second = backoff.next_backoff().unwrap();
        assert!(second > first, "second interval should be larger than the first");

        for _ in 0..20 {
            backoff.next_backoff();
        }
        assert_eq!(backoff.current_interval, backoff.max_interval);
    }

    #[test]
    fn max_elapsed_time_is_reasonable() {
        let backoff = default_backoff();
        let max_secs = backoff.max_elapsed_time.unwrap().as_secs();
        assert!((60..=600).contains(&max_secs));
    }
}
