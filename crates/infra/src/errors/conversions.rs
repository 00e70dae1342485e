//! Conversions from external infrastructure errors into domain errors.

use authgate_domain::AuthGateError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub AuthGateError);

impl From<InfraError> for AuthGateError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<AuthGateError> for InfraError {
    fn from(value: AuthGateError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoAuthGateError {
    fn into_authgate(self) -> AuthGateError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → AuthGateError */
/* -------------------------------------------------------------------------- */

impl IntoAuthGateError for HttpError {
    fn into_authgate(self) -> AuthGateError {
        if self.is_timeout() {
            return AuthGateError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return AuthGateError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
            return AuthGateError::Upstream { status: code, body: message };
        }

        if self.is_decode() {
            return AuthGateError::Upstream {
                status: 200,
                body: format!("undecodable body: {self}"),
            };
        }

        AuthGateError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_authgate())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → AuthGateError */
/* -------------------------------------------------------------------------- */

impl IntoAuthGateError for std::io::Error {
    fn into_authgate(self) -> AuthGateError {
        match self.kind() {
            std::io::ErrorKind::AddrInUse | std::io::ErrorKind::AddrNotAvailable => {
                AuthGateError::Config(format!("cannot bind listener: {self}"))
            }
            _ => AuthGateError::Internal(format!("I/O failure: {self}")),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_authgate())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
