use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use domain::error::{DomainErrorKind, EntityErrorKind, Error as DomainError, InternalErrorKind};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{}", self.0)
    }
}

impl Error {
    fn status(&self) -> StatusCode {
        match &self.0.error_kind {
            DomainErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind)) => {
                match entity_error_kind {
                    EntityErrorKind::NotFound => StatusCode::NOT_FOUND,
                    EntityErrorKind::Invalid | EntityErrorKind::Conflict => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    EntityErrorKind::Forbidden => StatusCode::FORBIDDEN,
                    EntityErrorKind::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
                }
            }
            DomainErrorKind::Internal(
                InternalErrorKind::Broker | InternalErrorKind::Config | InternalErrorKind::Other(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("{self}");
        } else {
            debug!("{self}");
        }

        let message = match (&self.0.error_kind, &self.0.source) {
            // Validation messages are written for the client.
            (
                DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Invalid)),
                Some(source),
            ) => source.to_string(),
            _ => status
                .canonical_reason()
                .unwrap_or("UNKNOWN")
                .to_uppercase(),
        };

        (status, message).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
