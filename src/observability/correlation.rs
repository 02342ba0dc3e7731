//! Correlation id propagation.
//!
//! # Responsibilities
//! - Extract the correlation id from incoming requests
//! - Generate one when the caller did not send a usable id
//! - Propagate the same id to every downstream request
//!
//! # Design Decisions
//! - Ids are opaque tokens: adopted verbatim, never parsed
//! - Only length and charset are bounded (visible ASCII, configurable max)
//!   so a client cannot smuggle line breaks or huge values into log records
//! - The context is an explicit request-scoped value (request extension),
//!   never a global, so concurrent requests stay isolated

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::InvalidHeaderName;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

use crate::config::CorrelationConfig;
use crate::http::error::ApiError;

/// Correlation data carried through one logical request.
///
/// Created (or adopted) when request handling starts and immutable after
/// that. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationContext {
    trace_id: Arc<str>,
    service_name: Arc<str>,
}

impl CorrelationContext {
    pub fn new(trace_id: impl Into<Arc<str>>, service_name: impl Into<Arc<str>>) -> Self {
        Self {
            trace_id: trace_id.into(),
            service_name: service_name.into(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

/// Handlers receive the context the instrumentation middleware resolved.
impl<S> FromRequestParts<S> for CorrelationContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CorrelationContext>()
            .cloned()
            .ok_or_else(|| {
                ApiError::internal("Internal server error")
                    .with_detail("correlation context missing; route is not instrumented")
            })
    }
}

/// Why a client-supplied id was not adopted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    TooLong,
    Charset,
}

impl Rejection {
    fn as_str(&self) -> &'static str {
        match self {
            Rejection::TooLong => "too_long",
            Rejection::Charset => "charset",
        }
    }
}

/// Resolves and propagates the correlation header.
#[derive(Debug, Clone)]
pub struct CorrelationPropagator {
    header: HeaderName,
    service_name: Arc<str>,
    max_length: usize,
}

impl CorrelationPropagator {
    pub fn new(
        service_name: impl Into<Arc<str>>,
        config: &CorrelationConfig,
    ) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            header: HeaderName::try_from(config.header.as_str())?,
            service_name: service_name.into(),
            max_length: config.max_length,
        })
    }

    /// Header name used inbound, outbound and on responses.
    pub fn header_name(&self) -> &HeaderName {
        &self.header
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Adopt the inbound id or generate a fresh one.
    ///
    /// A missing or blank header is the normal case for the chain's entry
    /// service and is not an error.
    pub fn resolve(&self, headers: &HeaderMap) -> CorrelationContext {
        let supplied = headers
            .get(&self.header)
            .map(HeaderValue::as_bytes)
            .filter(|value| !value.iter().all(u8::is_ascii_whitespace));

        match supplied.map(|value| self.check(value)) {
            Some(Ok(trace_id)) => CorrelationContext::new(trace_id, self.service_name.clone()),
            Some(Err((rejection, length))) => {
                let ctx = self.generate();
                tracing::warn!(
                    service = %ctx.service_name(),
                    trace_id = %ctx.trace_id(),
                    rejected_length = length,
                    reason = rejection.as_str(),
                    "Rejected inbound correlation id, generated a new one"
                );
                ctx
            }
            None => self.generate(),
        }
    }

    /// Set the correlation header on a downstream request.
    pub fn attach(
        &self,
        request: reqwest::RequestBuilder,
        ctx: &CorrelationContext,
    ) -> reqwest::RequestBuilder {
        request.header(self.header.clone(), ctx.trace_id())
    }

    /// Header value echoing the id back to the caller.
    pub fn response_value(&self, ctx: &CorrelationContext) -> Option<HeaderValue> {
        HeaderValue::from_str(ctx.trace_id()).ok()
    }

    fn generate(&self) -> CorrelationContext {
        CorrelationContext::new(Uuid::new_v4().to_string(), self.service_name.clone())
    }

    fn check<'a>(&self, value: &'a [u8]) -> Result<&'a str, (Rejection, usize)> {
        if value.len() > self.max_length {
            return Err((Rejection::TooLong, value.len()));
        }
        if !value.iter().all(u8::is_ascii_graphic) {
            return Err((Rejection::Charset, value.len()));
        }
        std::str::from_utf8(value).map_err(|_| (Rejection::Charset, value.len()))
    }
}
