//! Conversions of handler results into HTTP responses

use super::{HttpResponse, HttpResult, HttpBody};
use crate::{Json, status, response};
use crate::error::Error;
use crate::http::StatusCode;
use crate::headers::{HeaderMap, CONTENT_TYPE};
use serde::Serialize;

use std::{
    io::Error as IoError,
    convert::Infallible,
    borrow::Cow
};

/// Trait for types that can be returned from handlers
pub trait IntoResponse {
    /// Converts a type into [`HttpResult`]
    fn into_response(self) -> HttpResult;
}

impl IntoResponse for HttpResponse {
    #[inline]
    fn into_response(self) -> HttpResult {
        Ok(self)
    }
}

impl IntoResponse for () {
    #[inline]
    fn into_response(self) -> HttpResult {
        status!(200)
    }
}

impl IntoResponse for IoError {
    #[inline]
    fn into_response(self) -> HttpResult {
        Err(self.into())
    }
}

impl IntoResponse for Error {
    #[inline]
    fn into_response(self) -> HttpResult {
        Err(self)
    }
}

impl IntoResponse for Infallible {
    #[inline]
    fn into_response(self) -> HttpResult {
        match self {}
    }
}

impl<T, E> IntoResponse for Result<T, E>
where
    T: IntoResponse,
    E: IntoResponse
{
    #[inline]
    fn into_response(self) -> HttpResult {
        match self {
            Ok(ok) => ok.into_response(),
            Err(err) => err.into_response(),
        }
    }
}

impl IntoResponse for &'static str {
    #[inline]
    fn into_response(self) -> HttpResult {
        Cow::Borrowed(self).into_response()
    }
}

impl IntoResponse for Cow<'static, str> {
    #[inline]
    fn into_response(self) -> HttpResult {
        response!(
            StatusCode::OK,
            HttpBody::from(self);
            [(CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.as_ref())]
        )
    }
}

impl IntoResponse for String {
    #[inline]
    fn into_response(self) -> HttpResult {
        Cow::<'static, str>::Owned(self).into_response()
    }
}

impl<T: IntoResponse> IntoResponse for Option<T> {
    #[inline]
    fn into_response(self) -> HttpResult {
        match self {
            Some(ok) => ok.into_response(),
            None => status!(404)
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    #[inline]
    fn into_response(self) -> HttpResult {
        status!(200, json: self.into_inner())
    }
}

impl IntoResponse for serde_json::Value {
    #[inline]
    fn into_response(self) -> HttpResult {
        status!(200, json: self)
    }
}

impl IntoResponse for StatusCode {
    #[inline]
    fn into_response(self) -> HttpResult {
        response!(self, HttpBody::empty())
    }
}

impl<R: IntoResponse> IntoResponse for (R, HeaderMap) {
    #[inline]
    fn into_response(self) -> HttpResult {
        let (resp, headers) = self;
        let mut resp = resp.into_response()?;
        resp.headers_mut().extend(headers);
        Ok(resp)
    }
}
