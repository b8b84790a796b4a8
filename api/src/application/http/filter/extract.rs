use axum::{
    Form,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    response::Response,
};

use listfilter_core::domain::filter::FilterInput;
use listfilter_core::domain::selection::PostedForm;

/// Extractor for the query string as the filter flow sees it
///
/// Usage:
/// ```rust
/// use axum::response::{IntoResponse, Response};
/// use listfilter_api::application::http::filter::{ApiError, FilterQuery};
///
/// async fn handler(
///     FilterQuery(query): FilterQuery,
/// ) -> Result<Response, ApiError> {
///     // query holds Filter-... params, pagination and control flags
///     Ok(format!("{} filter params", query.filter_params().len()).into_response())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FilterQuery(pub FilterInput);

impl<S> FromRequestParts<S> for FilterQuery
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query_string = parts.uri.query().unwrap_or("");
        // Pairs keep their arrival order so repeated bracketed keys
        // collapse into one multi-value entry.
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(query_string).unwrap_or_default();

        let mut input = FilterInput::new();
        for (name, value) in &pairs {
            input.push_raw(name, value);
        }

        Ok(FilterQuery(input))
    }
}

/// Extractor for a submitted filter form, the nested
/// `Filter[Entity][field]` body shape. Consumes the request body.
#[derive(Debug, Clone)]
pub struct PostedFilter(pub PostedForm);

impl<S> FromRequest<S> for PostedFilter
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let pairs = match Form::<Vec<(String, String)>>::from_request(req, state).await {
            Ok(Form(pairs)) => pairs,
            // An unreadable body counts as an empty submission.
            Err(_) => Vec::new(),
        };

        Ok(PostedFilter(PostedForm::from_pairs(pairs)))
    }
}
