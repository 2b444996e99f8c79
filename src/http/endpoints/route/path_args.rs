//! Route parameters captured while matching a path

use smallvec::SmallVec;
use crate::error::Error;

const DEFAULT_ARGS: usize = 4;

/// Parameters of a matched route in the order they appear in the path
pub(crate) type PathArgs = SmallVec<[PathArg; DEFAULT_ARGS]>;

/// A single `name=value` route parameter
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PathArg {
    pub(crate) name: Box<str>,
    pub(crate) value: Box<str>,
}

/// Joins the parameters into `name=value&...` so they can be deserialized
/// the same way as a query string
pub(crate) fn make_query_str(args: &PathArgs) -> Result<String, Error> {
    if args.is_empty() {
        return Err(Error::client_error("Path parsing error: missing arguments"));
    }

    let capacity = args.iter().map(|a| a.name.len() + a.value.len() + 2).sum();
    let mut query = String::with_capacity(capacity);
    for arg in args {
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&arg.name);
        query.push('=');
        query.push_str(&arg.value);
    }
    Ok(query)
}
