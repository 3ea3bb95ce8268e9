use std::collections::{BTreeMap, HashSet};

use axum::http::HeaderMap;

use crate::config::StatsOptions;

/// Replacement for every masked value.
pub const MASK: &str = "*****";

/// Scrubs sensitive query parameters and headers before they are stored in
/// an [`ErrorRecord`](crate::metrics::ErrorRecord).
///
/// Name sets are lower-cased once here; lookups lower-case only the name being checked.
#[derive(Debug, Clone, Default)]
pub struct Masker {
    query_parameters: HashSet<String>,
    headers: HashSet<String>,
}

impl Masker {
    pub fn new<Q, H>(query_parameters: Q, headers: H) -> Self
    where
        Q: IntoIterator,
        Q::Item: AsRef<str>,
        H: IntoIterator,
        H::Item: AsRef<str>,
    {
        Self {
            query_parameters: lowercase_set(query_parameters),
            headers: lowercase_set(headers),
        }
    }

    pub fn from_options(options: &StatsOptions) -> Self {
        Self::new(&options.mask_query_parameters, &options.mask_headers)
    }

    pub fn is_masked_parameter(&self, name: &str) -> bool {
        self.query_parameters.contains(&name.to_lowercase())
    }

    pub fn is_masked_header(&self, name: &str) -> bool {
        self.headers.contains(&name.to_lowercase())
    }

    /// `?a=1&password=x` → `?a=1&password=*****`.
    ///
    /// A leading `?` is optional on input and always present on non-empty
    /// output. Empty segments are dropped; segments without `=` pass through.
    pub fn mask_query_string(&self, query: &str) -> String {
        let raw = query.strip_prefix('?').unwrap_or(query);
        let parts: Vec<String> = raw
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((name, _)) if self.is_masked_parameter(name) => format!("{name}={MASK}"),
                _ => part.to_owned(),
            })
            .collect();

        if parts.is_empty() {
            String::new()
        } else {
            format!("?{}", parts.join("&"))
        }
    }

    /// Header name → value, with masked names replaced by [`MASK`].
    /// Repeated headers are joined with `", "`.
    pub fn mask_headers(&self, headers: &HeaderMap) -> BTreeMap<String, String> {
        let mut masked: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in headers {
            let name = name.as_str();
            if self.is_masked_header(name) {
                masked.insert(name.to_owned(), MASK.to_owned());
                continue;
            }

            let rendered = String::from_utf8_lossy(value.as_bytes()).into_owned();
            masked
                .entry(name.to_owned())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&rendered);
                })
                .or_insert(rendered);
        }
        masked
    }
}

fn lowercase_set<I>(names: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn masker() -> Masker {
        Masker::from_options(&StatsOptions::default())
    }

    #[test]
    fn masks_listed_parameters_case_insensitively() {
        let masked = masker().mask_query_string("?page=2&Password=hunter2&api_key=abc");
        assert_eq!(masked, "?page=2&Password=*****&api_key=*****");
    }

    #[test]
    fn leading_question_mark_is_optional() {
        assert_eq!(masker().mask_query_string("token=t&x=1"), "?token=*****&x=1");
    }

    #[test]
    fn empty_and_degenerate_queries() {
        let m = masker();
        assert_eq!(m.mask_query_string(""), "");
        assert_eq!(m.mask_query_string("?"), "");
        assert_eq!(m.mask_query_string("&&"), "");
        assert_eq!(m.mask_query_string("?flag&&token"), "?flag&token");
    }

    #[test]
    fn value_may_contain_equals() {
        assert_eq!(
            masker().mask_query_string("?q=a=b&token=x=y"),
            "?q=a=b&token=*****"
        );
    }

    #[test]
    fn masks_sensitive_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret"));
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        headers.append("cookie", HeaderValue::from_static("a=1"));
        headers.append("cookie", HeaderValue::from_static("b=2"));
        headers.append("accept", HeaderValue::from_static("text/html"));
        headers.append("accept", HeaderValue::from_static("application/json"));

        let masked = masker().mask_headers(&headers);
        assert_eq!(masked["authorization"], MASK);
        assert_eq!(masked["cookie"], MASK);
        assert_eq!(masked["x-request-id"], "abc");
        assert_eq!(masked["accept"], "text/html, application/json");
    }

    #[test]
    fn configured_names_are_normalized_once() {
        let m = Masker::new(["X-Api-Key"], ["X-Secret"]);
        assert!(m.is_masked_parameter("x-api-key"));
        assert!(m.is_masked_header("x-secret"));
        assert!(!m.is_masked_header("authorization"));
    }
}
