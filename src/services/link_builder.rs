/// Query parameter carrying the login token in redemption links.
pub const TOKEN_QUERY_PARAM: &str = "byToken";

pub trait RedemptionUrlBuilder: Send + Sync {
    /// Absolute URL that hands `token` to `target` for redemption.
    fn build(&self, token: &str, target: &str) -> String;
}

/// Joins a fixed origin, the target path and the token query parameters.
#[derive(Debug, Clone)]
pub struct QueryLinkBuilder {
    origin: String,
}

impl QueryLinkBuilder {
    pub fn new(origin: impl Into<String>) -> Self {
        let origin = origin.into();
        Self {
            origin: origin.trim_end_matches('/').to_string(),
        }
    }
}

impl RedemptionUrlBuilder for QueryLinkBuilder {
    fn build(&self, token: &str, target: &str) -> String {
        let path = if target.starts_with('/') {
            target.to_string()
        } else {
            format!("/{}", target)
        };
        let separator = if path.contains('?') { '&' } else { '?' };

        format!(
            "{}{}{}{}={}&logintype=login",
            self.origin,
            path,
            separator,
            TOKEN_QUERY_PARAM,
            urlencoding::encode(token)
        )
    }
}
