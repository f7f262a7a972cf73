//! Correlation tags.
//!
//! Tags come from the `x-msb-tags` header, the `_x-msb-tags` query
//! parameter and the route's static bus configuration, in that order of
//! precedence. Every source is a comma-separated list.

use std::borrow::Cow;

use uuid::Uuid;

use crate::config::BusConfig;

/// Request header carrying comma-separated tags.
pub const TAGS_HEADER: &str = "x-msb-tags";

/// Query parameter carrying comma-separated tags.
pub const TAGS_QUERY_PARAM: &str = "_x-msb-tags";

fn split_tags(source: Option<&str>) -> Option<impl Iterator<Item = &str>> {
    source.filter(|s| !s.is_empty()).map(|s| s.split(','))
}

/// Derive the bus configuration for one request.
///
/// Without header or query tags the static configuration is returned as is.
/// Otherwise the tag list becomes header tags, then query tags, then static
/// tags, keeping the first occurrence of each.
pub fn resolve_bus_config<'a>(
    header_tags: Option<&str>,
    query_tags: Option<&str>,
    config: &'a BusConfig,
) -> Cow<'a, BusConfig> {
    let header = split_tags(header_tags);
    let query = split_tags(query_tags);
    if header.is_none() && query.is_none() {
        return Cow::Borrowed(config);
    }

    let mut tags: Vec<String> = Vec::new();
    let requested = header.into_iter().flatten().chain(query.into_iter().flatten());
    let configured = config.tags.iter().flatten().map(String::as_str);
    for tag in requested.chain(configured) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    Cow::Owned(BusConfig {
        tags: Some(tags),
        ..config.clone()
    })
}

/// Identity of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationContext {
    pub id: String,
    /// Message tags; led by `id` whenever the configuration has tags.
    pub tags: Option<Vec<String>>,
}

impl CorrelationContext {
    /// Generate a fresh correlation id for a request using `config`.
    pub fn new(config: &BusConfig) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), config)
    }

    pub fn with_id(id: impl Into<String>, config: &BusConfig) -> Self {
        let id = id.into();
        let tags = config.tags.as_ref().map(|configured| {
            let mut tags = Vec::with_capacity(configured.len() + 1);
            tags.push(id.clone());
            tags.extend(configured.iter().cloned());
            tags
        });
        Self { id, tags }
    }
}
