use serde::{Deserialize, Serialize};

/// Body for `POST /extract`.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractRequest {
    pub url: String,
    pub prompt: String,
    pub schema: serde_json::Value,
    #[serde(rename = "onlyMainContent")]
    pub only_main_content: bool,
}

impl ExtractRequest {
    pub fn new(url: impl Into<String>, prompt: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            prompt: prompt.into(),
            schema,
            only_main_content: true,
        }
    }
}

/// Body for `POST /map`.
#[derive(Debug, Clone, Serialize)]
pub struct MapRequest {
    pub url: String,
    #[serde(rename = "includeSubdomains")]
    pub include_subdomains: bool,
    pub limit: u32,
    #[serde(rename = "maxDepth")]
    pub max_depth: u32,
}

/// Response from `POST /map`.
///
/// The URL list arrives either at the top level or nested as `data.map.urls`
/// depending on API version. Use [`MapResponse::into_urls`] rather than
/// reading the fields directly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapResponse {
    #[serde(default, alias = "links")]
    urls: Option<Vec<String>>,
    #[serde(default)]
    data: Option<MapData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MapData {
    #[serde(default)]
    map: Option<MapUrls>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MapUrls {
    #[serde(default, alias = "links")]
    urls: Option<Vec<String>>,
}

impl MapResponse {
    /// Mapped URLs in service order, from whichever location was populated.
    pub fn into_urls(self) -> Vec<String> {
        let nested = self.data.and_then(|d| d.map).and_then(|m| m.urls);
        match (self.urls, nested) {
            (Some(top), _) if !top.is_empty() => top,
            (_, Some(nested)) => nested,
            (top, None) => top.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_urls_top_level() {
        let resp: MapResponse =
            serde_json::from_str(r#"{"success":true,"urls":["https://a.com/partners"]}"#).unwrap();
        assert_eq!(resp.into_urls(), vec!["https://a.com/partners"]);
    }

    #[test]
    fn test_map_urls_nested() {
        let resp: MapResponse = serde_json::from_str(
            r#"{"data":{"map":{"urls":["https://a.com/x","https://a.com/y"]}}}"#,
        )
        .unwrap();
        assert_eq!(resp.into_urls(), vec!["https://a.com/x", "https://a.com/y"]);
    }

    #[test]
    fn test_map_links_alias() {
        let resp: MapResponse =
            serde_json::from_str(r#"{"success":true,"links":["https://a.com/apps"]}"#).unwrap();
        assert_eq!(resp.into_urls(), vec!["https://a.com/apps"]);
    }

    #[test]
    fn test_map_empty_body() {
        let resp: MapResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.into_urls().is_empty());
    }

    #[test]
    fn test_extract_request_serializes_camel_case() {
        let req = ExtractRequest::new(
            "https://a.com/partners",
            "find partners",
            serde_json::json!({"type": "object"}),
        );
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["onlyMainContent"], true);
        assert_eq!(value["url"], "https://a.com/partners");
    }

    #[test]
    fn test_map_request_serializes_camel_case() {
        let req = MapRequest {
            url: "https://a.com".into(),
            include_subdomains: true,
            limit: 50,
            max_depth: 2,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["includeSubdomains"], true);
        assert_eq!(value["maxDepth"], 2);
        assert_eq!(value["limit"], 50);
    }
}
