//! Content negotiation: one MIME type per view, used for both directions.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::application::codec::to_pretty_json;
use crate::application::error::ErrorReport;

pub const MIME_JSON: &str = "application/json";
pub const MIME_XML: &str = "application/xml";

const XML_INDENT: usize = 1;

/// Serialization format shared by request decoding and response encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Json,
    Xml,
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("unsupported content type `{found}`, expected {expected}")]
    UnsupportedMediaType {
        found: String,
        expected: &'static str,
    },
    #[error("cannot produce {produced} for Accept `{accept}`")]
    NotAcceptable {
        accept: String,
        produced: &'static str,
    },
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    Encode(String),
}

impl ViewError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl View {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Json => MIME_JSON,
            Self::Xml => MIME_XML,
        }
    }

    /// Decode a request body after checking its `Content-Type`.
    pub fn consume<T: DeserializeOwned>(self, headers: &HeaderMap, body: &[u8]) -> Result<T, ViewError> {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        if !content_type
            .to_ascii_lowercase()
            .contains(self.mime_type())
        {
            return Err(ViewError::UnsupportedMediaType {
                found: content_type.to_string(),
                expected: self.mime_type(),
            });
        }

        match self {
            Self::Json => serde_json::from_slice(body).map_err(|err| ViewError::Decode(err.to_string())),
            Self::Xml => {
                let text = std::str::from_utf8(body)
                    .map_err(|err| ViewError::Decode(err.to_string()))?;
                quick_xml::de::from_str(text).map_err(|err| ViewError::Decode(err.to_string()))
            }
        }
    }

    /// Check the `Accept` header admits this view's MIME type.
    pub fn ensure_acceptable(self, headers: &HeaderMap) -> Result<(), ViewError> {
        let accept = headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");

        if accepts(&accept, self.mime_type()) {
            Ok(())
        } else {
            Err(ViewError::NotAcceptable {
                accept,
                produced: self.mime_type(),
            })
        }
    }

    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, ViewError> {
        match self {
            Self::Json => to_pretty_json(value).map_err(|err| ViewError::Encode(err.to_string())),
            Self::Xml => {
                let mut output = String::new();
                let mut serializer =
                    quick_xml::se::Serializer::with_root(&mut output, Some(xml_root_name::<T>()))
                        .map_err(|err| ViewError::Encode(err.to_string()))?;
                serializer.indent(' ', XML_INDENT);
                value
                    .serialize(serializer)
                    .map_err(|err| ViewError::Encode(err.to_string()))?;
                Ok(output.into_bytes())
            }
        }
    }

    /// Encode `value` into a response; encoding failures become a bare 500.
    pub fn produce<T: Serialize>(self, status: StatusCode, value: &T) -> Response {
        match self.encode(value) {
            Ok(body) => {
                let mut response = (status, body).into_response();
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(self.mime_type()),
                );
                response
            }
            Err(err) => {
                let mut response =
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
                ErrorReport::from_error(
                    "infra::http::views::produce",
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &err,
                )
                .attach(&mut response);
                response
            }
        }
    }
}

/// Whether an `Accept` header value admits `mime`.
///
/// The most specific matching range decides; a `q=0` range refuses.
fn accepts(accept: &str, mime: &str) -> bool {
    if accept.trim().is_empty() {
        return true;
    }

    let wildcard_type = mime
        .split_once('/')
        .map(|(kind, _)| format!("{kind}/*"));

    let mut best: Option<(u8, bool)> = None;
    for range in accept.split(',') {
        let mut params = range.split(';');
        let media = params.next().unwrap_or("").trim().to_ascii_lowercase();

        let specificity = if media == mime {
            3
        } else if wildcard_type.as_deref() == Some(media.as_str()) {
            2
        } else if media == "*/*" {
            1
        } else {
            continue;
        };

        let refused = params.any(|param| {
            let param = param.trim();
            param
                .strip_prefix("q=")
                .or_else(|| param.strip_prefix("Q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q <= 0.0)
        });

        if best.is_none_or(|(current, _)| specificity > current) {
            best = Some((specificity, !refused));
        }
    }

    best.is_some_and(|(_, allowed)| allowed)
}

/// Element name for an XML document holding `T`: the bare type name, or the
/// element type name for sequences.
fn xml_root_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    let inner = match (name.find('<'), name.rfind('>')) {
        (Some(start), Some(end)) if start < end => &name[start + 1..end],
        _ => name,
    };
    let inner = inner.trim_matches(|c| c == '[' || c == ']' || c == '&');
    inner.rsplit("::").next().unwrap_or(inner)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Player {
        id: String,
        age: u64,
    }

    fn headers(pairs: &[(header::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn json_consume_requires_matching_content_type() {
        let body = br#"{"Id":"p1","Age":18446744073709551615}"#;

        let player: Player = View::Json
            .consume(
                &headers(&[(header::CONTENT_TYPE, "application/json; charset=utf-8")]),
                body,
            )
            .expect("decodes");
        assert_eq!(player.age, u64::MAX);

        let missing = View::Json.consume::<Player>(&HeaderMap::new(), body);
        assert!(matches!(missing, Err(ViewError::UnsupportedMediaType { .. })));

        let wrong =
            View::Json.consume::<Player>(&headers(&[(header::CONTENT_TYPE, "text/plain")]), body);
        assert_eq!(
            wrong.expect_err("wrong type").status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err = View::Json
            .consume::<Player>(&headers(&[(header::CONTENT_TYPE, MIME_JSON)]), b"{nope")
            .expect_err("malformed");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn accept_ranges() {
        assert!(accepts("", MIME_JSON));
        assert!(accepts("*/*", MIME_JSON));
        assert!(accepts("application/*", MIME_JSON));
        assert!(accepts("text/html, application/json;q=0.8", MIME_JSON));
        assert!(!accepts("text/html", MIME_JSON));
        assert!(!accepts("application/json;q=0", MIME_JSON));
        assert!(!accepts("*/*, application/json; q=0", MIME_JSON));
        assert!(accepts("application/json;q=0, */*", MIME_XML));
    }

    #[test]
    fn ensure_acceptable_joins_repeated_headers() {
        let map = headers(&[(header::ACCEPT, "text/html"), (header::ACCEPT, "application/xml")]);
        assert!(View::Xml.ensure_acceptable(&map).is_ok());
        assert!(matches!(
            View::Json.ensure_acceptable(&map),
            Err(ViewError::NotAcceptable { .. })
        ));
    }

    #[test]
    fn xml_roots_use_type_names() {
        assert_eq!(xml_root_name::<Player>(), "Player");
        assert_eq!(xml_root_name::<Vec<Player>>(), "Player");
    }

    #[test]
    fn xml_round_trip_and_content_type() {
        let player = Player {
            id: "p1".to_string(),
            age: 31,
        };

        let encoded = View::Xml.encode(&player).expect("encodes");
        let text = String::from_utf8(encoded.clone()).expect("utf8");
        assert!(text.starts_with("<Player>"));
        assert!(text.contains("\n <Id>p1</Id>"));

        let decoded: Player = View::Xml
            .consume(&headers(&[(header::CONTENT_TYPE, MIME_XML)]), &encoded)
            .expect("decodes");
        assert_eq!(decoded, player);

        let response = View::Xml.produce(StatusCode::OK, &player);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE),
            Some(&HeaderValue::from_static(MIME_XML))
        );
    }

    #[test]
    fn json_responses_are_pretty_printed() {
        let player = Player {
            id: "p1".to_string(),
            age: 31,
        };
        let encoded = View::Json.encode(&player).expect("encodes");
        assert_eq!(
            String::from_utf8(encoded).expect("utf8"),
            "{\n \"Id\": \"p1\",\n \"Age\": 31\n}"
        );
    }
}
