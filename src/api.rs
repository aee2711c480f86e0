//! HTTP collaborators: historical log retrieval, the platform catalog, and
//! the server-sent-events tail transport.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::query::{HistoricalQuery, TailEndpoint};
use crate::tail::{TailStream, TailTransport};
use crate::types::{LogGroupInfo, LogRecord, Platform, PlatformInfo};

/// One bounded request-response retrieval of past log records.
///
/// No automatic retry: a human-triggered re-fetch is the only recovery path.
#[async_trait]
pub trait LogFetcher: Send + Sync {
    async fn fetch(&self, query: HistoricalQuery) -> Result<Vec<LogRecord>>;
}

/// Read-only platform catalog collaborator
#[async_trait]
pub trait PlatformCatalog: Send + Sync {
    async fn get_platforms(&self) -> Result<Vec<PlatformInfo>>;
    async fn get_log_groups(&self, platform: Platform) -> Result<Vec<LogGroupInfo>>;
    async fn get_log_types(&self, platform: Platform) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct LogsResponse {
    logs: Vec<LogRecord>,
}

#[derive(Debug, Deserialize)]
struct PlatformsResponse {
    platforms: Vec<PlatformInfo>,
}

#[derive(Debug, Deserialize)]
struct LogGroupsResponse {
    log_groups: Vec<LogGroupInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogTypesResponse {
    log_types: Vec<String>,
}

/// HTTP client for the log backend
#[derive(Clone)]
pub struct LogApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl LogApiClient {
    pub fn new(base: Url, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
            token,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|err| Error::FetchFailed {
            detail: format!("bad endpoint url: {}", err),
        })
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.get(url).send().await.map_err(|err| Error::FetchFailed {
            detail: err.to_string(),
        })?;
        match response.status() {
            StatusCode::UNAUTHORIZED => Err(Error::AuthRequired),
            status if !status.is_success() => Err(Error::FetchFailed {
                detail: format!("HTTP {}", status),
            }),
            _ => response.json().await.map_err(|err| Error::FetchFailed {
                detail: format!("bad response body: {}", err),
            }),
        }
    }
}

#[async_trait]
impl LogFetcher for LogApiClient {
    async fn fetch(&self, query: HistoricalQuery) -> Result<Vec<LogRecord>> {
        let mut url = self.endpoint("logs")?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        let response: LogsResponse = self.get_json(url).await?;
        Ok(response.logs)
    }
}

#[async_trait]
impl PlatformCatalog for LogApiClient {
    async fn get_platforms(&self) -> Result<Vec<PlatformInfo>> {
        let url = self.endpoint("platforms")?;
        let response: PlatformsResponse = self.get_json(url).await?;
        Ok(response.platforms)
    }

    async fn get_log_groups(&self, platform: Platform) -> Result<Vec<LogGroupInfo>> {
        let mut url = self.endpoint("logs/groups")?;
        url.query_pairs_mut().append_pair("platform", platform.as_str());
        let response: LogGroupsResponse = self.get_json(url).await?;
        Ok(response.log_groups)
    }

    async fn get_log_types(&self, platform: Platform) -> Result<Vec<String>> {
        let mut url = self.endpoint("logs/types")?;
        url.query_pairs_mut().append_pair("platform", platform.as_str());
        let response: LogTypesResponse = self.get_json(url).await?;
        Ok(response.log_types)
    }
}

#[async_trait]
impl TailTransport for LogApiClient {
    async fn open(&self, endpoint: TailEndpoint, token: Option<String>) -> Result<TailStream> {
        let mut url = self
            .base
            .join(endpoint.path().trim_start_matches('/'))
            .map_err(|err| Error::StreamError {
                detail: format!("bad tail url: {}", err),
            })?;
        let (key, value) = endpoint.param.query_pair();
        url.query_pairs_mut().append_pair(key, value);

        let mut request = self.http.get(url).header(ACCEPT, "text/event-stream");
        if let Some(token) = token.or_else(|| self.token.clone()) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|err| Error::StreamError {
            detail: err.to_string(),
        })?;
        match response.status() {
            StatusCode::UNAUTHORIZED => Err(Error::AuthRequired),
            status if !status.is_success() => Err(Error::StreamError {
                detail: format!("HTTP {}", status),
            }),
            _ => Ok(sse_events(response.bytes_stream().boxed()).boxed()),
        }
    }
}

/// Incremental server-sent-events decoder.
///
/// Collects `data:` lines and emits one payload per blank-line-terminated
/// event; comment and field lines other than `data` are ignored.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    data: String,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        // Lines are split on raw bytes; a multibyte character arriving in
        // two transport chunks stays buffered until its line is complete
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(std::mem::take(&mut self.data));
                }
            } else if let Some(rest) = line.strip_prefix("data:") {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
            }
        }
        events
    }
}

fn sse_events<S, B>(bytes: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = reqwest::Result<B>> + Send + Unpin + 'static,
    B: AsRef<[u8]>,
{
    let ready: VecDeque<String> = VecDeque::new();
    futures::stream::unfold(
        (bytes, SseDecoder::default(), ready),
        |(mut bytes, mut decoder, mut ready)| async move {
            loop {
                if let Some(event) = ready.pop_front() {
                    return Some((Ok(event), (bytes, decoder, ready)));
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => ready.extend(decoder.push(chunk.as_ref())),
                    Some(Err(err)) => {
                        return Some((
                            Err(Error::StreamError {
                                detail: err.to_string(),
                            }),
                            (bytes, decoder, ready),
                        ));
                    }
                    None => return None,
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_decoder_emits_one_payload_per_event() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(events, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn sse_decoder_handles_chunks_split_mid_line() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"mess").is_empty());
        assert!(decoder.push(b"age\":\"hi\"}\n").is_empty());
        let events = decoder.push(b"\n");
        assert_eq!(events, vec!["{\"message\":\"hi\"}"]);
    }

    #[test]
    fn sse_decoder_handles_chunks_split_mid_character() {
        let mut decoder = SseDecoder::default();
        let bytes = "data: {\"message\":\"h\u{e9}llo\"}\n\n".as_bytes();
        // Split between the two bytes of 'é'
        let split = bytes.iter().position(|&b| b == 0xc3).unwrap() + 1;
        assert!(decoder.push(&bytes[..split]).is_empty());
        let events = decoder.push(&bytes[split..]);
        assert_eq!(events, vec!["{\"message\":\"h\u{e9}llo\"}"]);
    }

    #[test]
    fn sse_decoder_ignores_comments_and_other_fields() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": keep-alive\nevent: log\ndata: {}\n\n");
        assert_eq!(events, vec!["{}"]);
    }

    #[test]
    fn sse_decoder_joins_multi_line_data() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b"data: line1\ndata: line2\n\n");
        assert_eq!(events, vec!["line1\nline2"]);
    }
}
