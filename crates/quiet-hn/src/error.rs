use thiserror::Error;

/// Failure of a single call to the remote API.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection, timeout or body-read failure.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    /// Body was not the JSON shape we expected (including `null` for
    /// deleted or unknown items).
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("fetch task for item {id} panicked")]
    TaskPanicked { id: u64 },
}

impl RemoteError {
    /// Transport-class failures: the request never produced a usable body.
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Transport { .. } | RemoteError::Status { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, RemoteError::Decode { .. })
    }
}

/// Error returned by [`Dispatcher::fill`](crate::dispatcher::Dispatcher::fill).
///
/// Only a failure to obtain the candidate id list aborts a fill; per-item
/// failures are logged and skipped.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to load top story ids: {0}")]
    TopIds(#[source] RemoteError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_variants() {
        let status = RemoteError::Status {
            url: "http://hn/item/1.json".into(),
            status: 503,
        };
        assert!(status.is_transport());
        assert!(!status.is_decode());

        let decode = RemoteError::Decode {
            url: "http://hn/item/1.json".into(),
            source: serde_json::from_str::<u64>("null").unwrap_err(),
        };
        assert!(decode.is_decode());
        assert!(!RemoteError::TaskPanicked { id: 1 }.is_transport());
    }

    #[test]
    fn fetch_error_keeps_cause() {
        let err = FetchError::TopIds(RemoteError::Status {
            url: "http://hn/topstories.json".into(),
            status: 500,
        });
        assert_eq!(
            err.to_string(),
            "failed to load top story ids: http://hn/topstories.json answered with HTTP 500"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
