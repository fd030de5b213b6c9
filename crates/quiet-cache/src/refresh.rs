use std::time::{Duration, Instant};

/// Result of reading a [`RefreshAhead`] slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup<T> {
    /// The stored value, or `None` once it has expired.
    pub value: Option<T>,
    /// The caller should fetch a replacement and hand it to `put`.
    pub should_refresh: bool,
}

/// Single-slot cache with a fixed time-to-live and refresh-ahead signalling.
///
/// Once less than `refresh_buffer` of the TTL remains, exactly one reader is
/// told to refresh while everyone keeps receiving the stored value. The
/// in-flight flag stays set until that reader calls [`put_at`](Self::put_at) or
/// gives up via [`abandon_refresh`](Self::abandon_refresh).
///
/// Time is passed in explicitly on every call that depends on it.
#[derive(Debug)]
pub struct RefreshAhead<T> {
    value: Option<T>,
    expires_at: Option<Instant>,
    refreshing: bool,
    ttl: Duration,
    refresh_buffer: Duration,
}

impl<T: Clone> RefreshAhead<T> {
    pub fn new(ttl: Duration, refresh_buffer: Duration) -> Self {
        Self {
            value: None,
            expires_at: None,
            refreshing: false,
            ttl,
            refresh_buffer,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn refresh_buffer(&self) -> Duration {
        self.refresh_buffer
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// Read the slot as of `now`.
    ///
    /// An expired (or never filled) slot is cleared and reports
    /// `should_refresh` on every read, since no reader has anything to serve.
    pub fn get_at(&mut self, now: Instant) -> Lookup<T> {
        let remaining = match self.expires_at {
            Some(at) if at > now => at - now,
            _ => {
                self.value = None;
                self.expires_at = None;
                return Lookup {
                    value: None,
                    should_refresh: true,
                };
            }
        };

        let should_refresh = remaining <= self.refresh_buffer && !self.refreshing;
        if should_refresh {
            self.refreshing = true;
        }

        Lookup {
            value: self.value.clone(),
            should_refresh,
        }
    }

    /// The stored value if it is still live at `now`, without electing a
    /// refresher or clearing anything.
    pub fn peek_at(&self, now: Instant) -> Option<&T> {
        match self.expires_at {
            Some(at) if at > now => self.value.as_ref(),
            _ => None,
        }
    }

    /// Install a new value that lives until `now + ttl` and clear the
    /// in-flight flag.
    pub fn put_at(&mut self, value: T, now: Instant) {
        self.value = Some(value);
        self.expires_at = Some(now + self.ttl);
        self.refreshing = false;
    }

    /// Clear the in-flight flag after a failed refresh, keeping the
    /// current value and expiry.
    pub fn abandon_refresh(&mut self) {
        self.refreshing = false;
    }
}
