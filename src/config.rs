use embassy_time::Duration;

/// Engine tunables: retry bounds, polling granularity and the response
/// windows per command family.
///
/// Status queries settle within a second, while packet-data setup and
/// context activation are slow and non-deterministic, so each family gets
/// its own window. A reader always consumes its whole window (see
/// [`Client::send`]); shrinking these therefore trades robustness for
/// latency.
///
/// [`Client::send`]: crate::Client::send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub(crate) retries: u8,
    pub(crate) retry_delay: Duration,
    pub(crate) poll_interval: Duration,
    pub(crate) probe_timeout: Duration,
    pub(crate) command_timeout: Duration,
    pub(crate) connect_timeout: Duration,
    pub(crate) attach_timeout: Duration,
    pub(crate) activation_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            retries: 3,
            retry_delay: Duration::from_millis(500),
            poll_interval: Duration::from_millis(10),
            probe_timeout: Duration::from_secs(1),
            command_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
            attach_timeout: Duration::from_secs(10),
            activation_timeout: Duration::from_secs(30),
        }
    }

    /// Additional attempts after a failed exchange (`retries + 1` total).
    #[must_use]
    pub const fn retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    /// Pause between attempts, before the receive buffer is drained.
    #[must_use]
    pub const fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Granularity of the available-byte polling loop.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Window for each liveness probe attempt during bootstrap.
    #[must_use]
    pub const fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Default window for short commands (status queries, mode setting).
    #[must_use]
    pub const fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Window for socket open and data entry exchanges.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Window for packet-service attach and detach.
    #[must_use]
    pub const fn attach_timeout(mut self, timeout: Duration) -> Self {
        self.attach_timeout = timeout;
        self
    }

    /// Window for wireless context activation, the slowest setup step.
    #[must_use]
    pub const fn activation_timeout(mut self, timeout: Duration) -> Self {
        self.activation_timeout = timeout;
        self
    }
}
