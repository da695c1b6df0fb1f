use embassy_time::Duration;

/// End-of-data sentinel (Ctrl-Z). The module treats this single byte as
/// the terminator for SMS bodies and socket payloads entered in data
/// mode; there is no other escaping.
pub const END_OF_DATA: u8 = 0x1a;

/// One AT exchange: the command line plus how its reply window is
/// handled. Immutable for the duration of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    pub(crate) text: &'a str,
    pub(crate) timeout: Option<Duration>,
    pub(crate) check_error: bool,
    pub(crate) expect_response: bool,
}

impl<'a> Command<'a> {
    /// A checked command using the configured short response window.
    #[must_use]
    pub const fn new(text: &'a str) -> Self {
        Self {
            text,
            timeout: None,
            check_error: true,
            expect_response: true,
        }
    }

    /// Override the reply window for a slow command family.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable `ERROR` token detection. Used where a family signals
    /// failure through its own codes, or where an echoed argument could
    /// contain the token.
    #[must_use]
    pub const fn unchecked(mut self) -> Self {
        self.check_error = false;
        self
    }

    /// Accept an empty reply window instead of raising a timeout.
    #[must_use]
    pub const fn allow_empty(mut self) -> Self {
        self.expect_response = false;
        self
    }
}
