//! Message classification flags and the HTTP method a request arrived with.

use std::fmt;

bitflags::bitflags! {
    /// Request/reply/async classification bits carried by every `Message`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MessageMask: u32 {
        /// Message is a request that expects a reply.
        const HA_REQUEST = 0x0010_0000;
        /// Message is a reply to an earlier request.
        const HA_REPLY = 0x0020_0000;
        /// Message belongs to an asynchronous exchange.
        const HA_ASYNC = 0x0040_0000;
    }
}

impl MessageMask {
    #[must_use]
    pub fn is_request(self) -> bool {
        self.contains(Self::HA_REQUEST)
    }

    #[must_use]
    pub fn is_reply(self) -> bool {
        self.contains(Self::HA_REPLY)
    }
}

/// HTTP method of the request a message was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Post,
    /// `M-POST`, the mandatory-extension form of `POST`.
    MPost,
    Get,
    Head,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::MPost => "M-POST",
            Self::Get => "GET",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
