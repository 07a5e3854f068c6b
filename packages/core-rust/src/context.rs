//! Per-operation context threaded through requests and their replies.

/// Per-operation context carrying identity, language, and subscription data.
/// Threaded through every request and copied onto its responses; routing
/// never inspects it beyond the control-provider slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationContext {
    /// Authenticated user the operation runs as. `None` for internal requests.
    pub user_name: Option<String>,
    /// Languages the client accepts in responses, most preferred first.
    pub accept_languages: Vec<String>,
    /// Languages of localized content in the request.
    pub content_languages: Vec<String>,
    /// Client-supplied operation timeout. `None` means the server default.
    pub timeout_ms: Option<u64>,
    /// Control-provider module chosen by routing, when the route names one.
    pub control_provider: Option<String>,
    /// Registered provider module chosen by provider-registration lookup.
    pub provider_module: Option<String>,
    /// Subscriptions an indication is being delivered for.
    pub subscription_instance_names: Vec<String>,
}

impl OperationContext {
    /// Context for a request issued by the named user.
    #[must_use]
    pub fn for_user(user_name: impl Into<String>) -> Self {
        Self {
            user_name: Some(user_name.into()),
            ..Self::default()
        }
    }
}
