/// Notifications the session manager raises for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session ended because the token expired. The UI shows a blocking
    /// notice whose only action is `SessionManager::relogin`.
    Expired,

    /// Navigate to the given location (the login entry point).
    Redirect { location: String },
}
