use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone)]
pub struct AppConfig {
    pub state_dir: PathBuf,
    pub app_name: String,
    pub session_ttl: time::Duration,
    pub login_delay: Duration,
    pub notification_cap: usize,
    pub dismiss_after: Duration,
    /// Interval between synthetic demo notifications; zero disables the feed.
    pub feed_interval: Duration,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_dir: "/".into(),
            app_name: "Deskbell".to_string(),
            session_ttl: time::Duration::hours(24),
            login_delay: Duration::ZERO,
            notification_cap: 50,
            dismiss_after: Duration::from_millis(5000),
            feed_interval: Duration::ZERO,
        }
    }
}
