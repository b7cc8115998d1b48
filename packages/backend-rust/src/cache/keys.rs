pub fn feed_key(user_id: &str) -> String {
    format!("feed:{}", user_id)
}

pub fn feed_invalidated_key(user_id: &str) -> String {
    format!("feed:{}:invalidated", user_id)
}

/// Epoch millis of the user's latest preference shift
pub fn feed_shifted_key(user_id: &str) -> String {
    format!("feed:{}:shifted", user_id)
}
