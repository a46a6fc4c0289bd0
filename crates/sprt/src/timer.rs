//! The timer side of §4.4: a session-global TA01, one TA02 per reliable
//! channel, and one TR03 per occupied reliable slot (tracked inside
//! [`crate::channel::TxChannel`]). [`Engine`](crate::engine::Engine)
//! multiplexes all of these onto the single external timer the host
//! arms.

/// The earliest of a set of optional deadlines, or `None` if every timer
/// is disarmed (the host should disable its timer in that case, per the
/// `deadline_us == 0` convention of §6.2).
pub fn earliest(deadlines: impl IntoIterator<Item = Option<u64>>) -> Option<u64> {
    deadlines.into_iter().flatten().min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earliest_ignores_disarmed_timers() {
        assert_eq!(earliest([None, Some(50), Some(10), None]), Some(10));
        assert_eq!(earliest([None, None]), None);
    }
}
