#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

/// Which operator actions are currently available.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Affordances {
    pub connect: bool,
    pub disconnect: bool,
    pub status: bool,
}

impl Affordances {
    pub fn for_state(state: ConnectionState) -> Self {
        let connected = state == ConnectionState::Connected;

        Affordances {
            connect: !connected,
            disconnect: connected,
            status: connected,
        }
    }

    /// Names of the enabled actions, as typed at the prompt.
    pub fn enabled(&self) -> Vec<&'static str> {
        [
            ("connect", self.connect),
            ("disconnect", self.disconnect),
            ("status", self.status),
        ]
        .into_iter()
        .filter_map(|(name, enabled)| enabled.then(|| name))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_only_allows_connect() {
        let affordances = Affordances::for_state(ConnectionState::Disconnected);

        assert!(affordances.connect);
        assert!(!affordances.disconnect);
        assert!(!affordances.status);
        assert_eq!(affordances.enabled(), vec!["connect"]);
    }

    #[test]
    fn connected_allows_disconnect_and_status() {
        let affordances = Affordances::for_state(ConnectionState::Connected);

        assert!(!affordances.connect);
        assert_eq!(affordances.enabled(), vec!["disconnect", "status"]);
    }
}
