//! MQTT topic layout.
//!
//! | purpose   | plain MQTT                          | AWS IoT                              |
//! |-----------|-------------------------------------|--------------------------------------|
//! | commands  | `motete/director/commands/<unit>`   | same                                 |
//! | status    | `motete/osmo/<unit>/status`         | same                                 |
//! | response  | `motete/osmo/<unit>/response`       | same                                 |
//! | config    | `motete/osmo/<unit>/config`         | same                                 |
//! | heartbeat | `motete/osmo/<unit>/heartbeat`      | `$aws/things/<thing>/shadow/update`  |
//! | errors    | `motete/osmo/<unit>/errors`         | `$aws/things/<thing>/errors`         |
//!
//! HTTP units have no broker. Their "topics" are the WebSocket event
//! names (`status`, `command_response`, `config`, `heartbeat`, `error`)
//! under which the push task broadcasts each outbound payload.

use core::fmt::Write;

use super::mailbox::Topic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub commands: Topic,
    pub status: Topic,
    pub response: Topic,
    pub config: Topic,
    pub heartbeat: Topic,
    pub errors: Topic,
    /// Heartbeats are wrapped as device shadow updates.
    pub shadow_heartbeat: bool,
}

fn topic(args: core::fmt::Arguments<'_>) -> Topic {
    let mut t = Topic::new();
    // Unit ids and thing names are bounded well below MAX_TOPIC_LEN.
    let _ = t.write_fmt(args);
    t
}

impl Topics {
    pub fn for_unit(unit_id: &str) -> Self {
        Self {
            commands: topic(format_args!("motete/director/commands/{unit_id}")),
            status: topic(format_args!("motete/osmo/{unit_id}/status")),
            response: topic(format_args!("motete/osmo/{unit_id}/response")),
            config: topic(format_args!("motete/osmo/{unit_id}/config")),
            heartbeat: topic(format_args!("motete/osmo/{unit_id}/heartbeat")),
            errors: topic(format_args!("motete/osmo/{unit_id}/errors")),
            shadow_heartbeat: false,
        }
    }

    /// AWS IoT Core: heartbeat and errors go to the thing's reserved topics.
    pub fn for_aws(unit_id: &str, thing_name: &str) -> Self {
        Self {
            heartbeat: topic(format_args!("$aws/things/{thing_name}/shadow/update")),
            errors: topic(format_args!("$aws/things/{thing_name}/errors")),
            shadow_heartbeat: true,
            ..Self::for_unit(unit_id)
        }
    }

    /// WebSocket event names for HTTP units. Commands arrive over HTTP,
    /// so `commands` is empty.
    pub fn for_websocket() -> Self {
        Self {
            commands: Topic::new(),
            status: topic(format_args!("status")),
            response: topic(format_args!("command_response")),
            config: topic(format_args!("config")),
            heartbeat: topic(format_args!("heartbeat")),
            errors: topic(format_args!("error")),
            shadow_heartbeat: false,
        }
    }
}
