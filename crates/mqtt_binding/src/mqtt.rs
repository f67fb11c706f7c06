mod listener_state;
pub(crate) mod subscriber;
mod topic;

pub use listener_state::ListenerState;
pub use subscriber::{MqttListener, MqttListenerConfig, SUBSCRIBE_TOPICS};
pub use topic::{parse_topic, ParsedTopic, ATTRS_SEGMENT};
