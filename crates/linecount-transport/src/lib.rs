// linecount-transport: MQTT plumbing between the line's devices and the service

pub mod error;
pub mod message;
pub mod mqtt;
pub mod topic;

pub use error::Error;
pub use message::{InboundMessage, OutboundMessage};
pub use mqtt::{MqttConfig, MqttTransport, ReconnectConfig};
pub use topic::{DeviceTopic, Namespace, TopicKind};
