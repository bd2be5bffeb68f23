//! Topic namespace for a single factory line.
//!
//! Every device lives under `factory/{site}/line/{line}/device/{code}/`.
//! Devices publish on `event` and `status`; the service publishes on `cmd`.

use strum::{AsRefStr, Display, EnumString};

use crate::error::Error;

const DEVICE_SEGMENT: &str = "device";
const SEGMENT_COUNT: usize = 7;

/// The per-device topic leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum TopicKind {
    Event,
    Status,
    #[strum(serialize = "cmd")]
    Command,
}

/// A topic parsed into its device code and leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTopic {
    pub device_code: String,
    pub kind: TopicKind,
}

/// `factory/{site}/line/{line}` prefix shared by all device topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    site: String,
    line: String,
}

impl Namespace {
    pub fn new(site: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            line: line.into(),
        }
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn prefix(&self) -> String {
        format!("factory/{}/line/{}", self.site, self.line)
    }

    /// Wildcard filter for every device's telemetry events.
    pub fn event_filter(&self) -> String {
        self.device_filter(TopicKind::Event)
    }

    /// Wildcard filter for every device's online/offline status.
    pub fn status_filter(&self) -> String {
        self.device_filter(TopicKind::Status)
    }

    /// Topic the given device listens on for commands.
    pub fn command_topic(&self, device_code: &str) -> String {
        format!(
            "{}/{DEVICE_SEGMENT}/{device_code}/{}",
            self.prefix(),
            TopicKind::Command
        )
    }

    /// Split a concrete topic into device code and leaf.
    ///
    /// Topics outside this namespace, with the wrong number of segments,
    /// an empty device code, or an unknown leaf are rejected.
    pub fn parse(&self, topic: &str) -> Result<DeviceTopic, Error> {
        let invalid = |reason| Error::InvalidTopic {
            topic: topic.to_owned(),
            reason,
        };

        let parts: Vec<&str> = topic.split('/').collect();
        let [factory, site, line_kw, line, device_kw, code, leaf] = parts.as_slice() else {
            return Err(invalid(if parts.len() < SEGMENT_COUNT {
                "too few segments"
            } else {
                "too many segments"
            }));
        };

        if *factory != "factory" || *line_kw != "line" || *device_kw != DEVICE_SEGMENT {
            return Err(invalid("not a device topic"));
        }
        if *site != self.site || *line != self.line {
            return Err(invalid("outside this line's namespace"));
        }
        if code.is_empty() || code.contains(['+', '#']) {
            return Err(invalid("missing device code"));
        }
        let kind: TopicKind = leaf.parse().map_err(|_| invalid("unknown topic leaf"))?;

        Ok(DeviceTopic {
            device_code: (*code).to_owned(),
            kind,
        })
    }

    fn device_filter(&self, kind: TopicKind) -> String {
        format!("{}/{DEVICE_SEGMENT}/+/{kind}", self.prefix())
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new("default", "1")
    }
}
