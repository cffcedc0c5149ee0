//! Instance update actions and how each one is routed on the wire.
//!
//! Every mutation of an instance goes through `PUT /cloud/instances/{id}`,
//! optionally followed by a sub-path. Power toggles live under `/power`
//! with a `value=ON|OFF` query; every other action is dispatched through
//! `/action` with an `action=<name>` query.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value, json};

use crate::Error;

/// Closed set of update actions the instance endpoint understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Pause,
    Resume,
    SoftReboot,
    HardReboot,
    Lock,
    Unlock,
    CreateSnapshot,
    DetachInterface,
    AttachInterface,
    Suspend,
    Unsuspend,
    AttachVolume,
    DetachVolume,
    ShutOff,
    Start,
    Rebuild,
}

impl ActionKind {
    pub const ALL: [ActionKind; 16] = [
        Self::Pause,
        Self::Resume,
        Self::SoftReboot,
        Self::HardReboot,
        Self::Lock,
        Self::Unlock,
        Self::CreateSnapshot,
        Self::DetachInterface,
        Self::AttachInterface,
        Self::Suspend,
        Self::Unsuspend,
        Self::AttachVolume,
        Self::DetachVolume,
        Self::ShutOff,
        Self::Start,
        Self::Rebuild,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pause => "pause-instance",
            Self::Resume => "resume-instance",
            Self::SoftReboot => "soft-reboot-instance",
            Self::HardReboot => "hard-reboot-instance",
            Self::Lock => "lock-instance",
            Self::Unlock => "unlock-instance",
            Self::CreateSnapshot => "create-snapshot",
            Self::DetachInterface => "detach-interface",
            Self::AttachInterface => "attach-interface",
            Self::Suspend => "suspend-instance",
            Self::Unsuspend => "unsuspend-instance",
            Self::AttachVolume => "attach-volume",
            Self::DetachVolume => "detach-volume",
            Self::ShutOff => "shutoff-instance",
            Self::Start => "start-instance",
            Self::Rebuild => "rebuild-instance",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownAction(s.to_string()))
    }
}

/// Where an update lands: optional sub-path under the instance and an
/// optional extra query pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRoute {
    pub segment: Option<&'static str>,
    pub query: Option<(&'static str, &'static str)>,
}

/// A single, fully-parameterised update to send for an instance.
///
/// Each variant carries exactly the fields its endpoint needs. Build these
/// through a validating mapper; the client sends them as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmAction {
    Rename {
        name: String,
    },
    Pause,
    Resume,
    SoftReboot,
    HardReboot,
    Lock,
    Unlock,
    Suspend,
    Unsuspend,
    ShutOff,
    Start,
    CreateSnapshot {
        name: String,
        billing_type: String,
    },
    AttachInterface {
        network_id: String,
        billing_type: String,
    },
    DetachInterface {
        interface_id: String,
    },
    AttachVolume {
        volume_id: String,
        delete_on_termination: bool,
    },
    DetachVolume {
        volume_id: String,
    },
    Rebuild {
        disk_config: String,
        image_id: String,
        description: Option<String>,
    },
}

impl VmAction {
    /// The action kind, or `None` for a plain rename.
    pub fn kind(&self) -> Option<ActionKind> {
        let kind = match self {
            Self::Rename { .. } => return None,
            Self::Pause => ActionKind::Pause,
            Self::Resume => ActionKind::Resume,
            Self::SoftReboot => ActionKind::SoftReboot,
            Self::HardReboot => ActionKind::HardReboot,
            Self::Lock => ActionKind::Lock,
            Self::Unlock => ActionKind::Unlock,
            Self::Suspend => ActionKind::Suspend,
            Self::Unsuspend => ActionKind::Unsuspend,
            Self::ShutOff => ActionKind::ShutOff,
            Self::Start => ActionKind::Start,
            Self::CreateSnapshot { .. } => ActionKind::CreateSnapshot,
            Self::AttachInterface { .. } => ActionKind::AttachInterface,
            Self::DetachInterface { .. } => ActionKind::DetachInterface,
            Self::AttachVolume { .. } => ActionKind::AttachVolume,
            Self::DetachVolume { .. } => ActionKind::DetachVolume,
            Self::Rebuild { .. } => ActionKind::Rebuild,
        };
        Some(kind)
    }

    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        self.kind().map_or("rename", |k| k.as_str())
    }

    pub fn route(&self) -> ActionRoute {
        match self {
            Self::Rename { .. } => ActionRoute {
                segment: None,
                query: None,
            },
            Self::Pause => ActionRoute {
                segment: Some("power"),
                query: Some(("value", "OFF")),
            },
            Self::Resume => ActionRoute {
                segment: Some("power"),
                query: Some(("value", "ON")),
            },
            other => ActionRoute {
                segment: Some("action"),
                query: other.kind().map(|k| ("action", k.as_str())),
            },
        }
    }

    /// JSON body for the PUT. Parameterless actions send `{}`.
    pub fn body(&self) -> Value {
        match self {
            Self::Rename { name } => json!({ "name": name }),
            Self::CreateSnapshot { name, billing_type } => json!({
                "name": name,
                "billing_type": billing_type,
            }),
            Self::AttachInterface {
                network_id,
                billing_type,
            } => json!({
                "network_id": network_id,
                "billing_type": billing_type,
            }),
            Self::DetachInterface { interface_id } => json!({ "interface_id": interface_id }),
            Self::AttachVolume {
                volume_id,
                delete_on_termination,
            } => json!({
                "volume_id": volume_id,
                "delete_on_termination": delete_on_termination,
            }),
            Self::DetachVolume { volume_id } => json!({ "volume_id": volume_id }),
            Self::Rebuild {
                disk_config,
                image_id,
                description,
            } => {
                let mut body = Map::new();
                body.insert("disk_config".into(), json!(disk_config));
                body.insert("image_id".into(), json!(image_id));
                if let Some(desc) = description.as_deref().filter(|d| !d.is_empty()) {
                    body.insert("description".into(), json!(desc));
                }
                Value::Object(body)
            }
            _ => Value::Object(Map::new()),
        }
    }
}
