//! Pure translation between declared configuration and wire requests.
//!
//! Nothing in here touches the network. Every validation rule for an
//! update action is checked while building its [`VmAction`], so a rejected
//! configuration never produces a request.

use acecloud_api::{ActionKind, CreateKeyPairRequest, CreateVmRequest, VmAction, VolumeRequest};
use serde::Deserialize;

use crate::{Error, Result};

pub const DEFAULT_BILLING_TYPE: &str = "hourly";
pub const DEFAULT_SOURCE_TYPE: &str = "image";
pub const DEFAULT_AVAILABILITY_ZONE: &str = "nova";

/// Declared attributes of an `acecloud_vm`.
///
/// Optional attributes are `Option` so that an explicit `null` from the
/// host behaves the same as an absent key.
#[derive(Debug, Clone, Deserialize)]
pub struct VmConfig {
    pub name: String,
    pub flavor: String,
    pub boot_uuid: String,
    pub key: String,
    #[serde(default)]
    pub delete_on_termination: Option<bool>,
    #[serde(default)]
    pub network: Option<Vec<String>>,
    #[serde(default)]
    pub security_group: Option<Vec<String>>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub billing_type: Option<String>,
    #[serde(default)]
    pub volumes: Option<Vec<VolumeConfig>>,
    #[serde(default)]
    pub vm_count: Option<u32>,
    #[serde(default)]
    pub custom_update: Option<CustomUpdate>,
}

impl VmConfig {
    pub fn volumes(&self) -> &[VolumeConfig] {
        self.volumes.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeConfig {
    #[serde(default)]
    pub boot: Option<bool>,
    pub volume_type: String,
    pub size: u32,
    #[serde(default)]
    pub billing_type: Option<String>,
}

/// The `custom_update` block: one action plus whichever parameters it needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomUpdate {
    pub action: String,
    #[serde(default)]
    pub snapshot_name: Option<String>,
    #[serde(default)]
    pub interface_id: Option<String>,
    #[serde(default)]
    pub network_id: Option<String>,
    #[serde(default)]
    pub volume_id: Option<String>,
    #[serde(default)]
    pub delete_on_termination: Option<bool>,
    #[serde(default)]
    pub disk_config: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_id: Option<String>,
}

/// Declared attributes of an `acecloud_key_pair`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyPairConfig {
    #[serde(default)]
    pub name: Option<String>,
}

// ── Create ──────────────────────────────────────────────────────────

pub fn create_vm_request(config: &VmConfig) -> Result<CreateVmRequest> {
    let count = config.vm_count.unwrap_or(1);
    if count == 0 {
        return Err(Error::Validation("vm_count must be at least 1".into()));
    }

    let volumes = config
        .volumes()
        .iter()
        .map(volume_request)
        .collect::<Result<Vec<_>>>()?;

    Ok(CreateVmRequest {
        name: config.name.clone(),
        flavor: config.flavor.clone(),
        boot_uuid: config.boot_uuid.clone(),
        delete_on_termination: config.delete_on_termination.unwrap_or(true),
        networks: config.network.clone().unwrap_or_default(),
        security_groups: config.security_group.clone().unwrap_or_default(),
        source_type: or_default(&config.source_type, DEFAULT_SOURCE_TYPE),
        key: config.key.clone(),
        availability_zone: or_default(&config.availability_zone, DEFAULT_AVAILABILITY_ZONE),
        billing_type: or_default(&config.billing_type, DEFAULT_BILLING_TYPE),
        volumes,
        count,
    })
}

pub fn volume_request(volume: &VolumeConfig) -> Result<VolumeRequest> {
    if volume.size == 0 {
        return Err(Error::Validation(format!(
            "volume size must be positive (volume_type {})",
            volume.volume_type
        )));
    }
    Ok(VolumeRequest {
        boot: volume.boot.unwrap_or(false),
        volume_type: volume.volume_type.clone(),
        size: volume.size,
        billing_type: or_default(&volume.billing_type, DEFAULT_BILLING_TYPE),
    })
}

pub fn create_key_pair_request(config: &KeyPairConfig) -> CreateKeyPairRequest {
    CreateKeyPairRequest {
        name: non_empty(&config.name).map(str::to_owned),
    }
}

// ── Update ──────────────────────────────────────────────────────────

pub fn rename(name: &str) -> VmAction {
    VmAction::Rename {
        name: name.to_string(),
    }
}

/// Billing type of the first boot volume, `hourly` when there is none.
pub fn boot_billing_type(volumes: &[VolumeConfig]) -> String {
    volumes
        .iter()
        .find(|v| v.boot.unwrap_or(false))
        .map(|v| or_default(&v.billing_type, DEFAULT_BILLING_TYPE))
        .unwrap_or_else(|| DEFAULT_BILLING_TYPE.to_string())
}

/// Validate a `custom_update` block and turn it into a wire action.
pub fn vm_action(block: &CustomUpdate, volumes: &[VolumeConfig]) -> Result<VmAction> {
    let kind: ActionKind = block
        .action
        .parse()
        .map_err(|_| Error::Validation(format!("unsupported action {:?}", block.action)))?;

    let action = match kind {
        ActionKind::Pause => VmAction::Pause,
        ActionKind::Resume => VmAction::Resume,
        ActionKind::SoftReboot => VmAction::SoftReboot,
        ActionKind::HardReboot => VmAction::HardReboot,
        ActionKind::Lock => VmAction::Lock,
        ActionKind::Unlock => VmAction::Unlock,
        ActionKind::Suspend => VmAction::Suspend,
        ActionKind::Unsuspend => VmAction::Unsuspend,
        ActionKind::ShutOff => VmAction::ShutOff,
        ActionKind::Start => VmAction::Start,
        ActionKind::CreateSnapshot => VmAction::CreateSnapshot {
            name: required(&block.snapshot_name, "snapshot_name", kind)?,
            billing_type: boot_billing_type(volumes),
        },
        ActionKind::AttachInterface => VmAction::AttachInterface {
            network_id: required(&block.network_id, "network_id", kind)?,
            billing_type: boot_billing_type(volumes),
        },
        ActionKind::DetachInterface => VmAction::DetachInterface {
            interface_id: required(&block.interface_id, "interface_id", kind)?,
        },
        ActionKind::AttachVolume => VmAction::AttachVolume {
            volume_id: required(&block.volume_id, "volume_id", kind)?,
            delete_on_termination: block.delete_on_termination.ok_or_else(|| {
                Error::Validation(format!(
                    "delete_on_termination is required when action = {kind}"
                ))
            })?,
        },
        ActionKind::DetachVolume => VmAction::DetachVolume {
            volume_id: required(&block.volume_id, "volume_id", kind)?,
        },
        ActionKind::Rebuild => VmAction::Rebuild {
            disk_config: required(&block.disk_config, "disk_config", kind)?,
            image_id: required(&block.image_id, "image_id", kind)?,
            description: non_empty(&block.description).map(str::to_owned),
        },
    };
    Ok(action)
}

fn required(value: &Option<String>, field: &str, kind: ActionKind) -> Result<String> {
    non_empty(value)
        .map(str::to_owned)
        .ok_or_else(|| Error::Validation(format!("{field} is required when action = {kind}")))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

fn or_default(value: &Option<String>, default: &str) -> String {
    non_empty(value).unwrap_or(default).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vm(extra: serde_json::Value) -> VmConfig {
        let mut base = json!({
            "name": "vm1",
            "flavor": "f1",
            "boot_uuid": "u1",
            "key": "k1",
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(base).unwrap()
    }

    fn volume(boot: Option<bool>, billing_type: Option<&str>) -> VolumeConfig {
        VolumeConfig {
            boot,
            volume_type: "ssd".into(),
            size: 20,
            billing_type: billing_type.map(str::to_owned),
        }
    }

    fn block(action: &str) -> CustomUpdate {
        CustomUpdate {
            action: action.into(),
            ..CustomUpdate::default()
        }
    }

    #[test]
    fn create_applies_schema_defaults() {
        let req = create_vm_request(&vm(json!({}))).unwrap();
        assert!(req.delete_on_termination);
        assert_eq!(req.source_type, "image");
        assert_eq!(req.availability_zone, "nova");
        assert_eq!(req.billing_type, "hourly");
        assert_eq!(req.count, 1);
    }

    #[test]
    fn create_omits_empty_and_null_lists() {
        for extra in [
            json!({}),
            json!({"network": [], "security_group": [], "volumes": []}),
            json!({"network": null, "security_group": null, "volumes": null}),
        ] {
            let body = serde_json::to_value(create_vm_request(&vm(extra)).unwrap()).unwrap();
            let body = body.as_object().unwrap();
            assert!(!body.contains_key("network"));
            assert!(!body.contains_key("security_group"));
            assert!(!body.contains_key("volumes"));
        }
    }

    #[test]
    fn create_copies_scalars_and_lists_in_order() {
        let req = create_vm_request(&vm(json!({
            "delete_on_termination": false,
            "network": ["n1", "n2"],
            "security_group": ["sg"],
            "availability_zone": "zone-b",
            "billing_type": "monthly",
            "vm_count": 3,
            "volumes": [
                {"volume_type": "ssd", "size": 40, "boot": true},
                {"volume_type": "hdd", "size": 100, "billing_type": "monthly"}
            ]
        })))
        .unwrap();

        assert!(!req.delete_on_termination);
        assert_eq!(req.networks, ["n1", "n2"]);
        assert_eq!(req.security_groups, ["sg"]);
        assert_eq!(req.availability_zone, "zone-b");
        assert_eq!(req.billing_type, "monthly");
        assert_eq!(req.count, 3);
        assert_eq!(req.volumes[0].volume_type, "ssd");
        assert_eq!(req.volumes[1].volume_type, "hdd");
    }

    #[test]
    fn volume_defaults_billing_and_boot() {
        let mapped = volume_request(&volume(None, None)).unwrap();
        assert_eq!(mapped.billing_type, "hourly");
        assert!(!mapped.boot);
    }

    #[test]
    fn zero_sized_volume_and_zero_count_rejected() {
        let bad_volume = VolumeConfig {
            size: 0,
            ..volume(Some(true), None)
        };
        assert!(matches!(volume_request(&bad_volume), Err(Error::Validation(_))));
        assert!(matches!(
            create_vm_request(&vm(json!({"vm_count": 0}))),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn boot_billing_follows_boot_volume() {
        let volumes = [volume(Some(false), Some("monthly")), volume(Some(true), Some("hourly"))];
        assert_eq!(boot_billing_type(&volumes), "hourly");

        let volumes = [volume(Some(false), Some("hourly")), volume(Some(true), Some("monthly"))];
        assert_eq!(boot_billing_type(&volumes), "monthly");
    }

    #[test]
    fn boot_billing_falls_back_to_hourly() {
        assert_eq!(boot_billing_type(&[]), "hourly");
        assert_eq!(boot_billing_type(&[volume(None, Some("monthly"))]), "hourly");
        assert_eq!(boot_billing_type(&[volume(Some(true), None)]), "hourly");
    }

    #[test]
    fn parameterless_actions_map_directly() {
        assert_eq!(vm_action(&block("pause-instance"), &[]).unwrap(), VmAction::Pause);
        assert_eq!(vm_action(&block("start-instance"), &[]).unwrap(), VmAction::Start);
        assert_eq!(
            vm_action(&block("unsuspend-instance"), &[]).unwrap(),
            VmAction::Unsuspend
        );
    }

    #[test]
    fn unknown_action_rejected() {
        assert!(matches!(
            vm_action(&block("explode-instance"), &[]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn snapshot_requires_name_and_derives_billing() {
        let err = vm_action(&block("create-snapshot"), &[]).unwrap_err();
        assert!(err.to_string().contains("snapshot_name"));

        let blank = CustomUpdate {
            snapshot_name: Some("  ".into()),
            ..block("create-snapshot")
        };
        assert!(vm_action(&blank, &[]).is_err());

        let named = CustomUpdate {
            snapshot_name: Some("nightly".into()),
            ..block("create-snapshot")
        };
        let volumes = [volume(Some(false), Some("monthly")), volume(Some(true), Some("hourly"))];
        assert_eq!(
            vm_action(&named, &volumes).unwrap(),
            VmAction::CreateSnapshot {
                name: "nightly".into(),
                billing_type: "hourly".into(),
            }
        );
    }

    #[test]
    fn attach_interface_requires_network() {
        assert!(vm_action(&block("attach-interface"), &[]).is_err());

        let update = CustomUpdate {
            network_id: Some("net-9".into()),
            ..block("attach-interface")
        };
        assert_eq!(
            vm_action(&update, &[volume(Some(true), Some("monthly"))]).unwrap(),
            VmAction::AttachInterface {
                network_id: "net-9".into(),
                billing_type: "monthly".into(),
            }
        );
    }

    #[test]
    fn detach_actions_require_their_ids() {
        assert!(vm_action(&block("detach-interface"), &[]).is_err());
        assert!(vm_action(&block("detach-volume"), &[]).is_err());

        let update = CustomUpdate {
            interface_id: Some("port-1".into()),
            ..block("detach-interface")
        };
        assert_eq!(
            vm_action(&update, &[]).unwrap(),
            VmAction::DetachInterface {
                interface_id: "port-1".into()
            }
        );
    }

    #[test]
    fn attach_volume_requires_explicit_delete_flag() {
        let missing_flag = CustomUpdate {
            volume_id: Some("vol-1".into()),
            ..block("attach-volume")
        };
        let err = vm_action(&missing_flag, &[]).unwrap_err();
        assert!(err.to_string().contains("delete_on_termination"));

        let missing_volume = CustomUpdate {
            delete_on_termination: Some(true),
            ..block("attach-volume")
        };
        assert!(vm_action(&missing_volume, &[]).is_err());

        let complete = CustomUpdate {
            volume_id: Some("vol-1".into()),
            delete_on_termination: Some(false),
            ..block("attach-volume")
        };
        assert_eq!(
            vm_action(&complete, &[]).unwrap(),
            VmAction::AttachVolume {
                volume_id: "vol-1".into(),
                delete_on_termination: false,
            }
        );
    }

    #[test]
    fn rebuild_requires_disk_config_and_image() {
        let no_image = CustomUpdate {
            disk_config: Some("AUTO".into()),
            ..block("rebuild-instance")
        };
        assert!(vm_action(&no_image, &[]).is_err());

        let no_disk = CustomUpdate {
            image_id: Some("img-1".into()),
            ..block("rebuild-instance")
        };
        assert!(vm_action(&no_disk, &[]).is_err());

        let complete = CustomUpdate {
            disk_config: Some("AUTO".into()),
            image_id: Some("img-1".into()),
            description: Some(String::new()),
            ..block("rebuild-instance")
        };
        assert_eq!(
            vm_action(&complete, &[]).unwrap(),
            VmAction::Rebuild {
                disk_config: "AUTO".into(),
                image_id: "img-1".into(),
                description: None,
            }
        );
    }

    #[test]
    fn key_pair_name_is_optional() {
        let body = serde_json::to_value(create_key_pair_request(&KeyPairConfig::default())).unwrap();
        assert_eq!(body, json!({}));

        let named = KeyPairConfig {
            name: Some("deploy".into()),
        };
        assert_eq!(
            serde_json::to_value(create_key_pair_request(&named)).unwrap(),
            json!({"name": "deploy"})
        );
    }
}
