use acecloud_api::{AceCloudClient, VmAction, VmDetails};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::mapper::{self, VmConfig};
use crate::{Error, ResourceData, ResourceKind, ResourceLifecycle, Result};

/// Attributes the API cannot change in place. Edits to these are reported
/// and otherwise left for the host to handle by replacement.
const CREATE_ONLY: &[&str] = &[
    "flavor",
    "boot_uuid",
    "key",
    "delete_on_termination",
    "network",
    "security_group",
    "source_type",
    "availability_zone",
    "billing_type",
    "volumes",
    "vm_count",
];

/// `acecloud_vm` lifecycle.
pub struct VmResource {
    client: AceCloudClient,
}

impl VmResource {
    pub fn new(client: AceCloudClient) -> Self {
        Self { client }
    }

    fn record(data: &mut ResourceData, vm: &VmDetails) {
        data.set_computed("instance_id", vm.id.as_str());
        data.set_computed("status", vm.status.as_str());
        data.set_computed("ip_address", vm.public_ip().unwrap_or_default());
    }

    /// Every update call the configuration change needs, validated up front
    /// so a bad action block fails before anything is sent.
    fn planned_actions(data: &ResourceData, config: &VmConfig) -> Result<Vec<VmAction>> {
        let mut actions = Vec::new();
        if data.has_change("name") {
            actions.push(mapper::rename(&config.name));
        }
        if data.has_change("custom_update") {
            if let Some(block) = &config.custom_update {
                actions.push(mapper::vm_action(block, config.volumes())?);
            }
        }
        Ok(actions)
    }
}

#[async_trait]
impl ResourceLifecycle for VmResource {
    async fn create(&self, data: &mut ResourceData) -> Result<()> {
        if let Some(id) = data.id() {
            return Err(Error::InvalidState(format!("acecloud_vm {id} already exists")));
        }

        let config: VmConfig = data.decode_config()?;
        let req = mapper::create_vm_request(&config)?;
        let created = self.client.create_vm(&req).await?;

        data.set_id(created.id.as_str())?;
        data.set_computed("instance_id", created.id.as_str());

        // The create response carries no status or address; they show up on
        // the next read.
        info!(vm_id = %created.id, name = %config.name, "acecloud: vm created");
        Ok(())
    }

    async fn read(&self, data: &mut ResourceData) -> Result<()> {
        let Some(id) = data.id().map(str::to_owned) else {
            return Ok(());
        };

        match self.client.get_vm(&id).await {
            Ok(vm) => {
                Self::record(data, &vm);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!(vm_id = %id, error = %e, "acecloud: vm no longer exists");
                data.clear_id();
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, data: &mut ResourceData) -> Result<()> {
        let id = data
            .id()
            .map(str::to_owned)
            .ok_or_else(|| Error::InvalidState("acecloud_vm has no remote id".into()))?;

        let config: VmConfig = data.decode_config()?;
        let actions = Self::planned_actions(data, &config)?;

        for field in data.changed(CREATE_ONLY) {
            warn!(vm_id = %id, field, "acecloud: attribute cannot be changed in place");
        }

        for action in &actions {
            match self.client.update_vm(&id, action).await {
                Ok(()) => info!(vm_id = %id, action = action.name(), "acecloud: vm updated"),
                Err(e) if e.is_not_found() => {
                    warn!(vm_id = %id, action = action.name(), "acecloud: vm vanished during update");
                    data.clear_id();
                    data.commit();
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }

        data.commit();
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<()> {
        let Some(id) = data.id().map(str::to_owned) else {
            return Ok(());
        };

        match self.client.delete_vms(std::slice::from_ref(&id)).await {
            Ok(()) => info!(vm_id = %id, "acecloud: vm destroyed"),
            Err(e) if e.is_not_found() => {
                warn!(vm_id = %id, "acecloud: vm already destroyed");
            }
            Err(e) => return Err(e.into()),
        }

        data.clear_id();
        Ok(())
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Vm
    }
}
