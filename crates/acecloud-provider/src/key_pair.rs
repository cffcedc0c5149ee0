use acecloud_api::{AceCloudClient, KeyPair};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::mapper::{self, KeyPairConfig};
use crate::{Error, ResourceData, ResourceKind, ResourceLifecycle, Result};

/// Attributes fixed at creation. Key pairs have no update endpoint.
const CREATE_ONLY: &[&str] = &["name"];

/// `acecloud_key_pair` lifecycle.
///
/// Key pairs are immutable remotely; `update` only refreshes. The private
/// key is handed out at creation and later reads usually omit it, so a read
/// never overwrites captured key material with nothing.
pub struct KeyPairResource {
    client: AceCloudClient,
}

impl KeyPairResource {
    pub fn new(client: AceCloudClient) -> Self {
        Self { client }
    }

    fn record(data: &mut ResourceData, kp: &KeyPair) {
        let fields = [
            ("name", Some(kp.name.as_str())),
            ("public_key", kp.public_key.as_deref()),
            ("fingerprint", kp.fingerprint.as_deref()),
            ("type", kp.key_type.as_deref()),
            ("private_key", kp.private_key.as_deref()),
        ];
        for (key, value) in fields {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                data.set_computed(key, value);
            }
        }
    }
}

#[async_trait]
impl ResourceLifecycle for KeyPairResource {
    async fn create(&self, data: &mut ResourceData) -> Result<()> {
        if let Some(id) = data.id() {
            return Err(Error::InvalidState(format!(
                "acecloud_key_pair {id} already exists"
            )));
        }

        let config: KeyPairConfig = data.decode_config()?;
        let kp = self
            .client
            .create_key_pair(&mapper::create_key_pair_request(&config))
            .await?;

        data.set_id(kp.id.as_str())?;
        Self::record(data, &kp);

        info!(key_pair_id = %kp.id, name = %kp.name, "acecloud: key pair created");
        Ok(())
    }

    async fn read(&self, data: &mut ResourceData) -> Result<()> {
        let Some(id) = data.id().map(str::to_owned) else {
            return Ok(());
        };

        match self.client.get_key_pair(&id).await {
            Ok(kp) => {
                Self::record(data, &kp);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!(key_pair_id = %id, error = %e, "acecloud: key pair no longer exists");
                data.clear_id();
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, data: &mut ResourceData) -> Result<()> {
        for field in data.changed(CREATE_ONLY) {
            warn!(
                key_pair_id = data.id().unwrap_or_default(),
                field,
                "acecloud: attribute cannot be changed in place"
            );
        }
        data.commit();
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<()> {
        let Some(id) = data.id().map(str::to_owned) else {
            return Ok(());
        };

        match self.client.delete_key_pairs(std::slice::from_ref(&id)).await {
            Ok(()) => info!(key_pair_id = %id, "acecloud: key pair deleted"),
            Err(e) if e.is_not_found() => {
                warn!(key_pair_id = %id, "acecloud: key pair already deleted");
            }
            Err(e) => return Err(e.into()),
        }

        data.clear_id();
        Ok(())
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::KeyPair
    }
}
