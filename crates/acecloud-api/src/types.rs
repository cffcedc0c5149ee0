use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit `null` like a missing field. The gateway sends both.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Instances ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CreateVmRequest {
    pub name: String,
    pub flavor: String,
    pub boot_uuid: String,
    pub delete_on_termination: bool,
    #[serde(rename = "network", skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    #[serde(rename = "security_group", skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,
    pub source_type: String,
    pub key: String,
    pub availability_zone: String,
    pub billing_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeRequest>,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeRequest {
    pub boot: bool,
    pub volume_type: String,
    pub size: u32,
    pub billing_type: String,
}

/// Payload of a successful create; the API only echoes the new id.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedVm {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VmDetails {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub availability_zone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub addresses: Addresses,
}

impl VmDetails {
    /// First public address, if the instance has one yet.
    pub fn public_ip(&self) -> Option<&str> {
        self.addresses
            .public
            .iter()
            .map(|a| a.addr.as_str())
            .find(|addr| !addr.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Addresses {
    #[serde(default, deserialize_with = "null_as_default")]
    pub public: Vec<Address>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub private: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    #[serde(default, deserialize_with = "null_as_default")]
    pub addr: String,
    #[serde(default)]
    pub version: Option<u8>,
    #[serde(default)]
    pub mac_addr: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

// ── Bulk delete ─────────────────────────────────────────────────────

/// Body shared by both bulk-delete endpoints: `{"key":"id","values":[...]}`.
#[derive(Debug, Clone, Serialize)]
pub struct BulkDeleteRequest<'a> {
    pub key: &'static str,
    pub values: &'a [String],
}

impl<'a> BulkDeleteRequest<'a> {
    pub fn by_id(ids: &'a [String]) -> Self {
        Self {
            key: "id",
            values: ids,
        }
    }
}

// ── Key pairs ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateKeyPairRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyPair {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "publicKey", default)]
    pub public_key: Option<String>,
    #[serde(rename = "privateKey", default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
}
