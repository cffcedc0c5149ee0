use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Everything the host tracks for one resource instance.
///
/// `config` is the declared configuration, `prior` the configuration that
/// was last applied (present only while planning an update), and `computed`
/// the attributes filled in from the API. All three are plain JSON objects
/// so any host can persist them as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    config: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prior: Option<Map<String, Value>>,
    #[serde(default)]
    computed: Map<String, Value>,
}

impl ResourceData {
    pub fn new(config: Map<String, Value>) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// State for an object that already exists remotely.
    pub fn existing(id: impl Into<String>, config: Map<String, Value>) -> Self {
        Self {
            id: Some(id.into()),
            config,
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Record the remote id. It may be set once; re-setting the same value
    /// is accepted, a different value is not.
    pub fn set_id(&mut self, id: impl Into<String>) -> Result<()> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidState("remote id is empty".into()));
        }
        match &self.id {
            Some(current) if *current != id => Err(Error::InvalidState(format!(
                "remote id already set to {current}, refusing {id}"
            ))),
            _ => {
                self.id = Some(id);
                Ok(())
            }
        }
    }

    /// Forget the remote object. Computed attributes go with it.
    pub fn clear_id(&mut self) {
        self.id = None;
        self.computed.clear();
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn prior(&self) -> Option<&Map<String, Value>> {
        self.prior.as_ref()
    }

    /// Decode the declared configuration into a typed model.
    pub fn decode_config<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.config.clone()))
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Stage a new declared configuration; the current one becomes `prior`.
    pub fn plan(&mut self, config: Map<String, Value>) {
        let previous = std::mem::replace(&mut self.config, config);
        self.prior = Some(previous);
    }

    /// Drop `prior` once an update has been applied.
    pub fn commit(&mut self) {
        self.prior = None;
    }

    /// Whether `key` differs between the declared and prior configuration.
    /// Nothing counts as changed until a new configuration is planned.
    pub fn has_change(&self, key: &str) -> bool {
        let Some(prior) = &self.prior else {
            return false;
        };
        self.config.get(key).filter(|v| !v.is_null()) != prior.get(key).filter(|v| !v.is_null())
    }

    /// The subset of `keys` that [`has_change`](Self::has_change) reports.
    pub fn changed<'a>(&self, keys: &[&'a str]) -> Vec<&'a str> {
        keys.iter().copied().filter(|k| self.has_change(k)).collect()
    }

    pub fn computed(&self) -> &Map<String, Value> {
        &self.computed
    }

    pub fn get_computed(&self, key: &str) -> Option<&Value> {
        self.computed.get(key)
    }

    pub fn set_computed(&mut self, key: &str, value: impl Into<Value>) {
        self.computed.insert(key.to_string(), value.into());
    }
}
