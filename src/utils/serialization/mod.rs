use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};

pub trait Serializer {
    fn serialize<T: Serialize>(&self, data: &T) -> Result<Vec<u8>>;
    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;

    fn serialize_to_string<T: Serialize>(&self, data: &T) -> Result<String> {
        Ok(String::from_utf8(self.serialize(data)?)?)
    }
}

/// JSON codec used for history files and CLI output.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    pub pretty: bool,
}

impl JsonSerializer {
    pub fn compact() -> Self {
        JsonSerializer { pretty: false }
    }

    pub fn pretty() -> Self {
        JsonSerializer { pretty: true }
    }
}

impl Serializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, data: &T) -> Result<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(data)?
        } else {
            serde_json::to_vec(data)?
        };
        Ok(bytes)
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        serde_json::from_slice(data).map_err(Into::into)
    }
}
