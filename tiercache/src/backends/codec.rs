use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

use crate::core::Result;

/// Converts values to and from the bytes a remote layer stores
pub trait Codec<V>: Send + Sync {
    fn encode(&self, value: &V) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<V>;
}

/// JSON codec backed by serde_json
pub struct JsonCodec<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V> JsonCodec<V> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<V> Default for JsonCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Serialize + DeserializeOwned> Codec<V> for JsonCodec<V> {
    fn encode(&self, value: &V) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<V> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CacheError;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        id: u64,
        name: String,
    }

    #[test]
    fn test_json_codec() {
        let codec = JsonCodec::<User>::new();
        let user = User {
            id: 7,
            name: "Ada".to_string(),
        };

        let bytes = codec.encode(&user).unwrap();
        assert_eq!(bytes, br#"{"id":7,"name":"Ada"}"#);
        assert_eq!(codec.decode(&bytes).unwrap(), user);

        let err = codec.decode(b"not json").unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
