//! CBOR encoding of entities for the overflow log.

use super::MessageEntity;
use crate::error::{StoreError, StoreResult};

impl MessageEntity {
    /// Serializes the entity into a CBOR chunk payload.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encode`] if serialization fails.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(128 + self.body.len());
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| StoreError::encode(self.message_id.as_str(), e.to_string()))?;
        Ok(buf)
    }

    /// Deserializes an entity from a chunk payload.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Decode`] if the bytes are not a valid entity.
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| StoreError::decode(e.to_string()))
    }
}
