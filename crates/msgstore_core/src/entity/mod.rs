//! Message entities and their persisted encoding.

mod codec;
mod id;
mod message;

pub use id::{message_id_for_shard, new_message_id};
pub use message::{MessageEntity, MessageHeader};
