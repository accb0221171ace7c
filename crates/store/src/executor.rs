//! Command executor. Pure dispatch of an already-validated
//! [`Command`] to the facade; formats the success body. Adapters decide how
//! to frame the result on the wire (line + `\n` for TCP, JSON + status code
//! for HTTP) and how to render a [`StoreError`] for their protocol.

use crate::command::Command;
use crate::error::StoreError;
use crate::facade::KvStore;

/// Run `cmd` against `store`, returning the response body on success.
///
/// - `Get` → the stored value.
/// - `Set`/`Del` → the literal string `"OK"`.
pub async fn execute(cmd: &Command, store: &impl KvStore) -> Result<String, StoreError> {
    match cmd {
        Command::Get(key) => store.get(key).await,
        Command::Set(key, value) => store.set(key, value).await.map(|()| "OK".to_string()),
        Command::Del(key) => store.del(key).await.map(|()| "OK".to_string()),
    }
}
