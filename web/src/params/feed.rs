use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IndexParams {
    /// Id of the oldest timeline entry the client already has.
    pub before: Option<String>,
}
