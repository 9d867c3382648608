use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct DevLoginParams {
    pub username: String,
}
