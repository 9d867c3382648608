use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct CreateParams {
    pub email: String,
    pub username: String,
}
