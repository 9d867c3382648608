use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct CreateParams {
    pub content: String,
}
