use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateParams {
    pub content: String,
    #[serde(default)]
    pub spoiler_of: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spoiler_of_is_optional_and_camel_cased() {
        let plain: CreateParams = serde_json::from_str(r#"{"content":"hi"}"#).unwrap();
        let spoiler: CreateParams =
            serde_json::from_str(r#"{"content":"hi","spoilerOf":"Dune"}"#).unwrap();

        assert_eq!(plain.spoiler_of, None);
        assert_eq!(spoiler.spoiler_of.as_deref(), Some("Dune"));
    }
}
