use {serde::Deserialize, std::collections::HashMap};

/// Response of `GET {base}/{airnode}`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Response {
    /// Signed data keyed by beacon id.
    pub data: HashMap<String, SignedData>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignedData {
    pub template_id: String,
    pub timestamp: String,
    pub encoded_value: String,
    pub signature: String,
}
