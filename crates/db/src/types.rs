/// A `consumptions` row as stored, including the bookkeeping columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredConsumption {
    pub date: String,
    pub client_id: String,
    pub client_name: Option<String>,
    pub service_name: Option<String>,
    pub total_consumed_tokens: i64,
    pub created_at: String,
    pub updated_at: String,
    pub is_active: bool,
}
