//! Connection statistics and info structures

use serde::Serialize;
use std::collections::HashMap;

/// Connection statistics
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStats {
    pub total_connections: usize,
    pub documents: usize,
    /// doc_id -> session count
    pub sessions_per_document: HashMap<String, usize>,
}
