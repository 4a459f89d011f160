/// JSON-RPC 2.0 error codes used on the A2A wire.
///
/// Protocol-level conditions are never surfaced as non-200 HTTP
/// statuses; they always travel inside the envelope under one of these
/// codes so A2A clients can inspect them.
pub mod codes {
    /// Request body was not valid JSON.
    pub const PARSE_ERROR: i64 = -32700;
    /// `jsonrpc` field present but not "2.0". A missing field is
    /// tolerated and treated as 2.0.
    pub const INVALID_REQUEST: i64 = -32600;
    /// No agent registered under the requested id.
    pub const AGENT_NOT_FOUND: i64 = -32000;
    /// Agent generation failed, including tool errors surfaced through
    /// the generation boundary.
    pub const GENERATION_ERROR: i64 = -32001;
    /// Catch-all for faults not already converted to a typed error.
    pub const INTERNAL_ERROR: i64 = -32603;
}
