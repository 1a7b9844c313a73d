// Check-in wire protocol
//
// Request:  POST <check path> with a compact JSON identity document
// Response: JSON decision signed with server_token =
//           hex(HMAC-SHA256(secret, "update:version:url:checksum:protocol_version:notes:timestamp"))

pub mod request;
pub mod response;

pub use request::{build_request, CheckUpdateRequest, RequestBody, REQUEST_CAPACITY};
pub use response::{parse, CanonicalMessage, UpdateDecision, CANONICAL_CAPACITY};
