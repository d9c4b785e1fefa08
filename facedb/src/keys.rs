//! KV key layout.
//!
//! Numeric ids and timestamps are zero-padded to 20 decimal digits so that
//! lexicographic scans return rows in numeric order.

/// Format: `{prefix}:seq:{table}`
pub fn seq_key(prefix: &str, table: &str) -> String {
    format!("{prefix}:seq:{table}")
}

/// Format: `{prefix}:person:{id}`
pub fn person_key(prefix: &str, id: u64) -> String {
    format!("{prefix}:person:{id:020}")
}

pub fn person_prefix(prefix: &str) -> String {
    format!("{prefix}:person:")
}

/// Secondary index over `(name, is_active)`.
/// Format: `{prefix}:pname:{name}:{id}`, value `1` (active) or `0`.
pub fn name_key(prefix: &str, name: &str, id: u64) -> String {
    format!("{prefix}:pname:{name}:{id:020}")
}

pub fn name_prefix(prefix: &str, name: &str) -> String {
    format!("{prefix}:pname:{name}:")
}

/// Groups are keyed by their unique name.
/// Format: `{prefix}:group:{name}`
pub fn group_key(prefix: &str, name: &str) -> String {
    format!("{prefix}:group:{name}")
}

pub fn group_prefix(prefix: &str) -> String {
    format!("{prefix}:group:")
}

/// Group id to name. Format: `{prefix}:gid:{gid}`
pub fn group_id_key(prefix: &str, gid: u64) -> String {
    format!("{prefix}:gid:{gid:020}")
}

/// Membership, identity side. Format: `{prefix}:pg:{id}:{gid}`
pub fn member_key(prefix: &str, id: u64, gid: u64) -> String {
    format!("{prefix}:pg:{id:020}:{gid:020}")
}

pub fn member_prefix(prefix: &str, id: u64) -> String {
    format!("{prefix}:pg:{id:020}:")
}

/// Membership, group side. Format: `{prefix}:gp:{gid}:{id}`
pub fn group_member_key(prefix: &str, gid: u64, id: u64) -> String {
    format!("{prefix}:gp:{gid:020}:{id:020}")
}

pub fn group_member_prefix(prefix: &str, gid: u64) -> String {
    format!("{prefix}:gp:{gid:020}:")
}

/// Format: `{prefix}:enc:{id}:{eid}`
pub fn encoding_key(prefix: &str, id: u64, eid: u64) -> String {
    format!("{prefix}:enc:{id:020}:{eid:020}")
}

/// All encodings when `id` is `None`, one identity's otherwise.
pub fn encoding_prefix(prefix: &str, id: Option<u64>) -> String {
    match id {
        Some(id) => format!("{prefix}:enc:{id:020}:"),
        None => format!("{prefix}:enc:"),
    }
}

/// Format: `{prefix}:img:{id}:{iid}`
pub fn image_key(prefix: &str, id: u64, iid: u64) -> String {
    format!("{prefix}:img:{id:020}:{iid:020}")
}

pub fn image_prefix(prefix: &str, id: u64) -> String {
    format!("{prefix}:img:{id:020}:")
}

/// Index over `(identity_id, detection_time)`.
/// Format: `{prefix}:det:{id}:{ts_ns}:{did}`
pub fn detection_key(prefix: &str, id: u64, ts_ns: i64, did: u64) -> String {
    let ts = ts_ns.max(0);
    format!("{prefix}:det:{id:020}:{ts:020}:{did:020}")
}

pub fn detection_prefix(prefix: &str, id: u64) -> String {
    format!("{prefix}:det:{id:020}:")
}

/// Parse the trailing 20-digit id of a key that starts with `prefix`.
/// Returns `None` if anything other than exactly one padded id follows.
pub fn trailing_id(key: &str, prefix: &str) -> Option<u64> {
    let rest = key.strip_prefix(prefix)?;
    if rest.len() != 20 || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}
