use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

/// Hash with SipHash under fixed keys, so values are stable from run to run.
pub fn stable_hash_with(f: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    f(&mut hasher);
    hasher.finish()
}
