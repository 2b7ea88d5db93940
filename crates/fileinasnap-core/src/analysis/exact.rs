use crate::hasher::{ContentKey, KeyStrategy};
use crate::model::FileDescriptor;
use ahash::AHashMap;
use tracing::debug;

/// Groups file indices sharing an exact-match key.
///
/// Only keys held by two or more files are returned. Groups come out in order of their
/// first member, and members keep input order.
pub fn group_exact(files: &[FileDescriptor], strategy: KeyStrategy) -> Vec<Vec<usize>> {
    let mut slot_by_key: AHashMap<ContentKey, usize> = AHashMap::new();
    let mut slots: Vec<Vec<usize>> = Vec::new();

    for (idx, file) in files.iter().enumerate() {
        let key = ContentKey::for_file(file, strategy);
        match slot_by_key.get(&key) {
            Some(&slot) => slots[slot].push(idx),
            None => {
                slot_by_key.insert(key, slots.len());
                slots.push(vec![idx]);
            }
        }
    }

    for (key, &slot) in &slot_by_key {
        if key.is_surrogate() && slots[slot].len() > 1 {
            debug!(
                "{} files grouped on weak key {} (no hash or content available)",
                slots[slot].len(),
                key
            );
        }
    }

    slots.into_iter().filter(|members| members.len() > 1).collect()
}
