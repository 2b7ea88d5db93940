use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const READ_BUFFER_LENGTH: usize = 64 * 1024; // 64KB

pub fn digest_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Full-content blake3 digest of a file, streamed so large files are never held in memory.
pub fn digest_file(file: &Path) -> io::Result<String> {
    let mut f = File::open(file)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0; READ_BUFFER_LENGTH];

    loop {
        let bytes_read = f.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Reads at most `max_bytes` from the start of a file as text.
/// Invalid UTF-8, including a multi-byte character cut at the limit, is replaced lossily.
pub fn read_sample(file: &Path, max_bytes: usize) -> io::Result<String> {
    let f = File::open(file)?;
    let mut buffer = Vec::new();
    f.take(max_bytes as u64).read_to_end(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
