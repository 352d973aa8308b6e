//! Content fingerprints for run inputs.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ResultsResult;

/// `"<name>@<first 16 hex digits of sha256(json(value))>"`
pub fn fingerprint<T: Serialize>(name: &str, value: &T) -> ResultsResult<String> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    Ok(format!("{name}@{}", &digest[..16]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Pack {
        cells: Vec<(String, u32)>,
    }

    #[test]
    fn fingerprint_is_stable() {
        let pack = Pack {
            cells: vec![("a".into(), 0), ("b".into(), 1)],
        };
        let a = fingerprint("pack", &pack).unwrap();
        let b = fingerprint("pack", &pack).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("pack@"));
        assert_eq!(a.len(), "pack@".len() + 16);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = fingerprint("pack", &Pack { cells: vec![("a".into(), 0)] }).unwrap();
        let b = fingerprint("pack", &Pack { cells: vec![("a".into(), 1)] }).unwrap();
        assert_ne!(a, b);
    }
}
