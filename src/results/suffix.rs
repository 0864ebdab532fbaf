/// Entity alias suffix for the n-th entity alias: `a_`, `b_`, ... `z_`, `aa_`, ...
pub fn entity_suffix(seed: usize) -> String {
    let mut letters = Vec::new();
    let mut n = seed + 1;
    while n > 0 {
        n -= 1;
        letters.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    letters.iter().rev().collect::<String>() + "_"
}

/// Collection alias suffix for the n-th collection alias: `0__`, `1__`, ...
pub fn collection_suffix(seed: usize) -> String {
    format!("{}__", seed)
}

#[cfg(test)]
mod tests {
    use crate::results::{collection_suffix, entity_suffix};

    #[test]
    pub fn test_entity_suffixes() {
        assert_eq!(entity_suffix(0), "a_");
        assert_eq!(entity_suffix(1), "b_");
        assert_eq!(entity_suffix(25), "z_");
        assert_eq!(entity_suffix(26), "aa_");
        assert_eq!(entity_suffix(27), "ab_");
        assert_eq!(entity_suffix(701), "zz_");
        assert_eq!(entity_suffix(702), "aaa_");
    }

    #[test]
    pub fn test_collection_suffixes() {
        assert_eq!(collection_suffix(0), "0__");
        assert_eq!(collection_suffix(12), "12__");
    }
}
