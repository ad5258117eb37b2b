use serde::{Deserialize, Serialize};

/// Client-rendered avatar description: six part ids plus optional
/// palette. Opaque to the server except for seeding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarConfig {
    pub parts: [u8; 6],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<[String; 6]>,
}

impl AvatarConfig {
    /// Derives a full part set from a single numeric seed, for clients
    /// that send `avatar_id` instead of a full config.
    pub fn from_seed(seed: u64) -> Self {
        let mut parts = [0u8; 6];
        let mut acc = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        for part in &mut parts {
            acc = acc.rotate_left(11).wrapping_mul(0x2545_F491_4F6C_DD1D);
            *part = (acc % 8) as u8;
        }
        Self {
            parts,
            colors: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_seed_is_deterministic() {
        assert_eq!(AvatarConfig::from_seed(42), AvatarConfig::from_seed(42));
        assert_ne!(AvatarConfig::from_seed(1), AvatarConfig::from_seed(2));
    }

    #[test]
    fn test_parts_stay_in_range() {
        for seed in 0..64 {
            for part in AvatarConfig::from_seed(seed).parts {
                assert!(part < 8);
            }
        }
    }
}
