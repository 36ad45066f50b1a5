//! Server to client grant notice: two little-endian `i32`s, target user id
//! followed by the grant flag. User ids are wider than the wire field; both
//! ends narrow them with `wire_id` before comparing.

use serde::Serialize;

use crate::error::{RewardError, Result};

pub const NOTICE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantFlag {
    AlreadyRewarded = 0,
    GrantNow = 1,
}

impl GrantFlag {
    fn from_wire(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(GrantFlag::AlreadyRewarded),
            1 => Some(GrantFlag::GrantNow),
            _ => None,
        }
    }
}

/// Low 32 bits of a user id, as carried by the notice
pub fn wire_id(user_id: i64) -> i32 {
    user_id as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GrantNotice {
    pub target_user_id: i32,
    pub flag: GrantFlag,
}

impl GrantNotice {
    pub fn new(target_user_id: i32, flag: GrantFlag) -> Self {
        Self {
            target_user_id,
            flag,
        }
    }

    pub fn for_player(user_id: i64, flag: GrantFlag) -> Self {
        Self::new(wire_id(user_id), flag)
    }

    pub fn encode(&self) -> [u8; NOTICE_LEN] {
        let mut buf = [0u8; NOTICE_LEN];
        buf[..4].copy_from_slice(&self.target_user_id.to_le_bytes());
        buf[4..].copy_from_slice(&(self.flag as i32).to_le_bytes());
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let bytes: &[u8; NOTICE_LEN] =
            payload
                .try_into()
                .map_err(|_| RewardError::MalformedNotice {
                    message: format!("expected {} bytes, got {}", NOTICE_LEN, payload.len()),
                })?;

        let target_user_id = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let raw_flag = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let flag = GrantFlag::from_wire(raw_flag).ok_or_else(|| RewardError::MalformedNotice {
            message: format!("unknown grant flag {}", raw_flag),
        })?;

        Ok(Self::new(target_user_id, flag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_layout() {
        let notice = GrantNotice::new(1001, GrantFlag::GrantNow);
        assert_eq!(notice.encode(), [0xE9, 0x03, 0, 0, 1, 0, 0, 0]);

        let decoded = GrantNotice::decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0]).unwrap();
        assert_eq!(decoded, GrantNotice::new(-1, GrantFlag::AlreadyRewarded));
    }

    #[test]
    fn test_wide_ids_are_narrowed() {
        let id = 76_561_198_000_000_001_i64;
        let notice = GrantNotice::for_player(id, GrantFlag::GrantNow);

        assert_eq!(notice.target_user_id, wire_id(id));
        assert_eq!(notice.encode()[..4], (id as u64).to_le_bytes()[..4]);
        assert_eq!(wire_id(1001), 1001);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let err = GrantNotice::decode(&[1, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, RewardError::MalformedNotice { .. }));
        assert!(GrantNotice::decode(&[0u8; 9]).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_flag() {
        let err = GrantNotice::decode(&[1, 0, 0, 0, 2, 0, 0, 0]).unwrap_err();
        assert!(err.to_string().contains("unknown grant flag 2"));
    }
}
