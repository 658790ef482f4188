//! Two-stage CRC packet signing.

use super::types::{CRC_KEY, CRC_POLYNOMIAL, CRC_SEED};
use crate::error::{Result, SwitcherError};

/// CRC-16 with polynomial 0x1021, MSB first, seeded with 0x1021.
pub(crate) fn crc16(data: &[u8]) -> u16 {
    let mut crc = CRC_SEED;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Low 16 bits of the CRC, byte-swapped, as 4 hex chars.
fn signature_part(data: &[u8]) -> [u8; 2] {
    crc16(data).to_le_bytes()
}

/// Append the 8 hex char signature to an unsigned packet.
pub fn sign_packet(packet_hex: &str) -> Result<String> {
    let binary = hex::decode(packet_hex)
        .map_err(|e| SwitcherError::encoding(format!("failed to sign crc: {e}")))?;

    let crc1 = signature_part(&binary);

    let mut keyed = Vec::with_capacity(crc1.len() + CRC_KEY.len());
    keyed.extend_from_slice(&crc1);
    keyed.extend_from_slice(&CRC_KEY);
    let crc2 = signature_part(&keyed);

    Ok(format!("{packet_hex}{}{}", hex::encode(crc1), hex::encode(crc2)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_known_value() {
        let data = hex::decode("fef0300002320103").unwrap();
        assert_eq!(crc16(&data), 0x7d54);
    }

    #[test]
    fn test_sign_get_state_packet() {
        let packet = "fef030000232010301000000340001000000000000000000ef8db35c00000000000000000000f0fea123bc00";
        let signed = sign_packet(packet).unwrap();
        assert_eq!(signed.len(), packet.len() + 8);
        assert!(signed.starts_with(packet));
        assert!(signed.ends_with("42a9a1b2"));
    }

    #[test]
    fn test_sign_rejects_non_hex() {
        let err = sign_packet("just a regular string").unwrap_err();
        assert!(matches!(err, SwitcherError::Encoding(_)));
    }

    #[test]
    fn test_sign_rejects_odd_length() {
        assert!(sign_packet("fef").is_err());
    }

    #[test]
    fn test_sign_empty_packet() {
        let signed = sign_packet("").unwrap();
        assert_eq!(signed.len(), 8);
    }
}
