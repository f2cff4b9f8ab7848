use crate::protocol::serial::LineHandle;

use super::{ClientError, MAX_RTU_FRAME_LEN};

/// Size of an exception response: unit, function | 0x80, code, CRC.
pub const EXCEPTION_FRAME_LEN: usize = 5;

pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &b in data {
        crc ^= b as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc >>= 1;
                crc ^= 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Append the RTU checksum (low byte first).
pub fn append_crc(frame: &mut Vec<u8>) {
    let crc = crc16_modbus(frame);
    frame.extend_from_slice(&crc.to_le_bytes());
}

pub fn has_valid_crc(frame: &[u8]) -> bool {
    if frame.len() < 4 {
        return false;
    }
    let (body, tail) = frame.split_at(frame.len() - 2);
    crc16_modbus(body) == u16::from_le_bytes([tail[0], tail[1]])
}

pub fn is_exception(frame: &[u8]) -> bool {
    frame.len() >= 2 && frame[1] & 0x80 != 0
}

/// Read one response of `expected_len` bytes, cutting short when the slave
/// answers with an exception frame. Each underlying read is bounded by the
/// handle's response timeout.
pub fn read_response(handle: &LineHandle, expected_len: usize) -> Result<Vec<u8>, ClientError> {
    let mut target = expected_len.min(MAX_RTU_FRAME_LEN);
    let mut frame = Vec::with_capacity(target);
    let mut chunk = [0u8; MAX_RTU_FRAME_LEN];

    while frame.len() < target {
        let n = handle.read(&mut chunk[..target - frame.len()])?;
        frame.extend_from_slice(&chunk[..n]);
        if is_exception(&frame) {
            target = EXCEPTION_FRAME_LEN;
        }
    }
    frame.truncate(target);

    log::debug!("Received frame: {}", format_hex_bytes(&frame));
    Ok(frame)
}

/// Convert a byte slice into an uppercase hexadecimal string separated by spaces.
pub fn format_hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_matches_known_request() {
        // Read holding register 0x0007 from unit 1.
        let mut frame = vec![0x01, 0x03, 0x00, 0x07, 0x00, 0x01];
        append_crc(&mut frame);
        assert_eq!(&frame[6..], &[0x35, 0xCB]);
        assert!(has_valid_crc(&frame));

        frame[3] ^= 0xFF;
        assert!(!has_valid_crc(&frame));
    }

    #[test]
    fn exception_flag() {
        assert!(is_exception(&[0x01, 0x83, 0x02]));
        assert!(!is_exception(&[0x01, 0x03, 0x02]));
        assert!(!is_exception(&[0x01]));
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(format_hex_bytes(&[0x01, 0xAB, 0x00]), "01 AB 00");
        assert_eq!(format_hex_bytes(&[]), "");
    }
}
