use rmodbus::client::ModbusRequest;

use crate::protocol::serial::LineHandle;

use super::{
    frame::{format_hex_bytes, has_valid_crc, is_exception, read_response},
    protocol_error,
    request::{read_holdings_request, read_inputs_request, write_holding_request},
    ClientError, MAX_READ_REGISTERS,
};

/// Modbus RTU master bound to one slave on a [`LineHandle`].
///
/// The handle must already be connected; the client never opens or closes it.
pub struct ModbusClient<'a> {
    handle: &'a LineHandle,
    unit_id: u8,
}

impl<'a> ModbusClient<'a> {
    pub fn new(handle: &'a LineHandle, unit_id: u8) -> Self {
        Self { handle, unit_id }
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    /// Function 0x03.
    pub fn read_holding_registers(&self, address: u16, count: u16) -> Result<Vec<u16>, ClientError> {
        check_count(count)?;
        let (request, frame) = read_holdings_request(self.unit_id, address, count)?;
        let response = self.transact(&frame, read_response_len(count))?;
        decode_registers(&request, &response, count)
    }

    /// Function 0x04.
    pub fn read_input_registers(&self, address: u16, count: u16) -> Result<Vec<u16>, ClientError> {
        check_count(count)?;
        let (request, frame) = read_inputs_request(self.unit_id, address, count)?;
        let response = self.transact(&frame, read_response_len(count))?;
        decode_registers(&request, &response, count)
    }

    /// Function 0x06. Returns the value echoed by the slave.
    pub fn write_single_register(&self, address: u16, value: u16) -> Result<u16, ClientError> {
        let (request, frame) = write_holding_request(self.unit_id, address, value)?;
        // The slave echoes the request verbatim.
        let response = self.transact(&frame, frame.len())?;
        request.parse_ok(&response).map_err(protocol_error)?;

        let echoed_address = u16::from_be_bytes([response[2], response[3]]);
        if echoed_address != address {
            return Err(ClientError::Protocol(format!(
                "write echo for address {echoed_address}, expected {address}"
            )));
        }
        Ok(u16::from_be_bytes([response[4], response[5]]))
    }

    fn transact(&self, frame: &[u8], expected_len: usize) -> Result<Vec<u8>, ClientError> {
        log::debug!(
            "Sending frame to unit {}: {}",
            self.unit_id,
            format_hex_bytes(frame)
        );
        self.handle.write(frame)?;
        let response = read_response(self.handle, expected_len)?;

        if !has_valid_crc(&response) {
            return Err(ClientError::Protocol(format!(
                "CRC mismatch in response {}",
                format_hex_bytes(&response)
            )));
        }
        if response[0] != self.unit_id {
            return Err(ClientError::Protocol(format!(
                "response from unit {}, expected {}",
                response[0], self.unit_id
            )));
        }
        if is_exception(&response) {
            return Err(ClientError::Exception {
                function: response[1] & 0x7F,
                code: response[2],
            });
        }
        Ok(response)
    }
}

fn check_count(count: u16) -> Result<(), ClientError> {
    if count == 0 || count > MAX_READ_REGISTERS {
        return Err(ClientError::InvalidRequest(format!(
            "register count must be within 1..={MAX_READ_REGISTERS}, got {count}"
        )));
    }
    Ok(())
}

/// unit + function + byte count + 2 bytes per register + CRC
fn read_response_len(count: u16) -> usize {
    5 + count as usize * 2
}

fn decode_registers(
    request: &ModbusRequest,
    response: &[u8],
    count: u16,
) -> Result<Vec<u16>, ClientError> {
    request.parse_ok(response).map_err(protocol_error)?;

    let byte_count = response[2] as usize;
    if byte_count != count as usize * 2 || response.len() != byte_count + 5 {
        return Err(ClientError::Protocol(format!(
            "byte count {byte_count} does not match {count} registers"
        )));
    }

    Ok(response[3..3 + byte_count]
        .chunks_exact(2)
        .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
        .collect())
}
