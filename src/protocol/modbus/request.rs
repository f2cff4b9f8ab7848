use rmodbus::{client::ModbusRequest, ModbusProto};

use super::{protocol_error, ClientError};

/// Build a frame to read holding registers (function 0x03).
pub fn read_holdings_request(
    unit_id: u8,
    address: u16,
    count: u16,
) -> Result<(ModbusRequest, Vec<u8>), ClientError> {
    let mut request = ModbusRequest::new(unit_id, ModbusProto::Rtu);
    let mut raw = Vec::new();
    request
        .generate_get_holdings(address, count, &mut raw)
        .map_err(protocol_error)?;
    Ok((request, raw))
}

/// Build a frame to read input registers (function 0x04).
pub fn read_inputs_request(
    unit_id: u8,
    address: u16,
    count: u16,
) -> Result<(ModbusRequest, Vec<u8>), ClientError> {
    let mut request = ModbusRequest::new(unit_id, ModbusProto::Rtu);
    let mut raw = Vec::new();
    request
        .generate_get_inputs(address, count, &mut raw)
        .map_err(protocol_error)?;
    Ok((request, raw))
}

/// Build a frame to write a single holding register (function 0x06)
pub fn write_holding_request(
    unit_id: u8,
    address: u16,
    value: u16,
) -> Result<(ModbusRequest, Vec<u8>), ClientError> {
    let mut request = ModbusRequest::new(unit_id, ModbusProto::Rtu);
    let mut raw = Vec::new();
    request
        .generate_set_holding(address, value, &mut raw)
        .map_err(protocol_error)?;
    Ok((request, raw))
}
