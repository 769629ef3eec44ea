//! Generic HID 主机程序的公共类型定义。

use std::fmt;

use crate::modules::constants::REPORT_SIZE;

/// 发送给固件的命令（输出报告的字节 0）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// 启动固件定时器，开始上报计数。
    Start = 1,
    /// 停止固件定时器。
    Stop = 2,
    /// 计数清零并重新启动定时器。
    Reset = 3,
}

impl Command {
    /// 获取命令码。
    pub fn opcode(self) -> u8 {
        self as u8
    }

    /// 命令名称。
    pub fn name(self) -> &'static str {
        match self {
            Command::Start => "START",
            Command::Stop => "STOP",
            Command::Reset => "RESET",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 构造命令包 `[opcode, 0, 0, 0]`。
pub fn packet(command: Command) -> [u8; REPORT_SIZE] {
    let mut report = [0u8; REPORT_SIZE];
    report[0] = command.opcode();
    report
}

/// 一次带超时读取的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// 收到的原始数据。
    Data(Vec<u8>),
    /// 超时内没有数据。
    TimedOut,
}

impl ReadOutcome {
    /// 按固件格式解码计数值（小端 u32）。
    pub fn counter(&self) -> Option<u32> {
        match self {
            ReadOutcome::Data(data) if data.len() >= 4 => {
                Some(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
            }
            _ => None,
        }
    }
}

/// 设备信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// 厂商 ID。
    pub vid: u16,
    /// 产品 ID。
    pub pid: u16,
    /// 总线号。
    pub bus: u8,
    /// 设备地址。
    pub address: u8,
}

impl DeviceInfo {
    /// 是否匹配给定的 VID/PID。
    pub fn matches(&self, vid: u16, pid: u16) -> bool {
        self.vid == vid && self.pid == pid
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} (bus {:03}, address {:03})",
            self.vid, self.pid, self.bus, self.address
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packets_carry_opcode_in_first_byte() {
        assert_eq!(packet(Command::Start), [1, 0, 0, 0]);
        assert_eq!(packet(Command::Stop), [2, 0, 0, 0]);
        assert_eq!(packet(Command::Reset), [3, 0, 0, 0]);
    }

    #[test]
    fn opcodes_match_firmware_commands() {
        assert_eq!(Command::Start.opcode(), 1);
        assert_eq!(Command::Stop.opcode(), 2);
        assert_eq!(Command::Reset.opcode(), 3);
        assert_eq!(Command::Reset.to_string(), "RESET");
    }

    #[test]
    fn counter_is_little_endian() {
        let outcome = ReadOutcome::Data(vec![0x2a, 0x01, 0, 0]);
        assert_eq!(outcome.counter(), Some(0x012a));
        assert_eq!(ReadOutcome::Data(vec![1, 2]).counter(), None);
        assert_eq!(ReadOutcome::TimedOut.counter(), None);
    }

    #[test]
    fn device_info_formats_ids_in_hex() {
        let info = DeviceInfo {
            vid: 0x0123,
            pid: 0x0456,
            bus: 1,
            address: 7,
        };
        assert!(info.matches(0x0123, 0x0456));
        assert!(!info.matches(0x0123, 0x0457));
        assert_eq!(info.to_string(), "0123:0456 (bus 001, address 007)");
    }
}
