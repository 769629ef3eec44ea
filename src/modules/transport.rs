//! HID 主机访问层的抽象接口。

use std::time::Duration;

use crate::modules::error::HidError;
use crate::modules::types::{DeviceInfo, ReadOutcome};

/// 主机 HID 栈：枚举与打开设备。
pub trait HidHost {
    /// 打开后得到的设备连接类型。
    type Link: HidLink;

    /// 列出匹配 VID/PID 的 HID 设备。
    fn enumerate(&self, vid: u16, pid: u16) -> Result<Vec<DeviceInfo>, HidError>;

    /// 打开匹配 VID/PID 的设备。
    fn open(&self, vid: u16, pid: u16) -> Result<Self::Link, HidError>;
}

/// 已打开的 HID 设备连接。
pub trait HidLink {
    /// 厂商字符串。
    fn manufacturer_string(&mut self) -> Result<String, HidError>;

    /// 产品字符串。
    fn product_string(&mut self) -> Result<String, HidError>;

    /// 序列号字符串。
    fn serial_number_string(&mut self) -> Result<String, HidError>;

    /// 发送输出报告，返回实际写入的字节数。
    fn write(&mut self, data: &[u8]) -> Result<usize, HidError>;

    /// 读取最多 `len` 字节的输入报告；超时返回 `ReadOutcome::TimedOut`。
    fn read_timeout(&mut self, len: usize, timeout: Duration) -> Result<ReadOutcome, HidError>;

    /// 释放设备。
    fn close(&mut self) -> Result<(), HidError>;
}
