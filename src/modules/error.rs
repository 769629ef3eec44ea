//! Generic HID 主机程序的错误类型定义。

use thiserror::Error;

/// 与 HID 设备通信时可能发生的错误。
#[derive(Debug, Error)]
pub enum HidError {
    #[error("匹配的设备数量为 {found}，需要恰好 1 个 (VID={vid:04x}, PID={pid:04x})")]
    DeviceCount { vid: u16, pid: u16, found: usize },

    #[error("未找到设备 (VID={0:04x}, PID={1:04x})")]
    DeviceNotFound(u16, u16),

    #[error("USB 错误: {0}")]
    UsbError(#[from] rusb::Error),

    #[error("打开设备失败: {0}")]
    OpenFailed(String),

    #[error("发送数据失败: {0}")]
    SendFailed(String),

    #[error("接收数据失败: {0}")]
    ReceiveFailed(String),

    #[error("未连接到设备")]
    NotConnected,

    #[error("用户中断")]
    Interrupted,

    #[error("输出失败: {0}")]
    Output(#[from] std::io::Error),
}

impl HidError {
    /// 是否为设备数量不符（进程应静默退出）。
    pub fn is_device_count(&self) -> bool {
        matches!(self, HidError::DeviceCount { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_count_is_detected() {
        let err = HidError::DeviceCount {
            vid: 0x0123,
            pid: 0x0456,
            found: 2,
        };
        assert!(err.is_device_count());
        assert!(err.to_string().contains("0123"));
        assert!(!HidError::NotConnected.is_device_count());
    }

    #[test]
    fn usb_errors_convert() {
        let err: HidError = rusb::Error::NoDevice.into();
        assert!(matches!(err, HidError::UsbError(rusb::Error::NoDevice)));
    }
}
