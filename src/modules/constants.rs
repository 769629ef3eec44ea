//! Generic HID 主机程序的常量定义。

/// 参考固件的 USB 厂商 ID。
pub const USB_VID: u16 = 0x0123;

/// 参考固件的 USB 产品 ID。
pub const USB_PID: u16 = 0x0456;

/// 输入/输出报告长度（字节）。
pub const REPORT_SIZE: usize = 4;

/// START 与 RESET 阶段的读超时（毫秒）。
pub const RUN_READ_TIMEOUT_MS: u64 = 2000;

/// STOP 阶段的读超时（毫秒）。
pub const STOP_READ_TIMEOUT_MS: u64 = 1000;

/// 每个阶段的读取次数。
pub const READS_PER_PHASE: usize = 5;

/// 最后一次 STOP 之后、关闭设备之前的等待时间（毫秒）。
pub const FINAL_DELAY_MS: u64 = 5000;

/// 控制传输超时（毫秒）。
pub const CONTROL_TIMEOUT_MS: u64 = 1000;

/// 中断标志的轮询间隔（毫秒）。
pub const INTERRUPT_POLL_MS: u64 = 100;

/// USB HID 接口类代码。
pub const HID_CLASS: u8 = 0x03;

/// HID SET_REPORT 请求码。
pub const HID_SET_REPORT: u8 = 0x09;

/// HID 输出报告类型（SET_REPORT 的 wValue 高字节）。
pub const HID_REPORT_TYPE_OUTPUT: u16 = 0x02;
