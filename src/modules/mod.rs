//! Generic HID 主机程序的模块声明。

// 常量
pub mod constants;

// 错误类型
pub mod error;

// 公共类型
pub mod types;

// 主机访问层接口
pub mod transport;

// USB 底层操作
pub mod usb;

// 设备会话
pub mod session;
