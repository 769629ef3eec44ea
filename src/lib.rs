//! Generic HID 参考设计的主机端库。
//!
//! 按 VID/PID 打开唯一的 HID 设备，依次发送 START、STOP、RESET 命令，
//! 每个阶段读取 5 次 4 字节应答并原样打印，最后再发送一次 STOP 并关闭设备。
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use generic_hid_host::{run_session, SessionConfig, UsbHost};
//!
//! let host = UsbHost::new()?;
//! let interrupt = AtomicBool::new(false);
//! run_session(&host, &SessionConfig::default(), &mut std::io::stdout(), &interrupt)?;
//! # Ok::<(), generic_hid_host::HidError>(())
//! ```

pub mod modules;

pub use modules::constants::{USB_PID, USB_VID};
pub use modules::error::HidError;
pub use modules::session::{
    run_phase, run_session, send_command, DeviceGuard, Phase, SessionConfig, SessionReport,
    TimeoutReport, PHASES,
};
pub use modules::transport::{HidHost, HidLink};
pub use modules::types::{packet, Command, DeviceInfo, ReadOutcome};
pub use modules::usb::{scan_devices, UsbHidDevice, UsbHost};
