//! 基于 rusb 的 HID 设备底层操作。

use std::time::Duration;

use rusb::{Context, Device, DeviceDescriptor, DeviceHandle, Language, UsbContext};

use crate::modules::constants::{
    CONTROL_TIMEOUT_MS, HID_CLASS, HID_REPORT_TYPE_OUTPUT, HID_SET_REPORT,
};
use crate::modules::error::HidError;
use crate::modules::transport::{HidHost, HidLink};
use crate::modules::types::{DeviceInfo, ReadOutcome};

/// HID 接口及其中断端点。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HidInterface {
    number: u8,
    read_endpoint: u8,
    read_packet_size: usize,
    write_endpoint: Option<u8>,
}

/// 字符串描述符索引。
#[derive(Debug, Clone, Copy, Default)]
struct StringIndices {
    manufacturer: Option<u8>,
    product: Option<u8>,
    serial_number: Option<u8>,
}

/// 通过 libusb 访问的主机 HID 栈。
pub struct UsbHost {
    context: Context,
}

impl UsbHost {
    /// 创建新的 USB 上下文。
    pub fn new() -> Result<Self, HidError> {
        let context = Context::new().map_err(|e| {
            #[cfg(feature = "logging")]
            log::error!("Failed to create USB context: {}", e);
            e
        })?;
        Ok(Self { context })
    }

    /// 匹配 VID/PID 且带 HID 接口的设备。`enumerate` 与 `open` 共用同一规则。
    fn matching_devices(
        &self,
        vid: u16,
        pid: u16,
    ) -> Result<Vec<((Device<Context>, DeviceDescriptor), HidInterface)>, HidError> {
        let devices = self.context.devices()?;
        let candidates = devices.iter().filter_map(|device| {
            let desc = device.device_descriptor().ok()?;
            let (vendor_id, product_id) = (desc.vendor_id(), desc.product_id());
            Some(((device, desc), vendor_id, product_id))
        });
        Ok(hid_matches(candidates, vid, pid, |(device, _)| {
            find_hid_interface(device)
        }))
    }
}

impl HidHost for UsbHost {
    type Link = UsbHidDevice;

    fn enumerate(&self, vid: u16, pid: u16) -> Result<Vec<DeviceInfo>, HidError> {
        #[cfg(feature = "logging")]
        log::info!("Enumerating HID devices (VID={:04x}, PID={:04x})...", vid, pid);

        let found: Vec<DeviceInfo> = self
            .matching_devices(vid, pid)?
            .iter()
            .map(|((device, _), _)| device_info(device, vid, pid))
            .collect();

        #[cfg(feature = "logging")]
        log::info!("Found {} matching HID device(s)", found.len());
        Ok(found)
    }

    fn open(&self, vid: u16, pid: u16) -> Result<UsbHidDevice, HidError> {
        #[cfg(feature = "logging")]
        log::info!("Opening HID device (VID={:04x}, PID={:04x})...", vid, pid);

        let found = self.matching_devices(vid, pid)?.into_iter().next();
        let ((device, desc), interface) = match found {
            Some(found) => found,
            None => {
                #[cfg(feature = "logging")]
                log::error!("HID device not found");
                return Err(HidError::DeviceNotFound(vid, pid));
            }
        };

        let mut handle = device.open().map_err(|e| {
            #[cfg(feature = "logging")]
            log::error!("Failed to open device: {}", e);
            HidError::OpenFailed(e.to_string())
        })?;

        // 由 libusb 在声明时分离内核 HID 驱动、在释放时挂回
        if let Err(_e) = handle.set_auto_detach_kernel_driver(true) {
            #[cfg(feature = "logging")]
            log::debug!("Kernel driver auto-detach unavailable: {}", _e);
        }

        handle.claim_interface(interface.number).map_err(|e| {
            #[cfg(feature = "logging")]
            log::error!("Failed to claim interface {}: {}", interface.number, e);
            HidError::OpenFailed(format!("声明接口 {} 失败: {}", interface.number, e))
        })?;

        #[cfg(feature = "logging")]
        log::info!(
            "Opened HID device: interface={}, IN=0x{:02x}, OUT={}",
            interface.number,
            interface.read_endpoint,
            interface
                .write_endpoint
                .map(|ep| format!("0x{:02x}", ep))
                .unwrap_or_else(|| "SET_REPORT".to_string())
        );

        let strings = StringIndices {
            manufacturer: desc.manufacturer_string_index(),
            product: desc.product_string_index(),
            serial_number: desc.serial_number_string_index(),
        };

        Ok(UsbHidDevice {
            handle,
            interface,
            strings,
            language: None,
            closed: false,
        })
    }
}

/// 按 VID/PID 过滤后，只保留带 HID 接口的设备，保持原顺序。
fn hid_matches<D, I, F>(candidates: I, vid: u16, pid: u16, find: F) -> Vec<(D, HidInterface)>
where
    I: IntoIterator<Item = (D, u16, u16)>,
    F: Fn(&D) -> Option<HidInterface>,
{
    candidates
        .into_iter()
        .filter(|(_, vendor_id, product_id)| *vendor_id == vid && *product_id == pid)
        .filter_map(|(device, _, _)| match find(&device) {
            Some(interface) => Some((device, interface)),
            None => {
                #[cfg(feature = "logging")]
                log::debug!("Matching device has no HID interface, skipping");
                None
            }
        })
        .collect()
}

/// 已声明接口的 HID 设备。
pub struct UsbHidDevice {
    handle: DeviceHandle<Context>,
    interface: HidInterface,
    strings: StringIndices,
    language: Option<Language>,
    closed: bool,
}

impl UsbHidDevice {
    fn ensure_open(&self) -> Result<(), HidError> {
        if self.closed {
            return Err(HidError::NotConnected);
        }
        Ok(())
    }

    /// 设备的首选语言，首次读取字符串时查询。
    fn language(&mut self) -> Result<Option<Language>, HidError> {
        if self.language.is_none() {
            let timeout = Duration::from_millis(CONTROL_TIMEOUT_MS);
            self.language = self.handle.read_languages(timeout)?.first().copied();
        }
        Ok(self.language)
    }

    fn read_string(&mut self, index: Option<u8>) -> Result<String, HidError> {
        self.ensure_open()?;
        let index = match index {
            Some(index) => index,
            None => return Ok(String::new()),
        };
        match self.language()? {
            Some(language) => {
                let timeout = Duration::from_millis(CONTROL_TIMEOUT_MS);
                Ok(self.handle.read_string_descriptor(language, index, timeout)?)
            }
            None => Ok(self.handle.read_string_descriptor_ascii(index)?),
        }
    }
}

impl HidLink for UsbHidDevice {
    fn manufacturer_string(&mut self) -> Result<String, HidError> {
        self.read_string(self.strings.manufacturer)
    }

    fn product_string(&mut self) -> Result<String, HidError> {
        self.read_string(self.strings.product)
    }

    fn serial_number_string(&mut self) -> Result<String, HidError> {
        self.read_string(self.strings.serial_number)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, HidError> {
        self.ensure_open()?;
        let timeout = Duration::from_millis(CONTROL_TIMEOUT_MS);

        let result = match self.interface.write_endpoint {
            Some(endpoint) => self.handle.write_interrupt(endpoint, data, timeout),
            None => {
                // 没有中断 OUT 端点时走控制管道 SET_REPORT
                let request_type = rusb::request_type(
                    rusb::Direction::Out,
                    rusb::RequestType::Class,
                    rusb::Recipient::Interface,
                );
                self.handle.write_control(
                    request_type,
                    HID_SET_REPORT,
                    HID_REPORT_TYPE_OUTPUT << 8,
                    u16::from(self.interface.number),
                    data,
                    timeout,
                )
            }
        };

        match result {
            Ok(written) => {
                #[cfg(feature = "logging")]
                log::debug!("HID write: {} of {} bytes sent", written, data.len());
                Ok(written)
            }
            Err(e) => {
                #[cfg(feature = "logging")]
                log::error!("HID write failed: {}", e);
                Err(HidError::SendFailed(e.to_string()))
            }
        }
    }

    fn read_timeout(&mut self, len: usize, timeout: Duration) -> Result<ReadOutcome, HidError> {
        self.ensure_open()?;

        // 缓冲区按端点包长分配，避免设备发送整包时溢出
        let mut buf = vec![0u8; len.max(self.interface.read_packet_size)];
        match self
            .handle
            .read_interrupt(self.interface.read_endpoint, &mut buf, timeout)
        {
            Ok(0) => Ok(ReadOutcome::TimedOut),
            Ok(read) => {
                #[cfg(feature = "logging")]
                log::debug!("HID read: {} bytes received", read);
                buf.truncate(read.min(len));
                Ok(ReadOutcome::Data(buf))
            }
            Err(rusb::Error::Timeout) => {
                #[cfg(feature = "logging")]
                log::debug!("HID read timed out after {:?}", timeout);
                Ok(ReadOutcome::TimedOut)
            }
            Err(e) => {
                #[cfg(feature = "logging")]
                log::error!("HID read failed: {}", e);
                Err(HidError::ReceiveFailed(e.to_string()))
            }
        }
    }

    fn close(&mut self) -> Result<(), HidError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        #[cfg(feature = "logging")]
        log::info!("Releasing interface {}...", self.interface.number);
        self.handle
            .release_interface(self.interface.number)
            .map_err(HidError::from)
    }
}

impl Drop for UsbHidDevice {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn device_info<T: UsbContext>(device: &Device<T>, vid: u16, pid: u16) -> DeviceInfo {
    DeviceInfo {
        vid,
        pid,
        bus: device.bus_number(),
        address: device.address(),
    }
}

/// 在活动配置中查找带中断 IN 端点的 HID 接口。
fn find_hid_interface<T: UsbContext>(device: &Device<T>) -> Option<HidInterface> {
    let config = match device.active_config_descriptor() {
        Ok(config) => config,
        Err(_e) => {
            #[cfg(feature = "logging")]
            log::warn!("Failed to read active configuration: {}", _e);
            return None;
        }
    };

    for interface in config.interfaces() {
        for descriptor in interface.descriptors() {
            if descriptor.class_code() != HID_CLASS {
                continue;
            }

            let mut read = None;
            let mut write_endpoint = None;
            for endpoint in descriptor.endpoint_descriptors() {
                #[cfg(feature = "logging")]
                log::debug!(
                    "  Endpoint 0x{:02x}: dir={:?}, type={:?}",
                    endpoint.address(),
                    endpoint.direction(),
                    endpoint.transfer_type()
                );

                if endpoint.transfer_type() != rusb::TransferType::Interrupt {
                    continue;
                }
                if endpoint.direction() == rusb::Direction::In {
                    read = Some((endpoint.address(), usize::from(endpoint.max_packet_size())));
                } else {
                    write_endpoint = Some(endpoint.address());
                }
            }

            if let Some((read_endpoint, read_packet_size)) = read {
                return Some(HidInterface {
                    number: descriptor.interface_number(),
                    read_endpoint,
                    read_packet_size,
                    write_endpoint,
                });
            }
        }
    }
    None
}

/// 扫描所有 USB 设备。
pub fn scan_devices() -> Vec<DeviceInfo> {
    #[cfg(feature = "logging")]
    log::info!("Scanning USB devices...");
    let context = match Context::new() {
        Ok(c) => c,
        Err(_e) => {
            #[cfg(feature = "logging")]
            log::error!("Failed to create USB context");
            return Vec::new();
        }
    };

    let mut devices = Vec::new();

    match context.devices() {
        Ok(dev_list) => {
            for device in dev_list.iter() {
                if let Ok(desc) = device.device_descriptor() {
                    devices.push(device_info(&device, desc.vendor_id(), desc.product_id()));
                }
            }
        }
        Err(_e) => {
            #[cfg(feature = "logging")]
            log::error!("Failed to get device list");
        }
    }

    #[cfg(feature = "logging")]
    log::info!("Found {} USB devices", devices.len());
    devices
}
