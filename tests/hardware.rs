//! 针对真实参考固件的集成测试。
//!
//! 需要连接 VID=0x0123, PID=0x0456 的设备。
//! 运行方式: cargo test --test hardware -- --ignored --nocapture

use std::time::Duration;

use generic_hid_host::{HidHost, HidLink, UsbHidDevice, UsbHost, USB_PID, USB_VID};

fn open_device() -> (UsbHost, UsbHidDevice) {
    let host = UsbHost::new().expect("USB context");
    let device = host
        .open(USB_VID, USB_PID)
        .expect("No reference device found — plug in the board");
    (host, device)
}

/// 关闭后内核驱动应已挂回，设备可以再次被枚举和打开。
#[test]
#[ignore] // requires hardware
fn reopen_after_close() {
    let (host, mut device) = open_device();
    device.close().unwrap();
    drop(device);

    assert_eq!(host.enumerate(USB_VID, USB_PID).unwrap().len(), 1);
    let mut again = host.open(USB_VID, USB_PID).unwrap();
    again.close().unwrap();
}

/// 字符串描述符按设备语言读取（UTF-16），内容非空。
#[test]
#[ignore] // requires hardware
fn descriptor_strings_are_readable() {
    let (_host, mut device) = open_device();
    let manufacturer = device.manufacturer_string().unwrap();
    let product = device.product_string().unwrap();
    println!("Manufacturer: {}", manufacturer);
    println!("Product: {}", product);
    assert!(!manufacturer.is_empty());
    assert!(!product.contains('\u{fffd}'));
    device.close().unwrap();
}

/// START 之后固件每次上报递增的计数。
#[test]
#[ignore] // requires hardware
fn counter_increases_after_start() {
    let (_host, mut device) = open_device();
    assert_eq!(device.write(&[1, 0, 0, 0]).unwrap(), 4);

    let mut counters = Vec::new();
    for _ in 0..3 {
        let outcome = device
            .read_timeout(4, Duration::from_millis(2000))
            .unwrap();
        if let Some(counter) = outcome.counter() {
            counters.push(counter);
        }
    }
    device.write(&[2, 0, 0, 0]).unwrap();
    device.close().unwrap();

    assert!(counters.windows(2).all(|w| w[0] < w[1]), "{:?}", counters);
}

/// 关闭后的句柄不能再使用。
#[test]
#[ignore] // requires hardware
fn closed_device_rejects_io() {
    let (_host, mut device) = open_device();
    device.close().unwrap();
    assert!(device.write(&[2, 0, 0, 0]).is_err());
    assert!(device
        .read_timeout(4, Duration::from_millis(10))
        .is_err());
}
