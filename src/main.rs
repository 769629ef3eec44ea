use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use generic_hid_host::modules::constants::FINAL_DELAY_MS;
use generic_hid_host::{run_session, scan_devices, SessionConfig, TimeoutReport, UsbHost};

/// Generic HID 参考设计的主机端程序
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// 厂商 ID（支持 0x 前缀的十六进制）
    #[arg(long, value_parser = parse_id, default_value = "0x0123")]
    vid: u16,

    /// 产品 ID（支持 0x 前缀的十六进制）
    #[arg(long, value_parser = parse_id, default_value = "0x0456")]
    pid: u16,

    /// 最后一次 STOP 之后的等待时间（毫秒）
    #[arg(long, default_value_t = FINAL_DELAY_MS)]
    final_delay_ms: u64,

    /// 所有阶段都打印 "Time out"
    #[arg(long)]
    report_all_timeouts: bool,

    /// 列出所有 USB 设备后退出
    #[arg(long)]
    list: bool,
}

fn parse_id(value: &str) -> Result<u16, String> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse::<u16>(),
    };
    parsed.map_err(|e| format!("无效的 ID '{}': {}", value, e))
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            vid: self.vid,
            pid: self.pid,
            final_delay: Duration::from_millis(self.final_delay_ms),
            timeout_report: if self.report_all_timeouts {
                TimeoutReport::AllPhases
            } else {
                TimeoutReport::StopPhaseOnly
            },
        }
    }
}

fn main() {
    #[cfg(feature = "logging")]
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.session_config();

    if cli.list {
        let devices = scan_devices();
        println!("Found {} devices:", devices.len());
        for (i, device) in devices.iter().enumerate() {
            let marker = if device.matches(config.vid, config.pid) {
                " <-- target"
            } else {
                ""
            };
            println!("  [{}] {}{}", i, device, marker);
        }
        return;
    }

    let interrupt = Arc::new(AtomicBool::new(false));

    #[cfg(feature = "ctrlc")]
    {
        let flag = Arc::clone(&interrupt);
        if let Err(e) = ctrlc::set_handler(move || {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        }) {
            eprintln!("Failed to install Ctrl+C handler: {}", e);
        }
    }

    let host = match UsbHost::new() {
        Ok(host) => host,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = run_session(&host, &config, &mut out, &interrupt) {
        // 设备数量不符时只以退出码表示
        if !e.is_device_count() {
            eprintln!("{}", e);
        }
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_as_hex_or_decimal() {
        assert_eq!(parse_id("0x0123"), Ok(0x0123));
        assert_eq!(parse_id("0X04a6"), Ok(0x04a6));
        assert_eq!(parse_id("291"), Ok(291));
        assert!(parse_id("0xzz").is_err());
        assert!(parse_id("70000").is_err());
    }

    #[test]
    fn no_flags_reproduce_fixed_script() {
        let cli = Cli::parse_from(["generic-hid-host"]);
        assert_eq!(cli.session_config(), SessionConfig::default());
        assert!(!cli.list);
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "generic-hid-host",
            "--vid",
            "0x1234",
            "--pid",
            "22136",
            "--final-delay-ms",
            "0",
            "--report-all-timeouts",
        ]);
        let config = cli.session_config();
        assert_eq!(config.vid, 0x1234);
        assert_eq!(config.pid, 0x5678);
        assert_eq!(config.final_delay, Duration::ZERO);
        assert_eq!(config.timeout_report, TimeoutReport::AllPhases);
    }
}
