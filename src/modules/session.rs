//! 设备会话：START / STOP / RESET 三个阶段的固定命令序列。

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::modules::constants::{
    FINAL_DELAY_MS, INTERRUPT_POLL_MS, READS_PER_PHASE, REPORT_SIZE, RUN_READ_TIMEOUT_MS,
    STOP_READ_TIMEOUT_MS, USB_PID, USB_VID,
};
use crate::modules::error::HidError;
use crate::modules::transport::{HidHost, HidLink};
use crate::modules::types::{packet, Command, ReadOutcome};

/// 超时提示的输出策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutReport {
    /// 只有 STOP 阶段打印 "Time out"（与参考脚本一致）。
    #[default]
    StopPhaseOnly,
    /// 所有阶段都打印 "Time out"。
    AllPhases,
}

/// 一个命令/应答阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    /// 阶段开始时发送的命令。
    pub command: Command,
    /// 每次读取的超时。
    pub read_timeout: Duration,
    /// 超时是否打印 "Time out"。
    pub reports_timeout: bool,
}

/// 固定的三个阶段。
pub const PHASES: [Phase; 3] = [
    Phase {
        command: Command::Start,
        read_timeout: Duration::from_millis(RUN_READ_TIMEOUT_MS),
        reports_timeout: false,
    },
    Phase {
        command: Command::Stop,
        read_timeout: Duration::from_millis(STOP_READ_TIMEOUT_MS),
        reports_timeout: true,
    },
    Phase {
        command: Command::Reset,
        read_timeout: Duration::from_millis(RUN_READ_TIMEOUT_MS),
        reports_timeout: false,
    },
];

/// 会话配置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// 厂商 ID。
    pub vid: u16,
    /// 产品 ID。
    pub pid: u16,
    /// 最后一次 STOP 之后的等待时间。
    pub final_delay: Duration,
    /// 超时提示策略。
    pub timeout_report: TimeoutReport,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            vid: USB_VID,
            pid: USB_PID,
            final_delay: Duration::from_millis(FINAL_DELAY_MS),
            timeout_report: TimeoutReport::default(),
        }
    }
}

impl SessionConfig {
    /// 该阶段超时时是否打印提示。
    pub fn reports_timeout(&self, phase: &Phase) -> bool {
        match self.timeout_report {
            TimeoutReport::StopPhaseOnly => phase.reports_timeout,
            TimeoutReport::AllPhases => true,
        }
    }
}

/// 会话统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// 写入的命令包数。
    pub writes: usize,
    /// 读取次数。
    pub reads: usize,
    /// 超时次数。
    pub timeouts: usize,
    /// 最后一次成功发送的命令。
    pub last_command: Option<Command>,
}

impl SessionReport {
    /// 固件定时器是否仍在运行（最后一条命令为 START 或 RESET）。
    pub fn timer_running(&self) -> bool {
        matches!(self.last_command, Some(Command::Start | Command::Reset))
    }

    fn record_write(&mut self, command: Command) {
        self.writes += 1;
        self.last_command = Some(command);
    }
}

/// 持有已打开设备的守卫，离开作用域时保证关闭。
pub struct DeviceGuard<L: HidLink> {
    link: Option<L>,
}

impl<L: HidLink> DeviceGuard<L> {
    /// 接管已打开的设备。
    pub fn new(link: L) -> Self {
        Self { link: Some(link) }
    }

    /// 获取设备连接；关闭后返回 `NotConnected`。
    pub fn link(&mut self) -> Result<&mut L, HidError> {
        self.link.as_mut().ok_or(HidError::NotConnected)
    }

    /// 显式关闭设备。
    pub fn close(&mut self) -> Result<(), HidError> {
        match self.link.take() {
            Some(mut link) => {
                #[cfg(feature = "logging")]
                log::info!("Closing device");
                link.close()
            }
            None => Ok(()),
        }
    }
}

impl<L: HidLink> Drop for DeviceGuard<L> {
    fn drop(&mut self) {
        if let Some(mut link) = self.link.take() {
            #[cfg(feature = "logging")]
            log::warn!("Session ended early, closing device");
            if let Err(_e) = link.close() {
                #[cfg(feature = "logging")]
                log::error!("Failed to close device: {}", _e);
            }
        }
    }
}

fn check_interrupt(interrupt: &AtomicBool) -> Result<(), HidError> {
    if interrupt.load(Ordering::SeqCst) {
        #[cfg(feature = "logging")]
        log::warn!("Interrupted by user");
        return Err(HidError::Interrupted);
    }
    Ok(())
}

/// 可被中断的等待。
fn sleep_interruptible(total: Duration, interrupt: &AtomicBool) -> Result<(), HidError> {
    let step = Duration::from_millis(INTERRUPT_POLL_MS);
    let mut remaining = total;
    while !remaining.is_zero() {
        check_interrupt(interrupt)?;
        let slice = remaining.min(step);
        std::thread::sleep(slice);
        remaining -= slice;
    }
    check_interrupt(interrupt)
}

/// 发送一个命令包，短写视为失败。
pub fn send_command<L: HidLink>(link: &mut L, command: Command) -> Result<(), HidError> {
    let report = packet(command);
    #[cfg(feature = "logging")]
    log::info!("Sending {} {:?}", command, report);

    let written = link.write(&report)?;
    if written != report.len() {
        #[cfg(feature = "logging")]
        log::warn!("HID write incomplete: {} of {}", written, report.len());
        return Err(HidError::SendFailed(format!(
            "发送不完整: {} / {}",
            written,
            report.len()
        )));
    }
    Ok(())
}

/// 执行一个阶段：写命令，然后固定读取 `READS_PER_PHASE` 次。
pub fn run_phase<L: HidLink, W: Write>(
    link: &mut L,
    phase: &Phase,
    report_timeouts: bool,
    out: &mut W,
    interrupt: &AtomicBool,
    stats: &mut SessionReport,
) -> Result<(), HidError> {
    check_interrupt(interrupt)?;
    send_command(link, phase.command)?;
    stats.record_write(phase.command);

    for _attempt in 0..READS_PER_PHASE {
        check_interrupt(interrupt)?;
        let outcome = link.read_timeout(REPORT_SIZE, phase.read_timeout)?;
        stats.reads += 1;

        match &outcome {
            ReadOutcome::Data(data) => {
                #[cfg(feature = "logging")]
                log::debug!(
                    "{} read {}/{}: counter={:?}",
                    phase.command,
                    _attempt + 1,
                    READS_PER_PHASE,
                    outcome.counter()
                );
                writeln!(out, "{:?}", data)?;
            }
            ReadOutcome::TimedOut => {
                stats.timeouts += 1;
                if report_timeouts {
                    writeln!(out, "Time out")?;
                }
            }
        }
    }
    Ok(())
}

/// 打印描述字符串、执行三个阶段、发送最后的 STOP 并等待。
fn run_sequence<L: HidLink, W: Write>(
    link: &mut L,
    config: &SessionConfig,
    out: &mut W,
    interrupt: &AtomicBool,
    stats: &mut SessionReport,
) -> Result<(), HidError> {
    let manufacturer = link.manufacturer_string()?;
    writeln!(out, "Manufacturer: {}", manufacturer)?;
    let product = link.product_string()?;
    writeln!(out, "Product: {}", product)?;
    let serial = link.serial_number_string()?;
    writeln!(out, "Serial Number: {}", serial)?;

    for phase in PHASES.iter() {
        run_phase(
            link,
            phase,
            config.reports_timeout(phase),
            out,
            interrupt,
            stats,
        )?;
    }

    check_interrupt(interrupt)?;
    send_command(link, Command::Stop)?;
    stats.record_write(Command::Stop);

    out.flush()?;
    sleep_interruptible(config.final_delay, interrupt)
}

/// 运行完整会话。
///
/// 匹配设备数量不为 1 时直接返回 `HidError::DeviceCount`，不打开设备、不输出。
/// 打开之后的任何失败都会经由 [`DeviceGuard`] 关闭设备；
/// 在 START 或 RESET 阶段被中断时，关闭前先补发 STOP。
pub fn run_session<H: HidHost, W: Write>(
    host: &H,
    config: &SessionConfig,
    out: &mut W,
    interrupt: &AtomicBool,
) -> Result<SessionReport, HidError> {
    let devices = host.enumerate(config.vid, config.pid)?;
    if devices.len() != 1 {
        #[cfg(feature = "logging")]
        log::warn!(
            "Expected exactly one device {:04x}:{:04x}, found {}",
            config.vid,
            config.pid,
            devices.len()
        );
        return Err(HidError::DeviceCount {
            vid: config.vid,
            pid: config.pid,
            found: devices.len(),
        });
    }

    #[cfg(feature = "logging")]
    log::info!("Using device {}", devices[0]);

    let mut guard = DeviceGuard::new(host.open(config.vid, config.pid)?);
    let mut stats = SessionReport::default();

    let result = run_sequence(guard.link()?, config, out, interrupt, &mut stats);
    if let Err(HidError::Interrupted) = result {
        if stats.timer_running() {
            // 中断时固件定时器仍在上报，尽力发送 STOP
            #[cfg(feature = "logging")]
            log::info!("Stopping firmware timer before closing");
            if let Err(_e) = send_command(guard.link()?, Command::Stop) {
                #[cfg(feature = "logging")]
                log::warn!("Failed to send STOP after interrupt: {}", _e);
            }
        }
    }
    result?;
    guard.close()?;

    #[cfg(feature = "logging")]
    log::info!(
        "Session completed: writes={}, reads={}, timeouts={}",
        stats.writes,
        stats.reads,
        stats.timeouts
    );
    Ok(stats)
}
